//! Rank correlation between predictor bands
//!
//! - **sampling**: read every band at occurrence locations, dropping
//!   incomplete rows
//! - **spearman**: average ranks and Spearman's coefficient
//! - the band × band matrix built from both

mod matrix;
mod sampling;
mod spearman;

pub use matrix::{correlation_matrix, Correlation, CorrelationMatrix, CorrelationParams};
pub use sampling::{sample_at_points, SampleTable};
pub use spearman::{pearson, rank, spearman};
