//! Principal component analysis of multi-band grids
//!
//! - **eigen**: covariance eigendecomposition, sorted by descending eigenvalue
//! - **engine**: centering, projection and standardization into `pc1..pcb`

mod eigen;
mod engine;

pub use eigen::{covariance_eigen, symmetric_eigen, EigenDecomposition};
pub use engine::{
    center, component_names, compute_pca, ComponentSummary, Pca, PcaParams, PcaResult, PcaSummary,
};
