//! Region-constrained reductions
//!
//! - **reduce**: per-band mean and band covariance over the valid pixels of a
//!   region, at a chosen resolution, behind a pixel budget

mod reduce;

pub use reduce::{region_covariance, region_mean, CovarianceMatrix, ReduceParams, DEFAULT_MAX_PIXELS};
