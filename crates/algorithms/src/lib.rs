//! # nicheprep algorithms
//!
//! Predictor preparation for species distribution models.
//!
//! ## Modules
//!
//! - **algebra**: per-pixel arithmetic, masking and clipping
//! - **statistics**: region mean and covariance behind a pixel budget
//! - **thinning**: one occurrence per grid cell
//! - **pca**: covariance eigendecomposition and standardized components
//! - **correlation**: Spearman matrix of bands sampled at occurrences
//! - **pipeline**: all of the above in order, driven by `PipelineConfig`

pub mod algebra;
pub mod correlation;
pub(crate) mod maybe_rayon;
pub mod pca;
pub mod pipeline;
pub mod statistics;
pub mod thinning;

pub use pipeline::{PipelineOutput, PredictorPipeline};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::algebra::{add, clip, divide, mask_where, multiply, subtract, update_mask, Clip, Operand};
    pub use crate::correlation::{correlation_matrix, spearman, Correlation, CorrelationMatrix, CorrelationParams};
    pub use crate::pca::{center, compute_pca, symmetric_eigen, EigenDecomposition, Pca, PcaParams, PcaResult};
    pub use crate::pipeline::{PipelineOutput, PredictorPipeline};
    pub use crate::statistics::{region_covariance, region_mean, CovarianceMatrix, ReduceParams};
    pub use crate::thinning::{deduplicate, DedupParams, Deduplicate, Representative};
    pub use nicheprep_core::prelude::*;
}
