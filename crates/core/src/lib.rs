//! # nicheprep core
//!
//! Core types, configuration and I/O for preparing species-distribution
//! model predictors.
//!
//! This crate provides:
//! - `Grid`: georeferenced multi-band raster with named bands
//! - `GeoTransform` / `GridGeometry`: north-up georeferencing
//! - `Mask`: boolean validity grid used by masking and region reductions
//! - `PointSet` / `Occurrence`: species occurrence observations
//! - `Region`: polygon or point-footprint constraint for reductions
//! - `PipelineConfig`: YAML configuration
//! - GeoTIFF and CSV I/O

pub mod config;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Grid, GridGeometry, Mask};
pub use vector::{AttributeValue, Occurrence, PointSet, Region};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Grid, GridGeometry, Mask};
    pub use crate::vector::{Occurrence, PointSet, Region};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in nicheprep.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
