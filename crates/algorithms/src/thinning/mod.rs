//! Spatial thinning of occurrence records
//!
//! - **dedup**: keep one occurrence per occupied grid cell

mod dedup;

pub use dedup::{cell_key, deduplicate, DedupParams, Deduplicate, Representative};
