//! Per-pixel binary operations

use crate::maybe_rayon::*;
use ndarray::Array2;
use nicheprep_core::{Error, Grid, Result};

/// Binary operations for grid algebra
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    /// Division by zero yields no-data
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => {
                if b == 0.0 {
                    f64::NAN
                } else {
                    a / b
                }
            }
        }
    }
}

/// Right-hand side of a binary operation
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    /// One value broadcast to every pixel of every band
    Scalar(f64),
    /// One value per band, broadcast to every pixel (a constant image)
    PerBand(&'a [f64]),
    /// An aligned grid with the same band count, or a single band applied to
    /// every band of the left-hand side
    Grid(&'a Grid),
}

/// Apply `op` pixel-wise between `lhs` and `rhs`.
///
/// The result keeps the band names and geometry of `lhs`.
///
/// # Errors
/// `GeometryMismatch` when a grid operand is not aligned with `lhs`, or when
/// the band counts of the operands are incompatible.
pub fn binary(lhs: &Grid, rhs: Operand<'_>, op: BinaryOp) -> Result<Grid> {
    let n_bands = lhs.n_bands();
    match rhs {
        Operand::PerBand(values) if values.len() != n_bands => {
            return Err(Error::GeometryMismatch(format!(
                "{} constants for a grid of {} bands",
                values.len(),
                n_bands
            )));
        }
        Operand::Grid(other) => {
            lhs.geometry().ensure_aligned(&other.geometry())?;
            if other.n_bands() != n_bands && other.n_bands() != 1 {
                return Err(Error::GeometryMismatch(format!(
                    "{} bands vs {} bands",
                    n_bands,
                    other.n_bands()
                )));
            }
        }
        _ => {}
    }

    let (rows, cols) = lhs.shape();
    let mut arrays = Vec::with_capacity(n_bands);

    for band in 0..n_bands {
        let a = lhs.band_at(band);
        let data: Vec<f64> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                let mut row_data = vec![f64::NAN; cols];
                for (col, out) in row_data.iter_mut().enumerate() {
                    let b = match rhs {
                        Operand::Scalar(v) => v,
                        Operand::PerBand(values) => values[band],
                        Operand::Grid(other) => {
                            let source = if other.n_bands() == 1 { 0 } else { band };
                            other.data()[[source, row, col]]
                        }
                    };
                    *out = op.apply(a[(row, col)], b);
                }
                row_data
            })
            .collect();
        arrays.push(Array2::from_shape_vec((rows, cols), data)?);
    }

    Grid::from_band_arrays(*lhs.transform(), lhs.band_names().to_vec(), arrays)
}

pub fn add(lhs: &Grid, rhs: Operand<'_>) -> Result<Grid> {
    binary(lhs, rhs, BinaryOp::Add)
}

pub fn subtract(lhs: &Grid, rhs: Operand<'_>) -> Result<Grid> {
    binary(lhs, rhs, BinaryOp::Subtract)
}

pub fn multiply(lhs: &Grid, rhs: Operand<'_>) -> Result<Grid> {
    binary(lhs, rhs, BinaryOp::Multiply)
}

pub fn divide(lhs: &Grid, rhs: Operand<'_>) -> Result<Grid> {
    binary(lhs, rhs, BinaryOp::Divide)
}
