//! Grid algebra
//!
//! Per-pixel arithmetic between grids, per-band constants or scalars, and
//! masking/clipping. No-data (NaN) in any operand yields no-data.

mod masking;
mod ops;

pub use masking::{clip, mask_where, update_mask, Clip};
pub use ops::{add, binary, divide, multiply, subtract, BinaryOp, Operand};
