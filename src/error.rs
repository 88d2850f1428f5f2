//! Error type shared by every operation of this crate.

use ndarray::ShapeError;
use thiserror::Error;

/// Everything that can go wrong when computing a correlation or a transposed convolution.
///
/// All computation is deterministic, so retrying a failed call with the same
/// arguments fails again. Callers have to fix the shapes or the configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvError {
    /// The combination of input, kernel, stride and padding does not describe a
    /// valid operation (empty grids, zero stride, kernel larger than the input,
    /// unknown padding mode, empty crop window).
    #[error("invalid shape: {0}")]
    InvalidShape(String),
}

impl From<ShapeError> for ConvError {
    fn from(err: ShapeError) -> Self {
        ConvError::InvalidShape(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConvError>;
