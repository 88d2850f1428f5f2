//! This package provides 2D correlations ("convolutions" in deep learning speak) as well as
//! their adjoint, transposed convolutions, for a single input and a single output channel.
//! We provide both in the form of free functions as well as something resembling a neural network layer.
//! This crate also requires ndarray to use the functions, as input and output are in the form of ndarrays.
//!
//! In all implementations, we conform to the Pytorch implementation of convolutions
//! (stride and kernel are given per axis, the kernel is not flipped).
//! More on the shape arithmetic can be read here:
//! - <https://github.com/vdumoulin/conv_arithmetic/blob/master/README.md>
//!
//! Example:
//! ```
//! use correlations_rs::convolutions::*;
//! use correlations_rs::transposed_convolutions::*;
//! use correlations_rs::Padding;
//! use ndarray::*;
//!
//! let input = array![
//!     [3., 5., 2., 7.],
//!     [4., 1., 3., 8.],
//!     [6., 3., 8., 2.],
//!     [9., 6., 1., 5.]
//! ];
//! let kernel: Array2<f32> = array![[1., 2., 1.], [2., 1., 2.], [1., 1., 2.]];
//!
//! let conv_layer = ConvolutionLayer::new(kernel.clone(), (1, 1), Padding::Valid).unwrap();
//! let output_layer = conv_layer.convolve(&input).unwrap();
//! let output_free = conv2d(&kernel, &input, Padding::Valid, (1, 1)).unwrap();
//! assert_eq!(output_layer, array![[55., 52.], [57., 50.]]);
//! assert_eq!(output_layer, output_free);
//!
//! let upsampled = conv_transpose2d(&array![[1., 2.], [2., 1.]], &output_free, Padding::Valid, (2, 2)).unwrap();
//! assert_eq!(upsampled.dim(), (4, 4));
//! ```

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

pub mod convolutions;
pub mod error;
pub mod padding;
pub mod shape;
pub mod transposed_convolutions;

pub use error::ConvError;

/// Single channel image, addressed as (row, column).
pub type DataRepresentation<F> = Array2<F>;
/// Single channel kernel, addressed as (row, column).
pub type ConvKernel<F> = Array2<F>;
/// Step between two neighbouring windows, (row stride, column stride).
pub type Stride = (usize, usize);

/// Stride used by the `with_defaults` layer constructors.
pub const DEFAULT_STRIDE: Stride = (1, 1);

/// Padding (specific way of adding zeros to the input matrix) kind used in the convolution.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Padding {
    /// Output has the same shape as input.
    Same,
    /// No padding, the kernel only visits positions where it fits completely.
    Valid,
}

impl FromStr for Padding {
    type Err = ConvError;

    /// Parses `"same"` or `"valid"` (case is ignored). Everything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "same" => Ok(Padding::Same),
            "valid" => Ok(Padding::Valid),
            other => Err(ConvError::InvalidShape(format!(
                "unknown padding mode {:?}, expected \"same\" or \"valid\"",
                other
            ))),
        }
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Padding::Same => write!(f, "same"),
            Padding::Valid => write!(f, "valid"),
        }
    }
}
