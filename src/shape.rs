//! Shape arithmetic for correlations and transposed convolutions.
//!
//! Everything is computed per axis and independently for rows and columns, with
//! `n` the input size, `m` the kernel size and `s` the stride of that axis.
//!
//! More can be read here:
//! - <https://arxiv.org/abs/1603.07285>
//! - <https://github.com/vdumoulin/conv_arithmetic/blob/master/README.md>

use log::trace;

use crate::error::{ConvError, Result};
use crate::{Padding, Stride};

/// Zero padding applied to one axis.
///
/// The nominal padding `p` of an axis may be fractional (half of an odd total).
/// We keep the total as an integer and spell out on which side the extra row/column goes,
/// so `floor(p)` and `ceil(p)` are always applied explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisPadding {
    /// Zeros before the first element (top or left).
    pub leading: usize,
    /// Zeros after the last element (bottom or right).
    pub trailing: usize,
}

impl AxisPadding {
    pub const NONE: AxisPadding = AxisPadding {
        leading: 0,
        trailing: 0,
    };

    /// `leading = floor(total / 2)`, `trailing = ceil(total / 2)`.
    pub fn floor_leading(total: usize) -> Self {
        AxisPadding {
            leading: total / 2,
            trailing: total - total / 2,
        }
    }

    /// `leading = ceil(total / 2)`, `trailing = floor(total / 2)`.
    pub fn ceil_leading(total: usize) -> Self {
        AxisPadding {
            leading: total - total / 2,
            trailing: total / 2,
        }
    }

    pub fn total(&self) -> usize {
        self.leading + self.trailing
    }

    /// The nominal, unrounded padding per side.
    pub fn amount(&self) -> f64 {
        self.total() as f64 / 2.0
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// Padding of both axes of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PadAmount {
    pub row: AxisPadding,
    pub col: AxisPadding,
}

impl PadAmount {
    pub const NONE: PadAmount = PadAmount {
        row: AxisPadding::NONE,
        col: AxisPadding::NONE,
    };

    pub fn is_zero(&self) -> bool {
        self.row.is_zero() && self.col.is_zero()
    }

    /// Nominal padding `(p_row, p_col)`, possibly fractional.
    pub fn amount(&self) -> (f64, f64) {
        (self.row.amount(), self.col.amount())
    }
}

/// Errors if any stride component is zero.
pub fn validate_stride(stride: Stride) -> Result<()> {
    if stride.0 == 0 || stride.1 == 0 {
        return Err(ConvError::InvalidShape(format!(
            "stride must be positive on both axes, got {:?}",
            stride
        )));
    }
    Ok(())
}

/// Errors if `shape` has a zero-length axis. `name` is used in the error message.
pub fn validate_grid(name: &str, shape: (usize, usize)) -> Result<()> {
    if shape.0 == 0 || shape.1 == 0 {
        return Err(ConvError::InvalidShape(format!(
            "{} must not have a zero-length axis, got shape {:?}",
            name, shape
        )));
    }
    Ok(())
}

/// Errors unless a grid of `shape` with elements of type `F` can be allocated,
/// i.e. its size in bytes fits into an `isize`.
pub fn validate_allocation<F>(name: &str, shape: (usize, usize)) -> Result<()> {
    let bytes = shape
        .0
        .checked_mul(shape.1)
        .and_then(|len| len.checked_mul(std::mem::size_of::<F>().max(1)));
    match bytes {
        Some(bytes) if bytes <= isize::MAX as usize => Ok(()),
        _ => Err(ConvError::InvalidShape(format!(
            "{} of shape {:?} is too large to allocate",
            name, shape
        ))),
    }
}

/// Extent `(n - 1) * s + m` covered by `n` kernel copies of size `m`, placed `s` apart.
fn window_span(input: usize, kernel: usize, stride: usize) -> Result<usize> {
    (input - 1)
        .checked_mul(stride)
        .and_then(|span| span.checked_add(kernel))
        .ok_or_else(|| {
            ConvError::InvalidShape(format!(
                "({} - 1) * {} + {} overflows usize",
                input, stride, kernel
            ))
        })
}

/// Total padding `(n - 1) * s + m - n` that lets `n` windows of size `m`, `s` apart,
/// span exactly `n` positions. Never negative for `n, m, s >= 1`.
fn same_padding_total(input: usize, kernel: usize, stride: usize) -> Result<usize> {
    Ok(window_span(input, kernel, stride)? - input)
}

/// Output size of one axis of a correlation over an already padded axis:
/// `floor((padded - m) / s) + 1`.
pub fn conv_output_size(padded: usize, kernel: usize, stride: usize) -> Result<usize> {
    if stride == 0 {
        return Err(ConvError::InvalidShape("stride must be positive".to_string()));
    }
    if kernel > padded {
        return Err(ConvError::InvalidShape(format!(
            "kernel extent {} exceeds padded input extent {}",
            kernel, padded
        )));
    }
    Ok((padded - kernel) / stride + 1)
}

/// Padding applied to the input of a correlation.
///
/// `Same` pads `ceil(p)` zeros in front and `floor(p)` behind, with
/// `p = ((n - 1) * s + m - n) / 2`.
pub fn conv2d_padding(
    input_shape: (usize, usize),
    kernel_shape: (usize, usize),
    padding: Padding,
    stride: Stride,
) -> Result<PadAmount> {
    validate_grid("input", input_shape)?;
    validate_grid("kernel", kernel_shape)?;
    validate_stride(stride)?;
    let pad = match padding {
        Padding::Valid => PadAmount::NONE,
        Padding::Same => PadAmount {
            row: AxisPadding::ceil_leading(same_padding_total(
                input_shape.0,
                kernel_shape.0,
                stride.0,
            )?),
            col: AxisPadding::ceil_leading(same_padding_total(
                input_shape.1,
                kernel_shape.1,
                stride.1,
            )?),
        },
    };
    trace!("conv2d padding for {:?}: {:?}", padding, pad);
    Ok(pad)
}

/// Output shape of a correlation, or `InvalidShape` if the kernel does not fit
/// into the padded input.
pub fn conv2d_output_shape(
    input_shape: (usize, usize),
    kernel_shape: (usize, usize),
    padding: Padding,
    stride: Stride,
) -> Result<(usize, usize)> {
    let pad = conv2d_padding(input_shape, kernel_shape, padding, stride)?;
    Ok((
        conv_output_size(input_shape.0 + pad.row.total(), kernel_shape.0, stride.0)?,
        conv_output_size(input_shape.1 + pad.col.total(), kernel_shape.1, stride.1)?,
    ))
}

/// Shape of the transposed convolution accumulator before cropping:
/// `(n - 1) * s + m` per axis.
pub fn conv_transpose2d_raw_shape(
    input_shape: (usize, usize),
    kernel_shape: (usize, usize),
    stride: Stride,
) -> Result<(usize, usize)> {
    validate_grid("input", input_shape)?;
    validate_grid("kernel", kernel_shape)?;
    validate_stride(stride)?;
    Ok((
        window_span(input_shape.0, kernel_shape.0, stride.0)?,
        window_span(input_shape.1, kernel_shape.1, stride.1)?,
    ))
}

/// Amount cropped from the accumulator of a transposed convolution.
///
/// `Same` crops `floor(p)` in front and `ceil(p)` behind, with `p` left unrounded.
pub fn conv_transpose2d_padding(
    input_shape: (usize, usize),
    kernel_shape: (usize, usize),
    padding: Padding,
    stride: Stride,
) -> Result<PadAmount> {
    let raw = conv_transpose2d_raw_shape(input_shape, kernel_shape, stride)?;
    let pad = match padding {
        Padding::Valid => PadAmount::NONE,
        Padding::Same => PadAmount {
            row: AxisPadding::floor_leading(raw.0 - input_shape.0),
            col: AxisPadding::floor_leading(raw.1 - input_shape.1),
        },
    };
    trace!("conv_transpose2d crop for {:?}: {:?}", padding, pad);
    Ok(pad)
}

/// Output shape of a transposed convolution: the raw accumulator shape for `Valid`,
/// the input shape for `Same`.
pub fn conv_transpose2d_output_shape(
    input_shape: (usize, usize),
    kernel_shape: (usize, usize),
    padding: Padding,
    stride: Stride,
) -> Result<(usize, usize)> {
    let raw = conv_transpose2d_raw_shape(input_shape, kernel_shape, stride)?;
    let pad = conv_transpose2d_padding(input_shape, kernel_shape, padding, stride)?;
    Ok((raw.0 - pad.row.total(), raw.1 - pad.col.total()))
}
