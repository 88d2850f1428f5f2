//! Zero padding of correlation inputs and cropping of transposed convolution outputs.

use log::trace;
use ndarray::*;
use num_traits::Float;

use crate::error::{ConvError, Result};
use crate::shape::PadAmount;

/// Returns a new zero grid of shape `(rows + pad.row.total(), cols + pad.col.total())`
/// with `input` placed at `(pad.row.leading, pad.col.leading)`.
pub fn pad_zeros<'a, V, F>(input: V, pad: PadAmount) -> Array2<F>
where
    V: AsArray<'a, F, Ix2>,
    F: 'a + Float,
{
    let input_arr: ArrayView2<F> = input.into();
    if pad.is_zero() {
        return input_arr.to_owned();
    }
    let (height, width) = input_arr.dim();
    let mut padded: Array2<F> =
        Array::zeros((height + pad.row.total(), width + pad.col.total()));
    let bottom = pad.row.leading + height;
    let right = pad.col.leading + width;
    // https://github.com/rust-ndarray/ndarray/issues/823
    padded
        .slice_mut(s![pad.row.leading..bottom, pad.col.leading..right])
        .assign(&input_arr);
    trace!("padded {:?} to {:?}", input_arr.dim(), padded.dim());
    padded
}

/// Removes `pad.row.leading` / `pad.row.trailing` rows and `pad.col.leading` /
/// `pad.col.trailing` columns from the borders of `raw`.
///
/// Each axis is cropped against its own length. Errors if nothing would be left.
pub fn crop<'a, V, F>(raw: V, pad: PadAmount) -> Result<Array2<F>>
where
    V: AsArray<'a, F, Ix2>,
    F: 'a + Float,
{
    let raw_arr: ArrayView2<F> = raw.into();
    let (height, width) = raw_arr.dim();
    if pad.row.total() >= height || pad.col.total() >= width {
        return Err(ConvError::InvalidShape(format!(
            "cropping {:?} from a grid of shape {:?} leaves no output",
            pad,
            raw_arr.dim()
        )));
    }
    let bottom = height - pad.row.trailing;
    let right = width - pad.col.trailing;
    let cropped = raw_arr
        .slice(s![pad.row.leading..bottom, pad.col.leading..right])
        .to_owned();
    trace!("cropped {:?} to {:?}", raw_arr.dim(), cropped.dim());
    Ok(cropped)
}
