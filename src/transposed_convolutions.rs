//! Module that contains transposed convolutions (also called deconvolution layers or
//! fractionally strided convolutions).
//!
//! More can be read here:
//! - <https://datascience.stackexchange.com/questions/6107/what-are-deconvolutional-layers>
//! - <https://ieee.nitk.ac.in/blog/deconv/>
use std::ops::AddAssign;

use log::debug;
use ndarray::*;
use num_traits::Float;

use crate::{
    convolutions::ConvolutionLayer,
    error::Result,
    padding::crop,
    shape::{
        conv_transpose2d_output_shape, conv_transpose2d_padding, conv_transpose2d_raw_shape,
        validate_allocation,
    },
    ConvKernel, DataRepresentation, Padding, Stride, DEFAULT_STRIDE,
};

/// Analog to a Convolution Layer
#[derive(Debug, Clone, PartialEq)]
pub struct TransposedConvolutionLayer<F: Float> {
    convolution_layer: ConvolutionLayer<F>,
}

impl<F: 'static + Float + AddAssign> TransposedConvolutionLayer<F> {
    /// Creates new transposed convolution layer.
    /// Errors if the kernel is empty or any stride component is zero.
    pub fn new(weights: ConvKernel<F>, stride: Stride, padding: Padding) -> Result<Self> {
        Ok(TransposedConvolutionLayer {
            convolution_layer: ConvolutionLayer::new(weights, stride, padding)?,
        })
    }

    /// Creates new transposed convolution layer with stride (1, 1).
    pub fn with_defaults(weights: ConvKernel<F>, padding: Padding) -> Result<Self> {
        TransposedConvolutionLayer::new(weights, DEFAULT_STRIDE, padding)
    }

    pub fn kernel(&self) -> ArrayView2<'_, F> {
        self.convolution_layer.kernel()
    }

    pub fn stride(&self) -> Stride {
        self.convolution_layer.stride()
    }

    pub fn padding(&self) -> Padding {
        self.convolution_layer.padding()
    }

    /// Shape of the result of [`TransposedConvolutionLayer::transposed_convolve`].
    pub fn output_shape(&self, input_shape: (usize, usize)) -> Result<(usize, usize)> {
        conv_transpose2d_output_shape(
            input_shape,
            self.convolution_layer.kernel.dim(),
            self.padding(),
            self.stride(),
        )
    }

    /// Analog to conv_transpose2d.
    pub fn transposed_convolve(
        &self,
        image: &DataRepresentation<F>,
    ) -> Result<DataRepresentation<F>> {
        conv_transpose2d(
            &self.convolution_layer.kernel,
            image,
            self.convolution_layer.padding,
            self.convolution_layer.stride,
        )
    }
}

/// Performs a transposed convolution on the input image. This upsamples the image.
///
/// Every input pixel scatters a copy of the kernel, scaled by the pixel value, into an
/// accumulator. The copies are placed `stride` apart and summed where they overlap.
/// For `Same` padding the accumulator is cropped back to the input shape, putting
/// `floor(p)` of the cropped rows/columns in front and `ceil(p)` behind,
/// with `p = ((H - 1) * stride + HH - H) / 2`.
///
/// More explanation can be read here:
/// - <https://datascience.stackexchange.com/questions/6107/what-are-deconvolutional-layers>
///
/// Input:
/// -----------------------------------------------
/// - kernel_weights: weights of shape (HH, WW)
/// - im2d: Input data of shape (H, W)
/// -----------------------------------------------
/// - 'padding': Same or Valid
/// - 'stride': The number of pixels between adjacent kernel copies in the
///     vertical and horizontal direction
///
/// Returns:
/// -----------------------------------------------
/// - out: Output data of shape ((H - 1) * stride_h + HH, (W - 1) * stride_w + WW) for Valid,
///     (H, W) for Same
///
/// Errors with [`crate::ConvError::InvalidShape`] if a grid is empty, a stride
/// component is zero or the accumulator is too large to allocate.
pub fn conv_transpose2d<'a, T, V, F>(
    kernel_weights: T,
    im2d: V,
    padding: Padding,
    stride: Stride,
) -> Result<DataRepresentation<F>>
where
    // This trait bound ensures that kernel and im2d can be passed as owned array or view.
    // AsArray just ensures that im2d can be converted to an array view via ".into()".
    // Read more here: https://docs.rs/ndarray/0.15.3/ndarray/trait.AsArray.html
    V: AsArray<'a, F, Ix2>,
    T: AsArray<'a, F, Ix2>,
    F: 'static + Float + AddAssign,
{
    let im2d_arr: ArrayView2<F> = im2d.into();
    let kernel_weights_arr: ArrayView2<F> = kernel_weights.into();
    let (kernel_height, kernel_width) = kernel_weights_arr.dim();
    let (stride_h, stride_w) = stride;

    // H' = (H - 1) * stride + HH
    // W' = (W - 1) * stride + WW
    let raw_shape = conv_transpose2d_raw_shape(im2d_arr.dim(), kernel_weights_arr.dim(), stride)?;
    let pad = conv_transpose2d_padding(im2d_arr.dim(), kernel_weights_arr.dim(), padding, stride)?;
    debug!(
        "conv_transpose2d: input {:?}, kernel {:?}, {} padding, stride {:?} -> accumulator {:?}",
        im2d_arr.dim(),
        kernel_weights_arr.dim(),
        padding,
        stride,
        raw_shape
    );

    validate_allocation::<F>("accumulator", raw_shape)?;
    let mut accumulator: Array2<F> = Array::zeros(raw_shape);
    for ((i, j), &pixel) in im2d_arr.indexed_iter() {
        let top = i * stride_h;
        let left = j * stride_w;
        let footprint = accumulator.slice_mut(s![
            top..top + kernel_height,
            left..left + kernel_width
        ]);
        Zip::from(footprint)
            .and(&kernel_weights_arr)
            .for_each(|acc, &weight| *acc += weight * pixel);
    }

    crop(&accumulator, pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConvError;
    use approx::assert_abs_diff_eq;

    fn input_2x2() -> Array2<f32> {
        array![[55., 52.], [57., 50.]]
    }

    fn kernel_2x2() -> Array2<f32> {
        array![[1., 2.], [2., 1.]]
    }

    #[test]
    fn conv_transpose2d_valid() {
        let output = conv_transpose2d(&kernel_2x2(), &input_2x2(), Padding::Valid, (1, 1)).unwrap();
        assert_abs_diff_eq!(
            output,
            array![[55., 162., 104.], [167., 323., 152.], [114., 157., 50.]],
            epsilon = 1e-4
        );
    }

    #[test]
    fn conv_transpose2d_valid_strided() {
        let output = conv_transpose2d(&kernel_2x2(), &input_2x2(), Padding::Valid, (2, 2)).unwrap();
        assert_abs_diff_eq!(
            output,
            array![
                [55., 110., 52., 104.],
                [110., 55., 104., 52.],
                [57., 114., 50., 100.],
                [114., 57., 100., 50.]
            ],
            epsilon = 1e-4
        );
    }

    #[test]
    fn conv_transpose2d_same() {
        let output = conv_transpose2d(&kernel_2x2(), &input_2x2(), Padding::Same, (1, 1)).unwrap();
        assert_abs_diff_eq!(output, array![[55., 162.], [167., 323.]], epsilon = 1e-4);
    }

    #[test]
    fn uncovered_cells_stay_zero() {
        let input = array![[1., 2.], [3., 4.]];
        let kernel = array![[1., 1.]];
        let output = conv_transpose2d(&kernel, &input, Padding::Valid, (2, 1)).unwrap();
        assert_eq!(output, array![[1., 3., 2.], [0., 0., 0.], [3., 7., 4.]]);
    }

    #[test]
    fn same_crop_is_per_axis_for_non_square_input() {
        let input = array![[1., 2., 3.], [4., 5., 6.]];
        let kernel = array![[1., 0.], [0., 1.]];
        // accumulator [[1, 2, 3, 0], [4, 6, 8, 3], [0, 4, 5, 6]]
        let output = conv_transpose2d(&kernel, &input, Padding::Same, (1, 1)).unwrap();
        assert_eq!(output.dim(), (2, 3));
        assert_eq!(output, array![[1., 2., 3.], [4., 6., 8.]]);
    }

    #[test]
    fn same_crop_with_non_square_kernel_and_stride() {
        let input = array![[1., 2.], [3., 4.]];
        let kernel = array![[1., 2., 3.]];
        // accumulator rows: (2 - 1) * 2 + 1 = 3, cols: (2 - 1) * 1 + 3 = 4
        // crop rows [0, 2) and cols [1, 3)
        let output = conv_transpose2d(&kernel, &input, Padding::Same, (2, 1)).unwrap();
        assert_eq!(output, array![[4., 7.], [0., 0.]]);
    }

    #[test]
    fn huge_stride_is_invalid_shape() {
        let input = array![[1f32, 2.], [3., 4.]];
        let kernel = array![[1f32]];
        for &padding in &[Padding::Valid, Padding::Same] {
            assert!(matches!(
                conv_transpose2d(&kernel, &input, padding, (usize::MAX, 1)),
                Err(ConvError::InvalidShape(_))
            ));
            assert!(matches!(
                conv_transpose2d(&kernel, &input, padding, (1, usize::MAX / 4)),
                Err(ConvError::InvalidShape(_))
            ));
        }
    }

    #[test]
    fn rejects_zero_stride_and_empty_grids() {
        assert!(matches!(
            conv_transpose2d(&kernel_2x2(), &input_2x2(), Padding::Valid, (0, 1)),
            Err(ConvError::InvalidShape(_))
        ));
        assert!(matches!(
            conv_transpose2d(&kernel_2x2(), &Array2::<f32>::zeros((2, 0)), Padding::Same, (1, 1)),
            Err(ConvError::InvalidShape(_))
        ));
    }

    #[test]
    fn layer_matches_free_function() {
        let layer = TransposedConvolutionLayer::new(kernel_2x2(), (2, 2), Padding::Valid).unwrap();
        assert_eq!(layer.output_shape((2, 2)), Ok((4, 4)));
        assert_eq!(layer.stride(), (2, 2));
        assert_eq!(layer.padding(), Padding::Valid);
        assert_eq!(layer.kernel(), kernel_2x2().view());
        assert_eq!(
            layer.transposed_convolve(&input_2x2()).unwrap(),
            conv_transpose2d(&kernel_2x2(), &input_2x2(), Padding::Valid, (2, 2)).unwrap()
        );
        let same = TransposedConvolutionLayer::with_defaults(kernel_2x2(), Padding::Same).unwrap();
        assert_eq!(same.output_shape((2, 2)), Ok((2, 2)));
    }
}
