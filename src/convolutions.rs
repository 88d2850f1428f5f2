//! Module that contains classical convolutions, as used f.e. in convolutional neural networks.
//! As in every deep learning framework, the kernel is not flipped, so strictly speaking these
//! are cross-correlations.
//!
//! More can be read here:
//! - <https://towardsdatascience.com/a-comprehensive-guide-to-convolutional-neural-networks-the-eli5-way-3bd2b1164a53?gi=f4a37beea40b>

use log::debug;
use ndarray::*;
use num_traits::Float;

use crate::error::Result;
use crate::padding::pad_zeros;
use crate::shape::{
    conv2d_output_shape, conv2d_padding, validate_allocation, validate_grid, validate_stride,
};
use crate::{ConvKernel, DataRepresentation, Padding, Stride, DEFAULT_STRIDE};

/// Rust implementation of a single channel convolutional layer.
/// The weight matrix has dimension (kernel height, kernel width).
#[derive(Debug, Clone, PartialEq)]
pub struct ConvolutionLayer<F: Float> {
    /// Weight matrix of the kernel
    pub(crate) kernel: ConvKernel<F>,
    pub(crate) stride: Stride,
    pub(crate) padding: Padding,
}

impl<F: 'static + Float> ConvolutionLayer<F> {
    /// Creates new convolution layer.
    /// Errors if the kernel is empty or any stride component is zero.
    pub fn new(weights: ConvKernel<F>, stride: Stride, padding: Padding) -> Result<Self> {
        validate_grid("kernel", weights.dim())?;
        validate_stride(stride)?;
        Ok(ConvolutionLayer {
            kernel: weights,
            stride,
            padding,
        })
    }

    /// Creates new convolution layer with stride (1, 1).
    pub fn with_defaults(weights: ConvKernel<F>, padding: Padding) -> Result<Self> {
        ConvolutionLayer::new(weights, DEFAULT_STRIDE, padding)
    }

    pub fn kernel(&self) -> ArrayView2<'_, F> {
        self.kernel.view()
    }

    pub fn stride(&self) -> Stride {
        self.stride
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Shape of the result of [`ConvolutionLayer::convolve`] for an input of shape `input_shape`.
    pub fn output_shape(&self, input_shape: (usize, usize)) -> Result<(usize, usize)> {
        conv2d_output_shape(input_shape, self.kernel.dim(), self.padding, self.stride)
    }

    /// Analog to conv2d.
    pub fn convolve(&self, image: &DataRepresentation<F>) -> Result<DataRepresentation<F>> {
        conv2d(&self.kernel, image, self.padding, self.stride)
    }
}

/// Unrolls every kernel sized window of `im_arr` into one row.
///
/// Returns a `(new_h * new_w, ker_height * ker_width)` matrix, windows in row major order,
/// with `new_h = (H - ker_height) / stride_h + 1` and `new_w = (W - ker_width) / stride_w + 1`.
pub(crate) fn im2col_ref<'a, T, F: 'a + Float>(
    im_arr: T,
    ker_height: usize,
    ker_width: usize,
    new_h: usize,
    new_w: usize,
    stride: Stride,
) -> Array2<F>
where
    T: AsArray<'a, F, Ix2>,
{
    let im2d_arr: ArrayView2<F> = im_arr.into();
    let (stride_h, stride_w) = stride;
    let mut cols_img: Array2<F> = Array::zeros((new_h * new_w, ker_height * ker_width));
    let mut cont = 0_usize;
    for i in 0..new_h {
        for j in 0..new_w {
            let patch = im2d_arr.slice(s![
                i * stride_h..(i * stride_h + ker_height),
                j * stride_w..(j * stride_w + ker_width),
            ]);
            // iteration order of a 2D view is row major, same as the flattened kernel
            cols_img
                .row_mut(cont)
                .iter_mut()
                .zip(patch.iter())
                .for_each(|(col, &value)| *col = value);
            cont += 1;
        }
    }
    cols_img
}

/// Performs a correlation on the given image data.
/// The image is zero padded according to `padding`, flattened in im2col
/// style and multiplied with the flattened kernel.
///
/// Read more here:
/// - <https://leonardoaraujosantos.gitbook.io/artificial-inteligence/machine_learning/deep_learning/convolution_layer/making_faster>
///
/// Input:
/// -----------------------------------------------
/// - kernel_weights: weights of shape (HH, WW)
/// - im2d: Input data of shape (H, W)
/// -----------------------------------------------
/// - 'padding': Same or Valid. Same pads `ceil(p)` zeros in front and `floor(p)` behind
///     each axis, with `p = ((H - 1) * stride + HH - H) / 2`
/// - 'stride': The number of pixels between adjacent receptive fields in the
///     vertical and horizontal direction
///
/// Returns:
/// -----------------------------------------------
/// - out: Output data, of shape (H', W') with H' = (H_padded - HH) / stride_h + 1
///
/// The whole padded image is materialized. For Same padding that is
/// ((H - 1) * stride_h + HH, (W - 1) * stride_w + WW), so a stride much larger than
/// the kernel allocates rows and columns that no window reads.
///
/// Errors with [`crate::ConvError::InvalidShape`] if a grid is empty, a stride component
/// is zero, the kernel does not fit into the padded image or the padded image is too
/// large to allocate.
pub fn conv2d<'a, T, V, F>(
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
    F: 'static + Float,
{
    let im2d_arr: ArrayView2<F> = im2d.into();
    let kernel_weights_arr: ArrayView2<F> = kernel_weights.into();
    let (kernel_height, kernel_width) = kernel_weights_arr.dim();

    let pad = conv2d_padding(im2d_arr.dim(), kernel_weights_arr.dim(), padding, stride)?;
    let (new_im_height, new_im_width) =
        conv2d_output_shape(im2d_arr.dim(), kernel_weights_arr.dim(), padding, stride)?;
    debug!(
        "conv2d: input {:?}, kernel {:?}, {} padding, stride {:?} -> output {:?}",
        im2d_arr.dim(),
        kernel_weights_arr.dim(),
        padding,
        stride,
        (new_im_height, new_im_width)
    );

    let (im_height, im_width) = im2d_arr.dim();
    validate_allocation::<F>(
        "padded input",
        (im_height + pad.row.total(), im_width + pad.col.total()),
    )?;
    let im2d_arr_pad = pad_zeros(im2d_arr, pad);
    let im_col = im2col_ref(
        im2d_arr_pad.view(),
        kernel_height,
        kernel_width,
        new_im_height,
        new_im_width,
        stride,
    );

    // weights.reshape(HH*WW)
    let filter_col: Array1<F> = kernel_weights_arr.iter().copied().collect();
    let mul = im_col.dot(&filter_col);
    let output = mul.into_shape((new_im_height, new_im_width))?;
    Ok(output)
}
