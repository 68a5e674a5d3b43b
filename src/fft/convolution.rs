//! Convolution and deconvolution in the frequency domain.

use super::{normalize_kernel, padded_real, padding_interval_centered, FftConfig, FftWorkers};
use crate::buffer::{Buffer, Layout};
use crate::convert::real_to_f32;
use crate::interval::Interval;
use crate::materialize::materialize;
use crate::pixel::RealPixel;
use crate::trace::{trace_event, trace_span};
use crate::util::math::next_fast_size;
use crate::util::{NdViewError, NdViewResult};
use crate::view::{require_bounds, View};
use num_complex::Complex;

/// Kernel frequencies with a smaller magnitude are zeroed instead of divided
/// by.
const MIN_DIVISOR: f64 = 1e-12;

/// FFT-based convolution of an image with a kernel.
///
/// The kernel is normalized to sum one and its centre (`dims / 2`) is
/// moved to the origin. The image is extended with the configured boundary
/// and padded by at least `kernel - 1` per dimension, so the circular
/// transform does not wrap around. Both are moved to the frequency domain
/// with real-to-complex transforms that share one [`FftWorkers`] pool. With
/// [`deconvolve`](Self::deconvolve) the image spectrum is divided by the
/// kernel spectrum instead of multiplied.
pub struct FftConvolution<I, K> {
    image: I,
    kernel: K,
    config: FftConfig,
    divide: bool,
}

impl<I, K> FftConvolution<I, K>
where
    I: View + Sync,
    I::Item: RealPixel,
    K: View + Sync,
    K::Item: RealPixel,
{
    pub fn new(image: I, kernel: K) -> Self {
        Self {
            image,
            kernel,
            config: FftConfig::default(),
            divide: false,
        }
    }

    pub fn with_config(mut self, config: FftConfig) -> Self {
        self.config = config;
        self
    }

    /// Divides by the kernel spectrum instead of multiplying.
    pub fn deconvolve(mut self, divide: bool) -> Self {
        self.divide = divide;
        self
    }

    /// Runs the (de)convolution and returns a buffer over the image bounds.
    pub fn convolve(&self) -> NdViewResult<Buffer<f32>> {
        let _span = trace_span!("fft_convolution", divide = self.divide).entered();
        let image_bounds = require_bounds(&self.image, "cannot convolve an unbounded image")?;
        let kernel_bounds = require_bounds(&self.kernel, "kernel must be bounded")?;
        if image_bounds.num_dims() != kernel_bounds.num_dims() {
            return Err(NdViewError::DimensionMismatch {
                expected: image_bounds.num_dims(),
                got: kernel_bounds.num_dims(),
            });
        }
        let padded_dims: Vec<usize> = image_bounds
            .dims()
            .iter()
            .zip(kernel_bounds.dims())
            .map(|(&i, k)| next_fast_size(i + k - 1))
            .collect();
        let padded = padding_interval_centered(&image_bounds, &padded_dims)?;
        trace_event!("convolution_padding", elements = padded.num_elements().unwrap_or(0));

        let mut workers = FftWorkers::new(&self.config)?;
        let image_real = padded_real(&self.image, &padded, self.config.boundary)?;
        let kernel_real = self.placed_kernel(&kernel_bounds, &padded_dims)?;
        let mut image_fft = workers.forward_real(&image_real)?;
        let kernel_fft = workers.forward_real(&kernel_real)?;

        let img = image_fft.as_mut_slice();
        let ker = kernel_fft.as_slice();
        if self.divide {
            for (v, k) in img.iter_mut().zip(ker) {
                *v = if k.norm() < MIN_DIVISOR {
                    Complex::new(0.0, 0.0)
                } else {
                    *v / *k
                };
            }
        } else {
            for (v, k) in img.iter_mut().zip(ker) {
                *v *= *k;
            }
        }

        let result = workers.inverse_real(image_fft)?;
        let real = real_to_f32(&result);
        materialize(&real, &image_bounds, Layout::Array)
    }

    /// Normalized kernel in a zero-filled buffer of the padded size, centre
    /// at the origin, wrapped around.
    fn placed_kernel(
        &self,
        kernel_bounds: &Interval,
        padded_dims: &[usize],
    ) -> NdViewResult<Buffer<f64>> {
        let normalized = normalize_kernel(&self.kernel)?;
        let center: Vec<i64> = kernel_bounds.dims().iter().map(|&d| (d / 2) as i64).collect();
        let mut placed = Buffer::new(Layout::Array, Interval::from_dims(padded_dims)?)?;
        let mut target = vec![0i64; padded_dims.len()];
        for pos in kernel_bounds.positions() {
            for (d, t) in target.iter_mut().enumerate() {
                let rel = pos[d] - kernel_bounds.min(d) - center[d];
                *t = rel.rem_euclid(padded_dims[d] as i64);
            }
            *placed.get_mut(&target)? = normalized.get(&pos)?;
        }
        Ok(placed)
    }
}
