//! N-dimensional FFT over padded, boundary-extended views.
//!
//! Inputs are extended with a [`Boundary`] policy and padded (centred) to
//! sizes whose prime factors are 2, 3, 5 and 7. The transform runs one axis
//! at a time; with the `rayon` feature the 1D lanes of an axis are spread over
//! a fixed-size worker pool and the caller blocks until every lane is done.
//! A panicking worker propagates to the caller and aborts the transform.
//!
//! [`forward`] returns the full complex spectrum; convolution uses the
//! real-to-complex half spectrum of [`FftWorkers::forward_real`].

mod convolution;
mod workers;

pub use convolution::FftConvolution;
pub use rustfft::FftDirection;
pub use workers::{FftWorkers, RealSpectrum};

use crate::buffer::{Buffer, Layout};
use crate::convert::{real_to_f64, Converted};
use crate::interval::Interval;
use crate::materialize;
use crate::ops::real_sum;
use crate::pixel::{Pixel, RealPixel};
use crate::trace::{trace_event, trace_span};
use crate::util::math::next_fast_size;
use crate::util::{NdViewError, NdViewResult};
use crate::view::{require_bounds, Boundary, View, ViewExt};
use num_complex::Complex;

/// Complex spectrum or complex-valued image.
pub type ComplexBuffer = Buffer<Complex<f64>>;

/// Settings shared by transforms and convolutions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FftConfig {
    /// Policy used to fill the padding around the input.
    pub boundary: Boundary<f64>,
    /// Worker count; `0` uses the available hardware parallelism.
    pub threads: usize,
}

impl Default for FftConfig {
    fn default() -> Self {
        Self {
            boundary: Boundary::Mirror,
            threads: 0,
        }
    }
}

impl FftConfig {
    #[cfg(feature = "rayon")]
    fn worker_count(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Smallest sizes `>= dims` that transform quickly.
pub fn fast_dims(dims: &[usize]) -> Vec<usize> {
    dims.iter().map(|&d| next_fast_size(d)).collect()
}

/// Box of size `padded_dims` centred on `interval`.
///
/// The extra size of each dimension is split with the smaller half before
/// `min`.
pub fn padding_interval_centered(interval: &Interval, padded_dims: &[usize]) -> NdViewResult<Interval> {
    interval.check_len(padded_dims.len())?;
    let mut min = Vec::with_capacity(padded_dims.len());
    let mut max = Vec::with_capacity(padded_dims.len());
    for (d, &padded) in padded_dims.iter().enumerate() {
        let size = interval.dim(d);
        if padded < size {
            return Err(NdViewError::InvalidInput("padded size is smaller than the input"));
        }
        let lo = interval.min(d) - ((padded - size) / 2) as i64;
        min.push(lo);
        max.push(lo + padded as i64 - 1);
    }
    Interval::new(min, max)
}

fn force<V>(view: &V, bounds: &Interval) -> NdViewResult<Buffer<V::Item>>
where
    V: View + Sync,
    V::Item: Pixel,
{
    #[cfg(feature = "rayon")]
    {
        materialize::materialize_par(view, bounds, Layout::Array)
    }
    #[cfg(not(feature = "rayon"))]
    {
        materialize::materialize(view, bounds, Layout::Array)
    }
}

/// Materializes a real view, extended with `boundary`, over `padded` as
/// complex values.
fn padded_complex<V>(
    view: V,
    padded: &Interval,
    boundary: Boundary<f64>,
) -> NdViewResult<ComplexBuffer>
where
    V: View + Sync,
    V::Item: RealPixel,
{
    let source = real_to_f64(view)
        .extend(boundary)?
        .convert(|v| Complex::new(v, 0.0));
    force(&source, padded)
}

/// Materializes a real view, extended with `boundary`, over `padded`.
pub(crate) fn padded_real<V>(
    view: V,
    padded: &Interval,
    boundary: Boundary<f64>,
) -> NdViewResult<Buffer<f64>>
where
    V: View + Sync,
    V::Item: RealPixel,
{
    let source = real_to_f64(view).extend(boundary)?;
    force(&source, padded)
}

/// Forward transform of a bounded real view.
///
/// The input is padded to [`fast_dims`] with `config.boundary`. The returned
/// spectrum is zero-min and indexed by frequency.
pub fn forward<V>(view: V, config: &FftConfig) -> NdViewResult<ComplexBuffer>
where
    V: View + Sync,
    V::Item: RealPixel,
{
    let _span = trace_span!("fft_forward").entered();
    let bounds = require_bounds(&view, "cannot transform an unbounded view")?;
    let padded = padding_interval_centered(&bounds, &fast_dims(&bounds.dims()))?;
    trace_event!("fft_padding", padded = padded.num_elements().unwrap_or(0));
    let mut data = padded_complex(view, &padded, config.boundary)?;
    fft_in_place(&mut data, FftDirection::Forward, config)?;
    let origin = vec![0; padded.num_dims()];
    data.with_min(&origin)
}

/// Inverse transform, normalized by `1 / N`.
pub fn inverse(mut spectrum: ComplexBuffer, config: &FftConfig) -> NdViewResult<ComplexBuffer> {
    let _span = trace_span!("fft_inverse").entered();
    fft_in_place(&mut spectrum, FftDirection::Inverse, config)?;
    Ok(spectrum)
}

/// Transforms a contiguous complex buffer in place along every axis.
///
/// The inverse direction is normalized by `1 / N`. Runs as its own job; use
/// [`FftWorkers`] directly to share one pool across several transforms.
pub fn fft_in_place(
    data: &mut ComplexBuffer,
    direction: FftDirection,
    config: &FftConfig,
) -> NdViewResult<()> {
    FftWorkers::new(config)?.transform(data, direction)
}

/// Lazy `ln(1 + |c|)` of a spectrum, for display.
pub fn power_spectrum<V>(spectrum: V) -> Converted<V, fn(Complex<f64>) -> f64>
where
    V: View<Item = Complex<f64>>,
{
    let f: fn(Complex<f64>) -> f64 = |c| c.norm().ln_1p();
    Converted::new(spectrum, f)
}

/// Lazily divides a kernel by its (compensated) sum so that it sums to one.
pub fn normalize_kernel<V>(kernel: V) -> NdViewResult<Converted<V, impl Fn(V::Item) -> f64>>
where
    V: View,
    V::Item: RealPixel,
{
    let sum = real_sum(&kernel)?;
    if sum == 0.0 || !sum.is_finite() {
        return Err(NdViewError::InvalidInput("kernel sum must be finite and non-zero"));
    }
    Ok(Converted::new(kernel, move |v: V::Item| v.to_f64() / sum))
}

#[cfg(test)]
mod tests {
    use super::{
        fast_dims, fft_in_place, forward, inverse, normalize_kernel, padding_interval_centered,
        power_spectrum, FftConfig, FftDirection,
    };
    use crate::buffer::{Buffer, Layout};
    use crate::interval::Interval;
    use crate::ops::real_sum;
    use crate::util::NdViewError;
    use crate::view::{Boundary, View};
    use num_complex::Complex;

    #[test]
    fn fast_sizes() {
        assert_eq!(fast_dims(&[256, 254, 1001, 1]), vec![256, 256, 1008, 1]);
    }

    #[test]
    fn padding_is_centred() {
        let iv = Interval::from_dims(&[10, 7]).unwrap();
        let padded = padding_interval_centered(&iv, &[14, 8]).unwrap();
        assert_eq!(padded.min_slice(), &[-2, 0]);
        assert_eq!(padded.max_slice(), &[11, 7]);
        assert!(padding_interval_centered(&iv, &[9, 8]).is_err());
    }

    #[test]
    fn constant_has_only_dc() {
        let src = Buffer::<u8>::from_vec(vec![2; 30], &[6, 5]).unwrap();
        let spectrum = forward(&src, &FftConfig::default()).unwrap();
        assert_eq!(spectrum.dims(), vec![6, 5]);
        assert_eq!(spectrum.interval().min_slice(), &[0, 0]);
        let dc = spectrum.get(&[0, 0]).unwrap();
        assert!((dc.re - 60.0).abs() < 1e-9);
        for (pos, v) in spectrum.iter() {
            if pos != vec![0, 0] {
                assert!(v.norm() < 1e-9);
            }
        }
    }

    #[test]
    fn inverse_restores_padded_input() {
        let data: Vec<f32> = (0..7 * 3 * 2).map(|v| (v as f32 * 0.37).sin()).collect();
        let src = Buffer::from_vec(data, &[7, 3, 2]).unwrap();
        let config = FftConfig {
            boundary: Boundary::Zero,
            threads: 2,
        };
        let spectrum = forward(&src, &config).unwrap();
        let restored = inverse(spectrum, &config).unwrap();
        // 7 and 3 are already fast sizes
        for (pos, v) in restored.iter() {
            let expected = src.get(&pos).unwrap() as f64;
            assert!((v.re - expected).abs() < 1e-9);
            assert!(v.im.abs() < 1e-9);
        }
    }

    #[test]
    fn single_worker_matches_default_pool() {
        let data: Vec<f64> = (0..12 * 10).map(|v| ((v * 7) % 11) as f64).collect();
        let src = Buffer::from_vec(data, &[12, 10]).unwrap();
        let a = forward(&src, &FftConfig::default()).unwrap();
        let b = forward(
            &src,
            &FftConfig {
                threads: 1,
                ..FftConfig::default()
            },
        )
        .unwrap();
        for ((_, x), (_, y)) in a.iter().zip(b.iter()) {
            assert!((x - y).norm() < 1e-9);
        }
    }

    #[test]
    fn fft_requires_contiguous_storage() {
        let interval = Interval::from_dims(&[4, 4, 2]).unwrap();
        let mut planar = Buffer::<Complex<f64>>::new(Layout::Planar, interval).unwrap();
        let err = fft_in_place(&mut planar, FftDirection::Forward, &FftConfig::default())
            .err()
            .unwrap();
        assert_eq!(err, NdViewError::InvalidInput("FFT needs a contiguous buffer"));
    }

    #[test]
    fn power_spectrum_is_log_magnitude() {
        let spectrum =
            Buffer::from_vec(vec![Complex::new(3.0, 4.0), Complex::new(0.0, 0.0)], &[2]).unwrap();
        let power = power_spectrum(&spectrum);
        assert!((power.get(&[0]).unwrap() - 6f64.ln()).abs() < 1e-12);
        assert_eq!(power.get(&[1]).unwrap(), 0.0);
    }

    #[test]
    fn kernel_normalization() {
        let kernel = Buffer::<u8>::from_vec(vec![1; 13 * 13], &[13, 13]).unwrap();
        let normalized = normalize_kernel(&kernel).unwrap();
        assert!((real_sum(&normalized).unwrap() - 1.0).abs() < 1e-12);

        let zero = Buffer::<f32>::from_vec(vec![1.0, -1.0], &[2]).unwrap();
        assert_eq!(
            normalize_kernel(&zero).err().unwrap(),
            NdViewError::InvalidInput("kernel sum must be finite and non-zero")
        );
    }
}
