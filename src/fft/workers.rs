//! Planner caches and the worker pool behind every transform.

use super::{ComplexBuffer, FftConfig, FftDirection};
use crate::buffer::Buffer;
use crate::interval::Interval;
use crate::util::{NdViewError, NdViewResult};
use num_complex::Complex;
use realfft::RealFftPlanner;
use rustfft::{Fft, FftPlanner};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Half spectrum of a real buffer.
///
/// Axis 0 holds the `len / 2 + 1` non-negative frequencies of the real
/// transform; the other axes are full complex transforms.
#[derive(Clone, Debug)]
pub struct RealSpectrum {
    interval: Interval,
    half_dims: Vec<usize>,
    values: Vec<Complex<f64>>,
}

impl RealSpectrum {
    /// Box of the real input the spectrum was computed from.
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn half_dims(&self) -> &[usize] {
        &self.half_dims
    }

    pub fn as_slice(&self) -> &[Complex<f64>] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex<f64>] {
        &mut self.values
    }
}

/// Planners and the thread pool for one transform job.
///
/// Building a pool is not free; a job that runs several transforms (a
/// convolution runs three) creates one `FftWorkers` and reuses it, so plans
/// are cached and all lanes run on the same fixed-size pool.
pub struct FftWorkers {
    planner: FftPlanner<f64>,
    real_planner: RealFftPlanner<f64>,
    #[cfg(feature = "rayon")]
    pool: rayon::ThreadPool,
}

/// Lane lengths are fixed by the plans and the zero/Nyquist bins are made
/// real before inverting, so this only reports broken invariants.
fn real_fft_error(_err: realfft::FftError) -> NdViewError {
    NdViewError::InvalidInput("real FFT rejected its buffers")
}

impl FftWorkers {
    /// Creates the planners and, with `rayon`, a pool of
    /// `config.threads` workers (all cores when zero).
    pub fn new(config: &FftConfig) -> NdViewResult<Self> {
        #[cfg(feature = "rayon")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count())
            .build()
            .map_err(|e| NdViewError::ThreadPool {
                reason: e.to_string(),
            })?;
        #[cfg(not(feature = "rayon"))]
        let _ = config;
        Ok(Self {
            planner: FftPlanner::new(),
            real_planner: RealFftPlanner::new(),
            #[cfg(feature = "rayon")]
            pool,
        })
    }

    /// Complex transform of a contiguous buffer along every axis, in place.
    ///
    /// The inverse direction is normalized by `1 / N`.
    pub fn transform(&mut self, data: &mut ComplexBuffer, direction: FftDirection) -> NdViewResult<()> {
        let dims = data.dims();
        let values = data
            .as_mut_slice()
            .ok_or(NdViewError::InvalidInput("FFT needs a contiguous buffer"))?;
        self.complex_axes(values, &dims, 0, direction);
        if direction == FftDirection::Inverse {
            let norm = 1.0 / values.len() as f64;
            for v in values.iter_mut() {
                *v *= norm;
            }
        }
        Ok(())
    }

    /// Forward real-to-complex transform of a contiguous real buffer.
    pub fn forward_real(&mut self, data: &Buffer<f64>) -> NdViewResult<RealSpectrum> {
        let dims = data.dims();
        let input = data
            .as_slice()
            .ok_or(NdViewError::InvalidInput("FFT needs a contiguous buffer"))?;
        let len = dims[0];
        let half = len / 2 + 1;
        let mut half_dims = dims.clone();
        half_dims[0] = half;
        let rows = input.len() / len;
        let mut values = vec![Complex::default(); half * rows];

        let r2c = self.real_planner.plan_fft_forward(len);
        let scratch_len = r2c.get_scratch_len();
        #[cfg(feature = "rayon")]
        {
            self.pool
                .install(|| {
                    input.par_chunks(len).zip(values.par_chunks_mut(half)).try_for_each_init(
                        || (vec![0.0; len], vec![Complex::default(); scratch_len]),
                        |(row, scratch), (src, dst)| {
                            row.copy_from_slice(src);
                            r2c.process_with_scratch(row, dst, scratch)
                        },
                    )
                })
                .map_err(real_fft_error)?;
        }
        #[cfg(not(feature = "rayon"))]
        {
            let mut row = vec![0.0; len];
            let mut scratch = vec![Complex::default(); scratch_len];
            for (src, dst) in input.chunks(len).zip(values.chunks_mut(half)) {
                row.copy_from_slice(src);
                r2c.process_with_scratch(&mut row, dst, &mut scratch)
                    .map_err(real_fft_error)?;
            }
        }

        self.complex_axes(&mut values, &half_dims, 1, FftDirection::Forward);
        Ok(RealSpectrum {
            interval: data.interval().clone(),
            half_dims,
            values,
        })
    }

    /// Inverse of [`forward_real`](Self::forward_real), normalized by
    /// `1 / N`; the result covers the original real box.
    pub fn inverse_real(&mut self, mut spectrum: RealSpectrum) -> NdViewResult<Buffer<f64>> {
        let dims = spectrum.interval.dims();
        let len = dims[0];
        let half = spectrum.half_dims[0];
        self.complex_axes(&mut spectrum.values, &spectrum.half_dims, 1, FftDirection::Inverse);

        // The zero (and, for even lengths, Nyquist) frequency of a real
        // signal is real; products and quotients leave rounding noise there.
        for lane in spectrum.values.chunks_mut(half) {
            lane[0].im = 0.0;
            if len % 2 == 0 {
                lane[half - 1].im = 0.0;
            }
        }

        let rows = spectrum.values.len() / half;
        let mut output = vec![0.0; len * rows];
        let c2r = self.real_planner.plan_fft_inverse(len);
        let scratch_len = c2r.get_scratch_len();
        #[cfg(feature = "rayon")]
        {
            let values = &mut spectrum.values;
            self.pool
                .install(|| {
                    values.par_chunks_mut(half).zip(output.par_chunks_mut(len)).try_for_each_init(
                        || vec![Complex::default(); scratch_len],
                        |scratch, (src, dst)| c2r.process_with_scratch(src, dst, scratch),
                    )
                })
                .map_err(real_fft_error)?;
        }
        #[cfg(not(feature = "rayon"))]
        {
            let mut scratch = vec![Complex::default(); scratch_len];
            for (src, dst) in spectrum.values.chunks_mut(half).zip(output.chunks_mut(len)) {
                c2r.process_with_scratch(src, dst, &mut scratch)
                    .map_err(real_fft_error)?;
            }
        }

        let norm = 1.0 / output.len() as f64;
        for v in &mut output {
            *v *= norm;
        }
        Buffer::from_vec(output, &dims)?.with_min(spectrum.interval.min_slice())
    }

    /// Unnormalized complex transforms along axes `first_axis..`.
    fn complex_axes(
        &mut self,
        values: &mut [Complex<f64>],
        dims: &[usize],
        first_axis: usize,
        direction: FftDirection,
    ) {
        let mut stride: usize = dims[..first_axis].iter().product();
        for &len in &dims[first_axis..] {
            if len > 1 {
                let fft = self.planner.plan_fft(len, direction);
                #[cfg(feature = "rayon")]
                {
                    let values = &mut *values;
                    self.pool.install(|| transform_axis_par(values, len, stride, fft.as_ref()));
                }
                #[cfg(not(feature = "rayon"))]
                {
                    transform_axis(values, len, stride, fft.as_ref());
                }
            }
            stride *= len;
        }
    }
}

/// Copies the `stride` interleaved lanes of `block` into consecutive lanes.
fn gather(block: &[Complex<f64>], lanes: &mut [Complex<f64>], len: usize, stride: usize) {
    for l in 0..stride {
        for k in 0..len {
            lanes[l * len + k] = block[k * stride + l];
        }
    }
}

fn scatter(lanes: &[Complex<f64>], block: &mut [Complex<f64>], len: usize, stride: usize) {
    for l in 0..stride {
        for k in 0..len {
            block[k * stride + l] = lanes[l * len + k];
        }
    }
}

#[cfg(not(feature = "rayon"))]
fn transform_axis(values: &mut [Complex<f64>], len: usize, stride: usize, fft: &dyn Fft<f64>) {
    let mut scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
    let mut lanes = vec![Complex::default(); len * stride];
    for block in values.chunks_mut(len * stride) {
        if stride == 1 {
            fft.process_with_scratch(block, &mut scratch);
            continue;
        }
        gather(block, &mut lanes, len, stride);
        fft.process_with_scratch(&mut lanes, &mut scratch);
        scatter(&lanes, block, len, stride);
    }
}

#[cfg(feature = "rayon")]
fn transform_axis_par(values: &mut [Complex<f64>], len: usize, stride: usize, fft: &dyn Fft<f64>) {
    let scratch_len = fft.get_inplace_scratch_len();
    values.par_chunks_mut(len * stride).for_each_init(
        || vec![Complex::default(); scratch_len],
        |scratch, block| {
            if stride == 1 {
                fft.process_with_scratch(block, scratch);
                return;
            }
            let mut lanes = vec![Complex::default(); len * stride];
            gather(block, &mut lanes, len, stride);
            lanes.par_chunks_mut(len).for_each_init(
                || vec![Complex::default(); scratch_len],
                |lane_scratch, lane| fft.process_with_scratch(lane, lane_scratch),
            );
            scatter(&lanes, block, len, stride);
        },
    );
}

#[cfg(test)]
mod tests {
    use super::FftWorkers;
    use crate::buffer::Buffer;
    use crate::fft::{FftConfig, FftDirection};
    use crate::view::View;
    use num_complex::Complex;

    #[test]
    fn real_half_spectrum_matches_complex_transform() {
        let data: Vec<f64> = (0..6 * 5).map(|v| ((v * 7) % 11) as f64 - 3.0).collect();
        let real = Buffer::from_vec(data.clone(), &[6, 5]).unwrap();
        let mut complex =
            Buffer::from_vec(data.iter().map(|&v| Complex::new(v, 0.0)).collect(), &[6, 5])
                .unwrap();

        let mut workers = FftWorkers::new(&FftConfig::default()).unwrap();
        let half = workers.forward_real(&real).unwrap();
        workers.transform(&mut complex, FftDirection::Forward).unwrap();

        assert_eq!(half.half_dims(), &[4, 5]);
        for y in 0..5 {
            for x in 0..4 {
                let expected = complex.get(&[x as i64, y as i64]).unwrap();
                let got = half.as_slice()[x + 4 * y];
                assert!((got - expected).norm() < 1e-9, "({x}, {y})");
            }
        }
    }

    #[test]
    fn real_round_trip_keeps_the_box() {
        let data: Vec<f64> = (0..7 * 4 * 3).map(|v| (v as f64 * 0.41).cos()).collect();
        let real = Buffer::from_vec(data, &[7, 4, 3])
            .unwrap()
            .with_min(&[-3, 2, 0])
            .unwrap();
        let mut workers = FftWorkers::new(&FftConfig {
            threads: 2,
            ..FftConfig::default()
        })
        .unwrap();
        let spectrum = workers.forward_real(&real).unwrap();
        let back = workers.inverse_real(spectrum).unwrap();
        assert_eq!(back.interval(), real.interval());
        for (pos, &v) in real.iter() {
            assert!((back.get(&pos).unwrap() - v).abs() < 1e-12);
        }
    }

    #[test]
    fn one_pool_serves_repeated_transforms() {
        let mut workers = FftWorkers::new(&FftConfig::default()).unwrap();
        let mut data =
            Buffer::from_vec((0..16).map(|v| Complex::new(v as f64, 0.0)).collect(), &[4, 4])
                .unwrap();
        let original = data.clone();
        for _ in 0..3 {
            workers.transform(&mut data, FftDirection::Forward).unwrap();
            workers.transform(&mut data, FftDirection::Inverse).unwrap();
        }
        for ((_, a), (_, b)) in data.iter().zip(original.iter()) {
            assert!((a - b).norm() < 1e-9);
        }
    }
}
