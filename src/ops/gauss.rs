//! Separable Gaussian blur and difference of Gaussians.

use crate::buffer::{Buffer, Layout};
use crate::convert::{real_to_f64, BiConverted};
use crate::interval::Interval;
use crate::materialize;
use crate::pixel::RealPixel;
use crate::trace::{trace_event, trace_span};
use crate::util::{NdViewError, NdViewResult};
use crate::view::{check_domain, require_bounds, Boundary, Coords, View, ViewExt};

/// Gaussian blur settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussConfig {
    /// Policy for samples outside the image.
    pub boundary: Boundary<f64>,
    /// Kernel radius in units of sigma.
    pub truncate: f64,
}

impl Default for GaussConfig {
    fn default() -> Self {
        Self {
            boundary: Boundary::Mirror,
            truncate: 3.0,
        }
    }
}

/// Sigmas below this blur by less than a sample and leave the data unchanged.
const MIN_SIGMA: f64 = 1e-6;

/// Normalized 1D Gaussian kernel of radius `ceil(truncate * sigma)`.
fn kernel_1d(sigma: f64, truncate: f64) -> Vec<f64> {
    let radius = (truncate * sigma).ceil().max(1.0) as i64;
    let two_s2 = 2.0 * sigma * sigma;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-(x * x) as f64 / two_s2).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// One separable pass: correlation of an extended source with `weights`
/// along `dim`.
struct LinePass<V> {
    source: V,
    bounds: Interval,
    dim: usize,
    weights: Vec<f64>,
}

impl<V: View<Item = f64>> View for LinePass<V> {
    type Item = f64;

    fn num_dims(&self) -> usize {
        self.bounds.num_dims()
    }

    fn bounds(&self) -> Option<&Interval> {
        Some(&self.bounds)
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<f64> {
        check_domain(self.num_dims(), Some(&self.bounds), pos)?;
        let radius = (self.weights.len() / 2) as i64;
        let mut sample: Coords = pos.iter().copied().collect();
        let mut acc = 0.0;
        for (k, w) in self.weights.iter().enumerate() {
            sample[self.dim] = pos[self.dim] + k as i64 - radius;
            acc += w * self.source.get(&sample)?;
        }
        Ok(acc)
    }
}

fn force<V>(view: &V, bounds: &Interval) -> NdViewResult<Buffer<f64>>
where
    V: View<Item = f64> + Sync,
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

/// Blurs a bounded view with per-dimension standard deviations `sigma`.
///
/// Each dimension with a positive sigma is one materialized pass; a sigma of
/// zero (or below `1e-6`) leaves that dimension untouched. The result covers the view's bounds.
pub fn gauss<V>(view: V, sigma: &[f64], config: &GaussConfig) -> NdViewResult<Buffer<f64>>
where
    V: View + Sync,
    V::Item: RealPixel,
{
    let _span = trace_span!("gauss", dims = sigma.len()).entered();
    let bounds = require_bounds(&view, "gaussian blur needs a bounded view")?;
    if sigma.len() != bounds.num_dims() {
        return Err(NdViewError::DimensionMismatch {
            expected: bounds.num_dims(),
            got: sigma.len(),
        });
    }
    if sigma.iter().any(|s| !(s.is_finite() && *s >= 0.0)) {
        return Err(NdViewError::InvalidInput("sigma must be finite and non-negative"));
    }
    if !(config.truncate > 0.0) {
        return Err(NdViewError::InvalidInput("truncate must be positive"));
    }

    let mut current = force(&real_to_f64(view), &bounds)?;
    for (dim, &s) in sigma.iter().enumerate() {
        if s < MIN_SIGMA {
            continue;
        }
        let weights = kernel_1d(s, config.truncate);
        trace_event!("gauss_pass", dim = dim, taps = weights.len());
        current = {
            let pass = LinePass {
                source: (&current).extend(config.boundary)?,
                bounds: bounds.clone(),
                dim,
                weights,
            };
            force(&pass, &bounds)?
        };
    }
    Ok(current)
}

/// Difference of two Gaussian blurs, `gauss(sigma1) - gauss(sigma2)`,
/// evaluated lazily over the two blurred buffers.
pub fn difference_of_gaussian<V>(
    view: V,
    sigma1: &[f64],
    sigma2: &[f64],
    config: &GaussConfig,
) -> NdViewResult<BiConverted<Buffer<f64>, Buffer<f64>, fn(f64, f64) -> f64>>
where
    V: View + Clone + Sync,
    V::Item: RealPixel,
{
    let fine = gauss(view.clone(), sigma1, config)?;
    let coarse = gauss(view, sigma2, config)?;
    let sub: fn(f64, f64) -> f64 = |a, b| a - b;
    BiConverted::new(fine, coarse, sub)
}

#[cfg(test)]
mod tests {
    use super::{difference_of_gaussian, gauss, kernel_1d, GaussConfig};
    use crate::buffer::{Buffer, Layout};
    use crate::interval::Interval;
    use crate::ops::real_sum;
    use crate::util::NdViewError;
    use crate::view::{Boundary, View};

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = kernel_1d(1.5, 3.0);
        assert_eq!(k.len(), 11);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(k[0], k[10]);
        assert!(k[5] > k[4]);
    }

    #[test]
    fn constant_image_is_unchanged() {
        let interval = Interval::from_dims(&[9, 7]).unwrap();
        let src = Buffer::<u8>::filled(Layout::Array, interval, 40).unwrap();
        let blurred = gauss(&src, &[2.0, 1.0], &GaussConfig::default()).unwrap();
        for (_, &v) in blurred.iter() {
            assert!((v - 40.0).abs() < 1e-9);
        }
    }

    #[test]
    fn impulse_mass_is_preserved() {
        let mut data = vec![0.0f32; 21 * 21];
        data[10 + 21 * 10] = 1.0;
        let src = Buffer::from_vec(data, &[21, 21]).unwrap();
        let config = GaussConfig {
            boundary: Boundary::Zero,
            ..GaussConfig::default()
        };
        let blurred = gauss(&src, &[1.5, 1.5], &config).unwrap();
        assert!((real_sum(&blurred).unwrap() - 1.0).abs() < 1e-9);
        assert!(blurred.get(&[10, 10]).unwrap() > blurred.get(&[11, 10]).unwrap());
        assert_eq!(blurred.get(&[11, 10]).unwrap(), blurred.get(&[10, 11]).unwrap());
    }

    #[test]
    fn dog_of_constant_is_zero() {
        let src = Buffer::<f32>::from_vec(vec![3.0; 64], &[8, 8]).unwrap();
        let dog = difference_of_gaussian(&src, &[1.0, 1.0], &[2.0, 2.0], &GaussConfig::default())
            .unwrap();
        assert!(dog.get(&[0, 7]).unwrap().abs() < 1e-9);
        assert!(dog.get(&[4, 4]).unwrap().abs() < 1e-9);
    }

    #[test]
    fn vanishing_sigma_is_identity() {
        let data: Vec<u8> = (0..25).collect();
        let src = Buffer::from_vec(data, &[5, 5]).unwrap();
        let blurred = gauss(&src, &[1e-170, 1e-170], &GaussConfig::default()).unwrap();
        for (pos, &v) in blurred.iter() {
            assert_eq!(v, src.get(&pos).unwrap() as f64);
        }
    }

    #[test]
    fn rejects_bad_sigma() {
        let src = Buffer::<f32>::from_vec(vec![0.0; 4], &[2, 2]).unwrap();
        let err = gauss(&src, &[1.0], &GaussConfig::default()).err().unwrap();
        assert_eq!(err, NdViewError::DimensionMismatch { expected: 2, got: 1 });
        assert!(gauss(&src, &[-1.0, 1.0], &GaussConfig::default()).is_err());
    }
}
