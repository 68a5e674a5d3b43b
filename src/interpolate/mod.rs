//! Real-coordinate access to integer views.
//!
//! An [`Interpolated`] view answers `get_real` by combining the integer
//! samples around a real position. Samples are read from the source with
//! `get`, so the source is usually extended first; a bounded source fails with
//! `OutOfDomain` wherever the interpolation footprint leaves its bounds.
//!
//! Real views are warped through a [`RealTransform`]: affine maps and
//! landmark-driven [`ThinPlateSpline`]s.

mod affine;
mod thin_plate;

pub use affine::{Affine, AffineTransform, Rastered, RealTransform, RealViewExt, Transformed};
pub use thin_plate::ThinPlateSpline;

use crate::pixel::RealPixel;
use crate::util::{NdViewError, NdViewResult};
use crate::view::{Coords, RealView, View};
use smallvec::SmallVec;
use std::f64::consts::PI;

/// Interpolation scheme used by [`Interpolated`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Value of the closest integer position (halves round up).
    NearestNeighbor,
    /// Multilinear weighting of the `2^n` surrounding samples.
    #[default]
    NLinear,
    /// Windowed sinc over `2 * alpha` samples per dimension, clamped to the
    /// element range.
    Lanczos { alpha: usize },
}

impl Interpolation {
    /// Lanczos with the customary window of three lobes.
    pub fn lanczos() -> Self {
        Interpolation::Lanczos { alpha: 3 }
    }
}

/// Real view interpolating an integer view.
pub struct Interpolated<V> {
    source: V,
    interpolation: Interpolation,
}

impl<V: View> Interpolated<V>
where
    V::Item: RealPixel,
{
    pub fn new(source: V, interpolation: Interpolation) -> Self {
        Self {
            source,
            interpolation,
        }
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    fn nearest(&self, pos: &[f64]) -> NdViewResult<V::Item> {
        let rounded: Coords = pos.iter().map(|p| (p + 0.5).floor() as i64).collect();
        self.source.get(&rounded)
    }

    fn linear(&self, pos: &[f64]) -> NdViewResult<V::Item> {
        let n = pos.len();
        let base: Coords = pos.iter().map(|p| p.floor() as i64).collect();
        let frac: SmallVec<[f64; 6]> = pos.iter().zip(&base).map(|(p, b)| p - *b as f64).collect();
        let mut corner = base.clone();
        let mut acc = 0.0;
        for mask in 0..(1usize << n) {
            let mut weight = 1.0;
            for d in 0..n {
                if (mask >> d) & 1 == 1 {
                    corner[d] = base[d] + 1;
                    weight *= frac[d];
                } else {
                    corner[d] = base[d];
                    weight *= 1.0 - frac[d];
                }
            }
            // Zero-weight corners are never read, so integer positions on the
            // last row of a bounded source stay valid.
            if weight == 0.0 {
                continue;
            }
            acc += weight * self.source.get(&corner)?.to_f64();
        }
        Ok(V::Item::from_f64(acc))
    }

    fn lanczos(&self, pos: &[f64], alpha: usize) -> NdViewResult<V::Item> {
        if alpha == 0 {
            return Err(NdViewError::InvalidInput("lanczos alpha must be positive"));
        }
        let n = pos.len();
        let a = alpha as i64;
        let width = 2 * alpha;
        let first: Coords = pos.iter().map(|p| p.floor() as i64 - a + 1).collect();
        let weights: Vec<Vec<f64>> = pos
            .iter()
            .zip(&first)
            .map(|(&p, &start)| {
                (0..width)
                    .map(|k| lanczos_kernel(p - (start + k as i64) as f64, alpha as f64))
                    .collect()
            })
            .collect();

        let mut offset = vec![0usize; n];
        let mut sample: Coords = first.clone();
        let mut acc = 0.0;
        'window: loop {
            let weight: f64 = (0..n).map(|d| weights[d][offset[d]]).product();
            if weight != 0.0 {
                for d in 0..n {
                    sample[d] = first[d] + offset[d] as i64;
                }
                acc += weight * self.source.get(&sample)?.to_f64();
            }
            for d in 0..n {
                offset[d] += 1;
                if offset[d] < width {
                    continue 'window;
                }
                offset[d] = 0;
            }
            break;
        }
        let clamped = acc.clamp(V::Item::min_value(), V::Item::max_value());
        Ok(V::Item::from_f64(clamped))
    }
}

fn lanczos_kernel(x: f64, alpha: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    if x.abs() >= alpha {
        return 0.0;
    }
    let px = PI * x;
    alpha * px.sin() * (px / alpha).sin() / (px * px)
}

impl<V: View> RealView for Interpolated<V>
where
    V::Item: RealPixel,
{
    type Item = V::Item;

    fn num_dims(&self) -> usize {
        self.source.num_dims()
    }

    fn get_real(&self, pos: &[f64]) -> NdViewResult<V::Item> {
        if pos.len() != self.num_dims() {
            return Err(NdViewError::DimensionMismatch {
                expected: self.num_dims(),
                got: pos.len(),
            });
        }
        match self.interpolation {
            Interpolation::NearestNeighbor => self.nearest(pos),
            Interpolation::NLinear => self.linear(pos),
            Interpolation::Lanczos { alpha } => self.lanczos(pos, alpha),
        }
    }
}
