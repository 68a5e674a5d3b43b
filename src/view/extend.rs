//! Boundary policies that extend a bounded view to every coordinate.
//!
//! Extension never allocates: out-of-bounds positions are either answered
//! with a constant or folded back into the source bounds one coordinate at a
//! time.

use super::{check_domain, require_bounds, Coords, View};
use crate::interval::Interval;
use crate::pixel::{Pixel, RealPixel};
use crate::util::math::{fold_mirror, fold_periodic, fold_reflect};
use crate::util::{NdViewError, NdViewResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Rule for values outside a view's bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Boundary<T> {
    /// The element type's default (zero for numeric types).
    Zero,
    /// Reflection about the outer pixel edge; the edge sample repeats.
    Mirror,
    /// Reflection about the edge sample; the edge sample does not repeat.
    Reflect,
    /// Periodic wrap-around.
    Periodic,
    /// A constant value.
    Value(T),
}

/// A bounded view extended to an unbounded domain.
pub struct Extended<V: View> {
    source: V,
    bounds: Interval,
    boundary: Boundary<V::Item>,
}

impl<V: View> Extended<V>
where
    V::Item: Pixel,
{
    /// Extends `source` with `boundary`. The source must be bounded.
    pub fn new(source: V, boundary: Boundary<V::Item>) -> NdViewResult<Self> {
        let bounds = require_bounds(&source, "cannot extend an unbounded view")?;
        Ok(Self {
            source,
            bounds,
            boundary,
        })
    }

    /// Returns the bounds of the extended source.
    pub fn source_bounds(&self) -> &Interval {
        &self.bounds
    }

    pub fn boundary(&self) -> &Boundary<V::Item> {
        &self.boundary
    }
}

impl<V: View> View for Extended<V>
where
    V::Item: Pixel,
{
    type Item = V::Item;

    fn num_dims(&self) -> usize {
        self.bounds.num_dims()
    }

    fn bounds(&self) -> Option<&Interval> {
        None
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<V::Item> {
        check_domain(self.num_dims(), None, pos)?;
        if self.bounds.contains(pos) {
            return self.source.get(pos);
        }
        let fold: fn(i64, i64, i64) -> i64 = match self.boundary {
            Boundary::Zero => return Ok(V::Item::default()),
            Boundary::Value(value) => return Ok(value),
            Boundary::Mirror => fold_mirror,
            Boundary::Reflect => fold_reflect,
            Boundary::Periodic => fold_periodic,
        };
        let folded: Coords = pos
            .iter()
            .enumerate()
            .map(|(d, &p)| fold(p, self.bounds.min(d), self.bounds.max(d)))
            .collect();
        self.source.get(&folded)
    }
}

/// A bounded view extended with uniform random values.
///
/// Each outside position draws from a generator seeded by `seed` and the
/// position itself, so repeated reads return the same value.
pub struct ExtendedRandom<V> {
    source: V,
    bounds: Interval,
    min: f64,
    max: f64,
    seed: u64,
}

impl<V: View> ExtendedRandom<V>
where
    V::Item: RealPixel,
{
    pub fn new(source: V, min: f64, max: f64, seed: u64) -> NdViewResult<Self> {
        if !(min.is_finite() && max.is_finite()) {
            return Err(NdViewError::InvalidInput("random boundary requires finite limits"));
        }
        if !(min <= max) {
            return Err(NdViewError::InvalidInput("random boundary requires min <= max"));
        }
        let bounds = require_bounds(&source, "cannot extend an unbounded view")?;
        Ok(Self {
            source,
            bounds,
            min,
            max,
            seed,
        })
    }
}

fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl<V: View> View for ExtendedRandom<V>
where
    V::Item: RealPixel,
{
    type Item = V::Item;

    fn num_dims(&self) -> usize {
        self.bounds.num_dims()
    }

    fn bounds(&self) -> Option<&Interval> {
        None
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<V::Item> {
        check_domain(self.num_dims(), None, pos)?;
        if self.bounds.contains(pos) {
            return self.source.get(pos);
        }
        let key = pos
            .iter()
            .fold(splitmix64(self.seed), |acc, &p| splitmix64(acc ^ p as u64));
        let mut rng = StdRng::seed_from_u64(key);
        // Weighting both limits keeps the span finite for the full f64 range.
        let t: f64 = rng.random();
        let value = (self.min * (1.0 - t) + self.max * t).clamp(self.min, self.max);
        Ok(V::Item::from_f64(value))
    }
}
