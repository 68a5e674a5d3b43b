//! Integer and real boxes that bound views.
//!
//! An `Interval` stores inclusive `min`/`max` coordinates per dimension, so a
//! box of size 5 starting at 0 has `max == 4`. Positions are enumerated in flat
//! order: dimension 0 varies fastest.

use crate::util::{NdViewError, NdViewResult};
use std::fmt;

/// Inclusive n-dimensional integer box.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    min: Vec<i64>,
    max: Vec<i64>,
}

impl Interval {
    /// Creates a box from inclusive per-dimension bounds.
    pub fn new(min: Vec<i64>, max: Vec<i64>) -> NdViewResult<Self> {
        if min.len() != max.len() {
            return Err(NdViewError::DimensionMismatch {
                expected: min.len(),
                got: max.len(),
            });
        }
        if min.is_empty() || min.iter().zip(&max).any(|(lo, hi)| lo > hi) {
            let dims = min.iter().zip(&max).map(|(lo, hi)| hi.saturating_sub(*lo).saturating_add(1)).collect();
            return Err(NdViewError::InvalidDimensions { dims });
        }
        Ok(Self { min, max })
    }

    /// Creates a zero-min box with the given sizes.
    pub fn from_dims(dims: &[usize]) -> NdViewResult<Self> {
        if dims.is_empty() || dims.iter().any(|&d| d == 0) {
            return Err(NdViewError::InvalidDimensions {
                dims: dims.iter().map(|&d| d as i64).collect(),
            });
        }
        let min = vec![0; dims.len()];
        let max = dims.iter().map(|&d| d as i64 - 1).collect();
        Ok(Self { min, max })
    }

    /// Returns the number of dimensions.
    pub fn num_dims(&self) -> usize {
        self.min.len()
    }

    pub fn min(&self, d: usize) -> i64 {
        self.min[d]
    }

    pub fn max(&self, d: usize) -> i64 {
        self.max[d]
    }

    pub fn min_slice(&self) -> &[i64] {
        &self.min
    }

    pub fn max_slice(&self) -> &[i64] {
        &self.max
    }

    /// Returns the size of dimension `d`.
    pub fn dim(&self, d: usize) -> usize {
        (self.max[d] - self.min[d] + 1) as usize
    }

    /// Returns the sizes of all dimensions.
    pub fn dims(&self) -> Vec<usize> {
        (0..self.num_dims()).map(|d| self.dim(d)).collect()
    }

    /// Returns the number of positions in the box, or `None` on overflow.
    pub fn num_elements(&self) -> Option<u64> {
        (0..self.num_dims()).try_fold(1u64, |acc, d| acc.checked_mul(self.dim(d) as u64))
    }

    pub fn is_zero_min(&self) -> bool {
        self.min.iter().all(|&m| m == 0)
    }

    /// Returns true when `pos` lies inside the box.
    pub fn contains(&self, pos: &[i64]) -> bool {
        pos.len() == self.num_dims()
            && pos
                .iter()
                .zip(self.min.iter().zip(&self.max))
                .all(|(p, (lo, hi))| p >= lo && p <= hi)
    }

    /// Grows (or, with a negative border, shrinks) every dimension on both
    /// sides.
    pub fn expand(&self, border: i64) -> NdViewResult<Self> {
        let min = self.min.iter().map(|m| m - border).collect();
        let max = self.max.iter().map(|m| m + border).collect();
        Self::new(min, max)
    }

    /// Grows or shrinks a single dimension on both sides.
    pub fn expand_dim(&self, d: usize, border: i64) -> NdViewResult<Self> {
        self.check_axis(d)?;
        let mut out = self.clone();
        out.min[d] -= border;
        out.max[d] += border;
        Self::new(out.min, out.max)
    }

    /// Shifts the box by `offset`.
    pub fn translate(&self, offset: &[i64]) -> NdViewResult<Self> {
        self.check_len(offset.len())?;
        let shift = |bound: &[i64]| -> NdViewResult<Vec<i64>> {
            bound
                .iter()
                .zip(offset)
                .map(|(m, o)| m.checked_add(*o))
                .collect::<Option<_>>()
                .ok_or(NdViewError::InvalidInput("translated box leaves the i64 range"))
        };
        Ok(Self {
            min: shift(&self.min)?,
            max: shift(&self.max)?,
        })
    }

    /// Returns the overlap of two boxes, failing when they are disjoint.
    pub fn intersect(&self, other: &Interval) -> NdViewResult<Self> {
        self.check_len(other.num_dims())?;
        let min = self.min.iter().zip(&other.min).map(|(a, b)| *a.max(b)).collect();
        let max = self.max.iter().zip(&other.max).map(|(a, b)| *a.min(b)).collect();
        Self::new(min, max)
    }

    /// Returns the smallest box containing both boxes.
    pub fn union(&self, other: &Interval) -> NdViewResult<Self> {
        self.check_len(other.num_dims())?;
        let min = self.min.iter().zip(&other.min).map(|(a, b)| *a.min(b)).collect();
        let max = self.max.iter().zip(&other.max).map(|(a, b)| *a.max(b)).collect();
        Ok(Self { min, max })
    }

    /// Returns the central position, rounding towards `min`.
    pub fn center(&self) -> Vec<i64> {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| (hi - lo) / 2 + lo)
            .collect()
    }

    /// Removes dimension `d`.
    pub fn remove_dim(&self, d: usize) -> NdViewResult<Self> {
        self.check_axis(d)?;
        if self.num_dims() == 1 {
            return Err(NdViewError::InvalidInput("cannot remove the only dimension"));
        }
        let mut min = self.min.clone();
        let mut max = self.max.clone();
        min.remove(d);
        max.remove(d);
        Ok(Self { min, max })
    }

    /// Appends a trailing dimension `[min, max]`.
    pub fn add_dim(&self, min: i64, max: i64) -> NdViewResult<Self> {
        let mut lo = self.min.clone();
        let mut hi = self.max.clone();
        lo.push(min);
        hi.push(max);
        Self::new(lo, hi)
    }

    /// Iterates every position in flat order (dimension 0 fastest).
    pub fn positions(&self) -> Positions {
        self.clone().into_positions()
    }

    /// Consumes the box, iterating every position in flat order.
    pub fn into_positions(self) -> Positions {
        Positions {
            next: Some(self.min.clone()),
            interval: self,
        }
    }

    pub(crate) fn check_len(&self, len: usize) -> NdViewResult<()> {
        if len != self.num_dims() {
            return Err(NdViewError::DimensionMismatch {
                expected: self.num_dims(),
                got: len,
            });
        }
        Ok(())
    }

    pub(crate) fn check_axis(&self, d: usize) -> NdViewResult<()> {
        if d >= self.num_dims() {
            return Err(NdViewError::InvalidInput("axis index out of range"));
        }
        Ok(())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {:?}, dimensions {:?}", self.min, self.max, self.dims())
    }
}

/// Iterator over the positions of an [`Interval`] in flat order.
pub struct Positions {
    interval: Interval,
    next: Option<Vec<i64>>,
}

impl Iterator for Positions {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Vec<i64>> {
        let current = self.next.take()?;
        let mut advanced = current.clone();
        for d in 0..advanced.len() {
            if advanced[d] < self.interval.max[d] {
                advanced[d] += 1;
                self.next = Some(advanced);
                return Some(current);
            }
            advanced[d] = self.interval.min[d];
        }
        Some(current)
    }
}

/// Real-valued n-dimensional box.
#[derive(Clone, Debug, PartialEq)]
pub struct RealInterval {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl RealInterval {
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> NdViewResult<Self> {
        if min.len() != max.len() {
            return Err(NdViewError::DimensionMismatch {
                expected: min.len(),
                got: max.len(),
            });
        }
        if min.iter().zip(&max).any(|(lo, hi)| !(lo <= hi)) {
            return Err(NdViewError::InvalidInput("real interval min exceeds max"));
        }
        Ok(Self { min, max })
    }

    pub fn num_dims(&self) -> usize {
        self.min.len()
    }

    pub fn min(&self, d: usize) -> f64 {
        self.min[d]
    }

    pub fn max(&self, d: usize) -> f64 {
        self.max[d]
    }

    /// Largest integer box inside this real box.
    pub fn largest_contained_interval(&self) -> NdViewResult<Interval> {
        let min = self.min.iter().map(|v| v.ceil() as i64).collect();
        let max = self.max.iter().map(|v| v.floor() as i64).collect();
        Interval::new(min, max)
    }

    /// Smallest integer box containing this real box.
    pub fn smallest_containing_interval(&self) -> NdViewResult<Interval> {
        let min = self.min.iter().map(|v| v.floor() as i64).collect();
        let max = self.max.iter().map(|v| v.ceil() as i64).collect();
        Interval::new(min, max)
    }
}

impl From<&Interval> for RealInterval {
    fn from(value: &Interval) -> Self {
        Self {
            min: value.min.iter().map(|&v| v as f64).collect(),
            max: value.max.iter().map(|&v| v as f64).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Interval, RealInterval};
    use crate::util::NdViewError;

    #[test]
    fn positions_run_dimension_zero_fastest() {
        let iv = Interval::new(vec![1, -1], vec![2, 0]).unwrap();
        let all: Vec<Vec<i64>> = iv.positions().collect();
        assert_eq!(all, vec![vec![1, -1], vec![2, -1], vec![1, 0], vec![2, 0]]);
    }

    #[test]
    fn expand_shrinks_with_negative_border() {
        let iv = Interval::from_dims(&[9, 6]).unwrap();
        let shrunk = iv.expand_dim(0, -3).unwrap();
        assert_eq!(shrunk.min_slice(), &[3, 0]);
        assert_eq!(shrunk.max_slice(), &[5, 5]);

        let err = iv.expand(-4).err().unwrap();
        assert!(matches!(err, NdViewError::InvalidDimensions { .. }));
    }

    #[test]
    fn center_and_element_count() {
        let iv = Interval::from_dims(&[5, 5]).unwrap();
        assert_eq!(iv.center(), vec![2, 2]);
        assert_eq!(iv.num_elements(), Some(25));
        assert!(iv.is_zero_min());
    }

    #[test]
    fn union_and_intersection() {
        let a = Interval::new(vec![0, 0], vec![4, 4]).unwrap();
        let b = Interval::new(vec![2, -3], vec![8, 1]).unwrap();
        let u = a.union(&b).unwrap();
        assert_eq!(u.min_slice(), &[0, -3]);
        assert_eq!(u.max_slice(), &[8, 4]);
        let i = a.intersect(&b).unwrap();
        assert_eq!(i.min_slice(), &[2, 0]);
        assert_eq!(i.max_slice(), &[4, 1]);

        let far = Interval::new(vec![10, 10], vec![11, 11]).unwrap();
        assert!(a.intersect(&far).is_err());
    }

    #[test]
    fn rejects_zero_sized_dims() {
        let err = Interval::from_dims(&[3, 0]).err().unwrap();
        assert_eq!(err, NdViewError::InvalidDimensions { dims: vec![3, 0] });
    }

    #[test]
    fn real_interval_rounding() {
        let real = RealInterval::new(vec![-0.5, 1.2], vec![3.7, 4.0]).unwrap();
        let inner = real.largest_contained_interval().unwrap();
        assert_eq!(inner.min_slice(), &[0, 2]);
        assert_eq!(inner.max_slice(), &[3, 4]);
        let outer = real.smallest_containing_interval().unwrap();
        assert_eq!(outer.min_slice(), &[-1, 1]);
        assert_eq!(outer.max_slice(), &[4, 4]);
    }
}
