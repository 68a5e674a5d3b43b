//! Integer coordinate transforms.
//!
//! Every transform remaps the requested coordinate and forwards to its
//! source; bounds are derived once at construction.

use super::{check_domain, require_bounds, Coords, View};
use crate::interval::Interval;
use crate::util::{NdViewError, NdViewResult};

/// Error for positions whose source coordinate does not fit in `i64`.
fn beyond_i64(pos: &[i64]) -> NdViewError {
    NdViewError::OutOfDomain {
        position: pos.to_vec(),
        bounds: "the i64 coordinate range".to_string(),
    }
}

/// View restricted to an explicit box.
///
/// Applied to an extended view this re-bounds it, e.g. to a region larger
/// than the original image.
pub struct Bounded<V> {
    source: V,
    bounds: Interval,
}

impl<V: View> Bounded<V> {
    pub fn new(source: V, bounds: Interval) -> NdViewResult<Self> {
        if bounds.num_dims() != source.num_dims() {
            return Err(NdViewError::DimensionMismatch {
                expected: source.num_dims(),
                got: bounds.num_dims(),
            });
        }
        Ok(Self { source, bounds })
    }
}

impl<V: View> View for Bounded<V> {
    type Item = V::Item;

    fn num_dims(&self) -> usize {
        self.bounds.num_dims()
    }

    fn bounds(&self) -> Option<&Interval> {
        Some(&self.bounds)
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<V::Item> {
        check_domain(self.num_dims(), Some(&self.bounds), pos)?;
        self.source.get(pos)
    }
}

/// View shifted by a constant offset.
pub struct Translated<V> {
    source: V,
    offset: Vec<i64>,
    bounds: Option<Interval>,
}

impl<V: View> Translated<V> {
    pub fn new(source: V, offset: &[i64]) -> NdViewResult<Self> {
        if offset.len() != source.num_dims() {
            return Err(NdViewError::DimensionMismatch {
                expected: source.num_dims(),
                got: offset.len(),
            });
        }
        let bounds = source.bounds().map(|b| b.translate(offset)).transpose()?;
        Ok(Self {
            source,
            offset: offset.to_vec(),
            bounds,
        })
    }
}

impl<V: View> View for Translated<V> {
    type Item = V::Item;

    fn num_dims(&self) -> usize {
        self.offset.len()
    }

    fn bounds(&self) -> Option<&Interval> {
        self.bounds.as_ref()
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<V::Item> {
        check_domain(self.num_dims(), self.bounds.as_ref(), pos)?;
        let shifted: Coords = pos
            .iter()
            .zip(&self.offset)
            .map(|(p, o)| p.checked_sub(*o))
            .collect::<Option<_>>()
            .ok_or_else(|| beyond_i64(pos))?;
        self.source.get(&shifted)
    }
}

/// View with two axes swapped.
pub struct Permuted<V> {
    source: V,
    a: usize,
    b: usize,
    bounds: Option<Interval>,
}

impl<V: View> Permuted<V> {
    pub fn new(source: V, a: usize, b: usize) -> NdViewResult<Self> {
        let n = source.num_dims();
        if a >= n || b >= n {
            return Err(NdViewError::InvalidInput("axis index out of range"));
        }
        let bounds = match source.bounds() {
            Some(bounds) => {
                let mut min = bounds.min_slice().to_vec();
                let mut max = bounds.max_slice().to_vec();
                min.swap(a, b);
                max.swap(a, b);
                Some(Interval::new(min, max)?)
            }
            None => None,
        };
        Ok(Self {
            source,
            a,
            b,
            bounds,
        })
    }
}

impl<V: View> View for Permuted<V> {
    type Item = V::Item;

    fn num_dims(&self) -> usize {
        self.source.num_dims()
    }

    fn bounds(&self) -> Option<&Interval> {
        self.bounds.as_ref()
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<V::Item> {
        check_domain(self.num_dims(), self.bounds.as_ref(), pos)?;
        let mut swapped: Coords = pos.iter().copied().collect();
        swapped.swap(self.a, self.b);
        self.source.get(&swapped)
    }
}

/// (n-1)-dimensional slice through an n-dimensional view.
pub struct HyperSlice<V> {
    source: V,
    dim: usize,
    pos: i64,
    bounds: Option<Interval>,
}

impl<V: View> HyperSlice<V> {
    pub fn new(source: V, dim: usize, pos: i64) -> NdViewResult<Self> {
        let n = source.num_dims();
        if dim >= n {
            return Err(NdViewError::InvalidInput("axis index out of range"));
        }
        if n < 2 {
            return Err(NdViewError::InvalidInput("cannot slice a one-dimensional view"));
        }
        let bounds = match source.bounds() {
            Some(bounds) => {
                if pos < bounds.min(dim) || pos > bounds.max(dim) {
                    return Err(NdViewError::InvalidInput("slice position outside the view"));
                }
                Some(bounds.remove_dim(dim)?)
            }
            None => None,
        };
        Ok(Self {
            source,
            dim,
            pos,
            bounds,
        })
    }
}

impl<V: View> View for HyperSlice<V> {
    type Item = V::Item;

    fn num_dims(&self) -> usize {
        self.source.num_dims() - 1
    }

    fn bounds(&self) -> Option<&Interval> {
        self.bounds.as_ref()
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<V::Item> {
        check_domain(self.num_dims(), self.bounds.as_ref(), pos)?;
        let mut full: Coords = pos.iter().copied().collect();
        full.insert(self.dim, self.pos);
        self.source.get(&full)
    }
}

/// View with an extra trailing dimension along which values repeat.
pub struct AddDimension<V> {
    source: V,
    bounds: Option<Interval>,
}

impl<V: View> AddDimension<V> {
    pub fn new(source: V, min: i64, max: i64) -> NdViewResult<Self> {
        if min > max {
            return Err(NdViewError::InvalidDimensions {
                dims: vec![max - min + 1],
            });
        }
        let bounds = source.bounds().map(|b| b.add_dim(min, max)).transpose()?;
        Ok(Self { source, bounds })
    }
}

impl<V: View> View for AddDimension<V> {
    type Item = V::Item;

    fn num_dims(&self) -> usize {
        self.source.num_dims() + 1
    }

    fn bounds(&self) -> Option<&Interval> {
        self.bounds.as_ref()
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<V::Item> {
        check_domain(self.num_dims(), self.bounds.as_ref(), pos)?;
        self.source.get(&pos[..pos.len() - 1])
    }
}

/// View keeping every `step`-th position; position `x` reads `x * step`.
pub struct Subsample<V> {
    source: V,
    step: i64,
    bounds: Interval,
}

impl<V: View> Subsample<V> {
    pub fn new(source: V, step: usize) -> NdViewResult<Self> {
        if step == 0 {
            return Err(NdViewError::InvalidInput("subsampling step must be positive"));
        }
        let src_bounds = require_bounds(&source, "cannot subsample an unbounded view")?;
        let step = step as i64;
        let min = src_bounds
            .min_slice()
            .iter()
            .map(|&m| m.div_euclid(step) + i64::from(m.rem_euclid(step) != 0))
            .collect();
        let max = src_bounds
            .max_slice()
            .iter()
            .map(|&m| m.div_euclid(step))
            .collect();
        let bounds = Interval::new(min, max)?;
        Ok(Self {
            source,
            step,
            bounds,
        })
    }
}

impl<V: View> View for Subsample<V> {
    type Item = V::Item;

    fn num_dims(&self) -> usize {
        self.bounds.num_dims()
    }

    fn bounds(&self) -> Option<&Interval> {
        Some(&self.bounds)
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<V::Item> {
        check_domain(self.num_dims(), Some(&self.bounds), pos)?;
        let scaled: Coords = pos
            .iter()
            .map(|p| p.checked_mul(self.step))
            .collect::<Option<_>>()
            .ok_or_else(|| beyond_i64(pos))?;
        self.source.get(&scaled)
    }
}

/// n-dimensional view built by stacking (n-1)-dimensional views along a new
/// trailing axis.
pub struct Stack<V> {
    slices: Vec<V>,
    bounds: Interval,
}

impl<V: View> Stack<V> {
    /// All slices must share the same bounds.
    pub fn new(slices: Vec<V>) -> NdViewResult<Self> {
        let first = slices
            .first()
            .ok_or(NdViewError::InvalidInput("cannot stack zero views"))?;
        let slice_bounds = require_bounds(first, "cannot stack unbounded views")?;
        for slice in &slices[1..] {
            let other = require_bounds(slice, "cannot stack unbounded views")?;
            if other != slice_bounds {
                return Err(NdViewError::BoundsMismatch {
                    left: slice_bounds.to_string(),
                    right: other.to_string(),
                });
            }
        }
        let bounds = slice_bounds.add_dim(0, slices.len() as i64 - 1)?;
        Ok(Self { slices, bounds })
    }
}

impl<V: View> View for Stack<V> {
    type Item = V::Item;

    fn num_dims(&self) -> usize {
        self.bounds.num_dims()
    }

    fn bounds(&self) -> Option<&Interval> {
        Some(&self.bounds)
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<V::Item> {
        check_domain(self.num_dims(), Some(&self.bounds), pos)?;
        let (last, rest) = pos.split_last().ok_or(NdViewError::InvalidInput("empty position"))?;
        self.slices[*last as usize].get(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::Stack;
    use crate::buffer::Buffer;
    use crate::interval::Interval;
    use crate::view::{Boundary, View, ViewExt};

    fn grid() -> Buffer<i32> {
        // value = x + 10 * y
        let data = (0..4)
            .flat_map(|y| (0..3).map(move |x| x + 10 * y))
            .collect();
        Buffer::from_vec(data, &[3, 4]).unwrap()
    }

    #[test]
    fn translate_moves_bounds_and_values() {
        let src = grid();
        let moved = (&src).translate(&[5, -1]).unwrap();
        let bounds = moved.bounds().unwrap();
        assert_eq!(bounds.min_slice(), &[5, -1]);
        assert_eq!(moved.get(&[6, 0]).unwrap(), 11);
        let back = moved.translate_inverse(&[5, -1]).unwrap();
        assert_eq!(back.get(&[1, 1]).unwrap(), 11);
    }

    #[test]
    fn crop_of_extended_view() {
        let src = grid();
        let big = Interval::new(vec![-2, -2], vec![4, 5]).unwrap();
        let padded = (&src)
            .extend(Boundary::Zero)
            .unwrap()
            .interval(big.clone())
            .unwrap();
        assert_eq!(padded.get(&[-2, -2]).unwrap(), 0);
        assert_eq!(padded.get(&[2, 3]).unwrap(), 32);
        assert!(padded.get(&[5, 0]).is_err());

        let cropped = ViewExt::interval(&src, src.bounds().unwrap().expand(-1).unwrap());
        assert!(cropped.is_ok());
    }

    #[test]
    fn permute_and_hyperslice() {
        let src = grid();
        let swapped = (&src).permute(0, 1).unwrap();
        assert_eq!(swapped.bounds().unwrap().dims(), vec![4, 3]);
        assert_eq!(swapped.get(&[3, 2]).unwrap(), 32);

        let row = (&src).hyperslice(1, 2).unwrap();
        assert_eq!(row.num_dims(), 1);
        assert_eq!(row.get(&[1]).unwrap(), 21);
        assert!((&src).hyperslice(1, 9).is_err());
    }

    #[test]
    fn add_dimension_repeats_values() {
        let src = grid();
        let row = (&src).hyperslice(1, 0).unwrap();
        let expanded = row.add_dimension(0, 49).unwrap();
        assert_eq!(expanded.bounds().unwrap().dims(), vec![3, 50]);
        assert_eq!(expanded.get(&[2, 49]).unwrap(), 2);
    }

    #[test]
    fn subsample_keeps_every_step() {
        let src = grid();
        let sub = (&src).subsample(2).unwrap();
        assert_eq!(sub.bounds().unwrap().dims(), vec![2, 2]);
        assert_eq!(sub.get(&[1, 1]).unwrap(), 22);
    }

    #[test]
    fn stack_adds_trailing_axis() {
        let src = grid();
        let slices = vec![
            (&src).hyperslice(1, 0).unwrap(),
            (&src).hyperslice(1, 3).unwrap(),
        ];
        let stacked = Stack::new(slices).unwrap();
        assert_eq!(stacked.bounds().unwrap().dims(), vec![3, 2]);
        assert_eq!(stacked.get(&[1, 1]).unwrap(), 31);
    }
}
