//! Lazily evaluated n-dimensional views.
//!
//! A `View` maps integer coordinates to values. Bounded views declare an
//! [`Interval`] and fail with [`NdViewError::OutOfDomain`] outside it;
//! unbounded views (boundary-extended sources, functions) accept any
//! coordinate. Views never cache: every `get` re-evaluates the chain it was
//! built from, so a chain of depth k costs O(k) per access.
//!
//! Views own their sources. Because `&V`, `&mut V`, `Box<V>` and `Arc<V>` are
//! views too, a chain can still borrow the data it reads.

mod extend;
mod function;
mod transform;

pub use extend::{Boundary, Extended, ExtendedRandom};
pub use function::{FunctionRealView, FunctionView};
pub use transform::{AddDimension, Bounded, HyperSlice, Permuted, Stack, Subsample, Translated};

use crate::buffer::{Buffer, Layout};
use crate::convert::{BiConverted, Converted};
use crate::interpolate::{Interpolated, Interpolation};
use crate::interval::Interval;
use crate::materialize;
use crate::pixel::{Pixel, RealPixel};
use crate::util::{NdViewError, NdViewResult};
use smallvec::SmallVec;
use std::sync::Arc;

/// Coordinate scratch storage; stays on the stack for up to six dimensions.
pub(crate) type Coords = SmallVec<[i64; 6]>;

/// Random-access, side-effect free view over integer coordinates.
pub trait View {
    type Item;

    /// Returns the number of dimensions.
    fn num_dims(&self) -> usize;

    /// Returns the declared bounds, or `None` when defined everywhere.
    fn bounds(&self) -> Option<&Interval>;

    /// Evaluates the view at `pos`.
    fn get(&self, pos: &[i64]) -> NdViewResult<Self::Item>;
}

/// View that also accepts writes.
pub trait WritableView: View {
    /// Stores `value` at `pos`.
    fn set(&mut self, pos: &[i64], value: Self::Item) -> NdViewResult<()>;
}

/// Real-coordinate view, e.g. an interpolated or transformed image.
pub trait RealView {
    type Item;

    fn num_dims(&self) -> usize;

    /// Evaluates the view at a real position.
    fn get_real(&self, pos: &[f64]) -> NdViewResult<Self::Item>;
}

/// Boxed thread-safe view, used for chains whose shape is only known at run
/// time.
pub type DynView<'a, T> = Box<dyn View<Item = T> + Send + Sync + 'a>;

/// Boxed thread-safe real view.
pub type DynRealView<'a, T> = Box<dyn RealView<Item = T> + Send + Sync + 'a>;

/// Checks that `pos` has the right length and lies inside `bounds`.
pub(crate) fn check_domain(
    num_dims: usize,
    bounds: Option<&Interval>,
    pos: &[i64],
) -> NdViewResult<()> {
    if pos.len() != num_dims {
        return Err(NdViewError::DimensionMismatch {
            expected: num_dims,
            got: pos.len(),
        });
    }
    match bounds {
        Some(bounds) if !bounds.contains(pos) => Err(NdViewError::OutOfDomain {
            position: pos.to_vec(),
            bounds: bounds.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Returns the bounds of `view`, failing for unbounded views.
pub(crate) fn require_bounds<V: View + ?Sized>(
    view: &V,
    context: &'static str,
) -> NdViewResult<Interval> {
    view.bounds().cloned().ok_or(NdViewError::InvalidInput(context))
}

macro_rules! forward_view {
    ($($wrapper:ty),*) => {$(
        impl<V: View + ?Sized> View for $wrapper {
            type Item = V::Item;

            fn num_dims(&self) -> usize {
                (**self).num_dims()
            }

            fn bounds(&self) -> Option<&Interval> {
                (**self).bounds()
            }

            fn get(&self, pos: &[i64]) -> NdViewResult<V::Item> {
                (**self).get(pos)
            }
        }
    )*};
}

forward_view!(&V, &mut V, Box<V>, Arc<V>);

impl<V: WritableView + ?Sized> WritableView for &mut V {
    fn set(&mut self, pos: &[i64], value: V::Item) -> NdViewResult<()> {
        (**self).set(pos, value)
    }
}

impl<V: WritableView + ?Sized> WritableView for Box<V> {
    fn set(&mut self, pos: &[i64], value: V::Item) -> NdViewResult<()> {
        (**self).set(pos, value)
    }
}

macro_rules! forward_real_view {
    ($($wrapper:ty),*) => {$(
        impl<R: RealView + ?Sized> RealView for $wrapper {
            type Item = R::Item;

            fn num_dims(&self) -> usize {
                (**self).num_dims()
            }

            fn get_real(&self, pos: &[f64]) -> NdViewResult<R::Item> {
                (**self).get_real(pos)
            }
        }
    )*};
}

forward_real_view!(&R, Box<R>, Arc<R>);

/// Fluent combinators available on every view.
pub trait ViewExt: View + Sized {
    /// Lazily maps every value through `f`.
    fn convert<T, F>(self, f: F) -> Converted<Self, F>
    where
        F: Fn(Self::Item) -> T,
    {
        Converted::new(self, f)
    }

    /// Lazily combines two views value by value.
    fn convert_with<B, T, F>(self, other: B, f: F) -> NdViewResult<BiConverted<Self, B, F>>
    where
        B: View,
        F: Fn(Self::Item, B::Item) -> T,
    {
        BiConverted::new(self, other, f)
    }

    /// Extends a bounded view to every coordinate.
    fn extend(self, boundary: Boundary<Self::Item>) -> NdViewResult<Extended<Self>>
    where
        Self::Item: Pixel,
    {
        Extended::new(self, boundary)
    }

    /// Extends a bounded view with uniform random values in `[min, max]`.
    fn extend_random(self, min: f64, max: f64, seed: u64) -> NdViewResult<ExtendedRandom<Self>>
    where
        Self::Item: RealPixel,
    {
        ExtendedRandom::new(self, min, max, seed)
    }

    /// Restricts (or, for extended views, re-bounds) the view to `bounds`.
    fn interval(self, bounds: Interval) -> NdViewResult<Bounded<Self>> {
        Bounded::new(self, bounds)
    }

    /// Moves the view by `offset`: the result at `x` is the source at
    /// `x - offset`.
    fn translate(self, offset: &[i64]) -> NdViewResult<Translated<Self>> {
        Translated::new(self, offset)
    }

    /// Moves the view by `-offset`.
    fn translate_inverse(self, offset: &[i64]) -> NdViewResult<Translated<Self>> {
        let negated: Vec<i64> = offset.iter().map(|o| -o).collect();
        Translated::new(self, &negated)
    }

    /// Swaps axes `a` and `b`.
    fn permute(self, a: usize, b: usize) -> NdViewResult<Permuted<Self>> {
        Permuted::new(self, a, b)
    }

    /// Fixes dimension `dim` at `pos`, dropping it.
    fn hyperslice(self, dim: usize, pos: i64) -> NdViewResult<HyperSlice<Self>> {
        HyperSlice::new(self, dim, pos)
    }

    /// Appends a trailing dimension spanning `[min, max]`.
    fn add_dimension(self, min: i64, max: i64) -> NdViewResult<AddDimension<Self>> {
        AddDimension::new(self, min, max)
    }

    /// Keeps every `step`-th position in every dimension.
    fn subsample(self, step: usize) -> NdViewResult<Subsample<Self>> {
        Subsample::new(self, step)
    }

    /// Turns the view into a real view using `interpolation`.
    fn interpolate(self, interpolation: Interpolation) -> Interpolated<Self>
    where
        Self::Item: RealPixel,
    {
        Interpolated::new(self, interpolation)
    }

    /// Erases the view type.
    fn boxed<'a>(self) -> DynView<'a, Self::Item>
    where
        Self: Send + Sync + 'a,
    {
        Box::new(self)
    }

    /// Copies the view over `interval` into a new buffer.
    fn materialize(&self, interval: &Interval, layout: Layout) -> NdViewResult<Buffer<Self::Item>>
    where
        Self::Item: Pixel,
    {
        materialize::materialize(self, interval, layout)
    }

    /// Copies the view over its own bounds into a new contiguous buffer.
    fn collect(&self) -> NdViewResult<Buffer<Self::Item>>
    where
        Self::Item: Pixel,
    {
        materialize::collect(self, Layout::Array)
    }
}

impl<V: View> ViewExt for V {}
