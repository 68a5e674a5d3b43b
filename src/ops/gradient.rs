//! Finite differences and box means built from shifted, mirror-extended
//! views.
//!
//! Nothing here allocates pixel storage: each result is a chain of
//! translated views combined by binary converters and evaluated on access.

use crate::interval::Interval;
use crate::pixel::RealPixel;
use crate::util::NdViewResult;
use crate::view::{require_bounds, Bounded, Boundary, DynView, Extended, Translated, View, ViewExt};
use std::sync::Arc;

type Shifted<V> = Bounded<Translated<Extended<V>>>;

/// Mirror-extended view restricted to `bounds` whose value at `x` is the
/// source at `x + step * e_dim`.
fn shifted<V>(view: V, bounds: &Interval, dim: usize, step: i64) -> NdViewResult<Shifted<V>>
where
    V: View,
    V::Item: RealPixel,
{
    let mut offset = vec![0; bounds.num_dims()];
    offset[dim] = -step;
    view.extend(Boundary::Mirror)?
        .translate(&offset)?
        .interval(bounds.clone())
}

/// Central difference along `dim`: `img(x + e_dim) - img(x - e_dim)`.
pub fn gradient<'a, V>(view: V, dim: usize) -> NdViewResult<DynView<'a, f64>>
where
    V: View + Clone + Send + Sync + 'a,
    V::Item: RealPixel,
{
    let bounds = require_bounds(&view, "gradient needs a bounded view")?;
    bounds.check_axis(dim)?;
    let ahead = shifted(view.clone(), &bounds, dim, 1)?;
    let behind = shifted(view, &bounds, dim, -1)?;
    let diff = ahead.convert_with(behind, |a: V::Item, b: V::Item| a.to_f64() - b.to_f64())?;
    Ok(diff.boxed())
}

/// Euclidean norm of the central differences over all dimensions.
///
/// Squared gradients are accumulated by one binary converter per dimension
/// and the square root is applied lazily at the end.
pub fn gradient_magnitude<'a, V>(view: V) -> NdViewResult<DynView<'a, f64>>
where
    V: View + Clone + Send + Sync + 'a,
    V::Item: RealPixel,
{
    let mut squared: DynView<'a, f64> = gradient(view.clone(), 0)?.convert(|g| g * g).boxed();
    for dim in 1..view.num_dims() {
        let next = gradient(view.clone(), dim)?;
        squared = squared.convert_with(next, |s, g| s + g * g)?.boxed();
    }
    Ok(squared.convert(f64::sqrt).boxed())
}

/// 3-wide sum along `dim` (left + centre + right), mirror boundary.
fn sum3<'a, V>(view: V, dim: usize) -> NdViewResult<Arc<dyn View<Item = f64> + Send + Sync + 'a>>
where
    V: View + Clone + Send + Sync + 'a,
    V::Item: RealPixel,
{
    let bounds = require_bounds(&view, "mean filter needs a bounded view")?;
    let sides = shifted(view.clone(), &bounds, dim, -1)?.convert_with(
        shifted(view.clone(), &bounds, dim, 1)?,
        |a: V::Item, b: V::Item| a.to_f64() + b.to_f64(),
    )?;
    let total = sides.convert_with(view, |s, c: V::Item| s + c.to_f64())?;
    Ok(Arc::new(total))
}

/// Lazy 3x..x3 mean over all dimensions, normalized by `3^n`.
///
/// Each dimension re-reads the previous sum three times, so one access costs
/// `3^n` source reads.
pub fn mean_filter3<'a, V>(view: V) -> NdViewResult<DynView<'a, f64>>
where
    V: View + Clone + Send + Sync + 'a,
    V::Item: RealPixel,
{
    let n = view.num_dims();
    let mut sum = sum3(view, 0)?;
    for dim in 1..n {
        sum = sum3(sum, dim)?;
    }
    let norm = 3f64.powi(n as i32);
    Ok(sum.convert(move |v| v / norm).boxed())
}
