//! Reductions over bounded views.

use crate::pixel::RealPixel;
use crate::util::math::KahanSum;
use crate::util::NdViewResult;
use crate::view::{require_bounds, View};

/// Largest value of a bounded view.
pub fn max<V>(view: &V) -> NdViewResult<V::Item>
where
    V: View + ?Sized,
    V::Item: PartialOrd,
{
    max_with_location(view).map(|(_, value)| value)
}

/// Largest value and its first position in flat order.
pub fn max_with_location<V>(view: &V) -> NdViewResult<(Vec<i64>, V::Item)>
where
    V: View + ?Sized,
    V::Item: PartialOrd,
{
    let bounds = require_bounds(view, "cannot reduce an unbounded view")?;
    let mut positions = bounds.into_positions();
    // Boxes are never empty, so the first position always exists.
    let first = positions.next().unwrap_or_default();
    let mut best_value = view.get(&first)?;
    let mut best_pos = first;
    for pos in positions {
        let value = view.get(&pos)?;
        if value > best_value {
            best_value = value;
            best_pos = pos;
        }
    }
    Ok((best_pos, best_value))
}

/// Value at the centre of the view's bounds (rounded towards `min`).
pub fn center_value<V>(view: &V) -> NdViewResult<V::Item>
where
    V: View + ?Sized,
{
    let bounds = require_bounds(view, "an unbounded view has no centre")?;
    view.get(&bounds.center())
}

/// Compensated sum of all values.
pub fn real_sum<V>(view: &V) -> NdViewResult<f64>
where
    V: View + ?Sized,
    V::Item: RealPixel,
{
    let bounds = require_bounds(view, "cannot reduce an unbounded view")?;
    let mut sum = KahanSum::default();
    for pos in bounds.into_positions() {
        sum.add(view.get(&pos)?.to_f64());
    }
    Ok(sum.sum())
}
