//! Image operations composed from views and converters.
//!
//! Most operations return lazy views; only the Gaussian blur materializes its
//! intermediate passes.

mod gauss;
mod gradient;
mod stats;

pub use gauss::{difference_of_gaussian, gauss, GaussConfig};
pub use gradient::{gradient, gradient_magnitude, mean_filter3};
pub use stats::{center_value, max, max_with_location, real_sum};

use crate::convert::Converted;
use crate::view::View;

/// Lazy segmentation: `true` where the value is at least `threshold`.
///
/// Only `PartialOrd` is needed, so any ordered element can be thresholded.
pub fn threshold<V>(view: V, threshold: V::Item) -> Converted<V, impl Fn(V::Item) -> bool>
where
    V: View,
    V::Item: PartialOrd,
{
    Converted::new(view, move |v: V::Item| v >= threshold)
}
