//! Element capability traits.
//!
//! Each operation asks for exactly the capabilities it needs: `Pixel` for
//! storage and copying, `Numeric` for arithmetic, `RealPixel` for ordered real
//! values with `f64` conversion. Complex and ARGB values are `Numeric` but not
//! `RealPixel`, so real-only operations such as [`sqrt`] reject them at
//! compile time.

mod argb;

pub use argb::Argb;

use crate::buffer::Buffer;
use num_complex::Complex;

/// Copyable element that can live in a buffer.
pub trait Pixel: Copy + Default + Send + Sync + 'static {}

impl<T: Copy + Default + Send + Sync + 'static> Pixel for T {}

/// Element supporting addition, subtraction and multiplication.
pub trait Numeric: Pixel {
    fn zero() -> Self;
    fn one() -> Self;
    fn add(self, other: Self) -> Self;
    fn sub(self, other: Self) -> Self;
    fn mul(self, other: Self) -> Self;
    /// Multiplies by a real factor.
    fn scale(self, factor: f64) -> Self;
}

/// Ordered real-valued element.
pub trait RealPixel: Numeric + PartialOrd {
    /// Smallest representable value.
    fn min_value() -> f64;
    /// Largest representable value.
    fn max_value() -> f64;
    fn to_f64(self) -> f64;
    /// Converts from `f64`, rounding and saturating for integer types.
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_integer_pixel {
    ($($t:ty),*) => {$(
        impl Numeric for $t {
            fn zero() -> Self { 0 }
            fn one() -> Self { 1 }
            fn add(self, other: Self) -> Self { self.saturating_add(other) }
            fn sub(self, other: Self) -> Self { self.saturating_sub(other) }
            fn mul(self, other: Self) -> Self { self.saturating_mul(other) }
            fn scale(self, factor: f64) -> Self { Self::from_f64(self as f64 * factor) }
        }

        impl RealPixel for $t {
            fn min_value() -> f64 { <$t>::MIN as f64 }
            fn max_value() -> f64 { <$t>::MAX as f64 }
            fn to_f64(self) -> f64 { self as f64 }
            fn from_f64(value: f64) -> Self {
                // `as` saturates and maps NaN to zero.
                value.round() as $t
            }
        }
    )*};
}

macro_rules! impl_float_pixel {
    ($($t:ty),*) => {$(
        impl Numeric for $t {
            fn zero() -> Self { 0.0 }
            fn one() -> Self { 1.0 }
            fn add(self, other: Self) -> Self { self + other }
            fn sub(self, other: Self) -> Self { self - other }
            fn mul(self, other: Self) -> Self { self * other }
            fn scale(self, factor: f64) -> Self { (self as f64 * factor) as $t }
        }

        impl RealPixel for $t {
            fn min_value() -> f64 { <$t>::MIN as f64 }
            fn max_value() -> f64 { <$t>::MAX as f64 }
            fn to_f64(self) -> f64 { self as f64 }
            fn from_f64(value: f64) -> Self { value as $t }
        }
    )*};
}

impl_integer_pixel!(u8, u16, i32);
impl_float_pixel!(f32, f64);

macro_rules! impl_complex_pixel {
    ($($t:ty),*) => {$(
        impl Numeric for Complex<$t> {
            fn zero() -> Self { Complex::new(0.0, 0.0) }
            fn one() -> Self { Complex::new(1.0, 0.0) }
            fn add(self, other: Self) -> Self { self + other }
            fn sub(self, other: Self) -> Self { self - other }
            fn mul(self, other: Self) -> Self { self * other }
            fn scale(self, factor: f64) -> Self { self * (factor as $t) }
        }
    )*};
}

impl_complex_pixel!(f32, f64);

/// Adds `value` to every element of `buffer`.
pub fn add<T: Numeric>(buffer: &mut Buffer<T>, value: T) {
    for v in buffer.values_mut() {
        *v = v.add(value);
    }
}

/// Replaces every element of `buffer` by its square root.
pub fn sqrt<T: RealPixel>(buffer: &mut Buffer<T>) {
    for v in buffer.values_mut() {
        *v = T::from_f64(v.to_f64().sqrt());
    }
}
