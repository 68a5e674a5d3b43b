//! Packed 32-bit colour pixels.

use super::Numeric;

/// Colour packed as `0xAARRGGBB`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Argb(pub u32);

impl Argb {
    /// Packs red, green, blue and alpha channels.
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self((u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b))
    }

    /// Returns channel `index` where 0 = alpha, 1 = red, 2 = green, 3 = blue.
    pub fn channel(self, index: usize) -> u8 {
        let shift = 24 - 8 * (index as u32 & 3);
        ((self.0 >> shift) & 0xFF) as u8
    }

    /// Returns a copy with channel `index` replaced.
    pub fn with_channel(self, index: usize, value: u8) -> Self {
        let shift = 24 - 8 * (index as u32 & 3);
        let mask = !(0xFFu32 << shift);
        Self((self.0 & mask) | (u32::from(value) << shift))
    }

    pub fn alpha(self) -> u8 {
        self.channel(0)
    }

    pub fn red(self) -> u8 {
        self.channel(1)
    }

    pub fn green(self) -> u8 {
        self.channel(2)
    }

    pub fn blue(self) -> u8 {
        self.channel(3)
    }

    fn zip_channels(self, other: Self, f: impl Fn(u8, u8) -> u8) -> Self {
        let mut out = Self(0);
        for index in 0..4 {
            out = out.with_channel(index, f(self.channel(index), other.channel(index)));
        }
        out
    }
}

impl Numeric for Argb {
    fn zero() -> Self {
        Self(0)
    }

    fn one() -> Self {
        Self::rgba(1, 1, 1, 1)
    }

    fn add(self, other: Self) -> Self {
        self.zip_channels(other, u8::saturating_add)
    }

    fn sub(self, other: Self) -> Self {
        self.zip_channels(other, u8::saturating_sub)
    }

    fn mul(self, other: Self) -> Self {
        self.zip_channels(other, u8::saturating_mul)
    }

    fn scale(self, factor: f64) -> Self {
        let mut out = self;
        for index in 0..4 {
            let scaled = (f64::from(self.channel(index)) * factor).round().clamp(0.0, 255.0);
            out = out.with_channel(index, scaled as u8);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Argb;
    use crate::pixel::Numeric;

    #[test]
    fn channels_round_trip() {
        let c = Argb::rgba(10, 20, 30, 40);
        assert_eq!((c.red(), c.green(), c.blue(), c.alpha()), (10, 20, 30, 40));
        let no_red = c.with_channel(1, 0);
        assert_eq!((no_red.red(), no_red.green(), no_red.blue(), no_red.alpha()), (0, 20, 30, 40));
    }

    #[test]
    fn add_saturates_per_channel() {
        let a = Argb::rgba(200, 10, 0, 255);
        let b = Argb::rgba(100, 5, 0, 1);
        let sum = a.add(b);
        assert_eq!(sum, Argb::rgba(255, 15, 0, 255));
        assert_eq!(a.scale(0.5), Argb::rgba(100, 5, 0, 128));
    }
}
