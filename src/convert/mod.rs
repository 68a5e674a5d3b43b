//! Lazy per-coordinate converters.
//!
//! A converter owns its source view(s) and a mapping function. It stores no
//! values: `get` fetches the source value(s) at the same coordinate and maps
//! them on every call. Converters are read-only unless an inverse mapping is
//! attached with [`Converted::with_inverse`]; writing through a converter
//! without one fails with [`NdViewError::InvalidWrite`].

use crate::interval::Interval;
use crate::pixel::{Argb, RealPixel};
use crate::util::{NdViewError, NdViewResult};
use crate::view::{View, WritableView};

/// Maps a written value back onto the source element it came from.
pub trait WriteBack<S, T> {
    /// Returns the updated source value, given the current one and the value
    /// written through the converter.
    fn write_back(&self, source: S, value: T) -> NdViewResult<S>;
}

/// Marker for converters without an inverse mapping.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInverse;

impl<S, T> WriteBack<S, T> for NoInverse {
    fn write_back(&self, _source: S, _value: T) -> NdViewResult<S> {
        Err(NdViewError::InvalidWrite {
            reason: "converter has no inverse mapping",
        })
    }
}

/// Inverse mapping `g(current_source, written) -> new_source`.
#[derive(Clone, Copy, Debug)]
pub struct Inverse<G>(pub G);

impl<S, T, G: Fn(S, T) -> S> WriteBack<S, T> for Inverse<G> {
    fn write_back(&self, source: S, value: T) -> NdViewResult<S> {
        Ok((self.0)(source, value))
    }
}

/// Unary converter: `get(c) == f(source.get(c))`.
pub struct Converted<V, F, W = NoInverse> {
    source: V,
    forward: F,
    inverse: W,
}

impl<V, F> Converted<V, F> {
    pub fn new(source: V, forward: F) -> Self {
        Self {
            source,
            forward,
            inverse: NoInverse,
        }
    }

    /// Attaches an inverse mapping so that writes reach the source.
    pub fn with_inverse<G>(self, inverse: G) -> Converted<V, F, Inverse<G>> {
        Converted {
            source: self.source,
            forward: self.forward,
            inverse: Inverse(inverse),
        }
    }
}

impl<V, F, W> Converted<V, F, W> {
    pub fn source(&self) -> &V {
        &self.source
    }

    pub fn into_source(self) -> V {
        self.source
    }
}

impl<V: View, T, F: Fn(V::Item) -> T, W> View for Converted<V, F, W> {
    type Item = T;

    fn num_dims(&self) -> usize {
        self.source.num_dims()
    }

    fn bounds(&self) -> Option<&Interval> {
        self.source.bounds()
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<T> {
        self.source.get(pos).map(&self.forward)
    }
}

impl<V, T, F, W> WritableView for Converted<V, F, W>
where
    V: WritableView,
    F: Fn(V::Item) -> T,
    W: WriteBack<V::Item, T>,
{
    fn set(&mut self, pos: &[i64], value: T) -> NdViewResult<()> {
        let current = self.source.get(pos)?;
        let updated = self.inverse.write_back(current, value)?;
        self.source.set(pos, updated)
    }
}

/// Binary converter: `get(c) == f(a.get(c), b.get(c))`.
pub struct BiConverted<A, B, F> {
    a: A,
    b: B,
    f: F,
}

impl<A: View, B: View, F> BiConverted<A, B, F> {
    /// Both sources must have the same dimensionality and bounds.
    pub fn new(a: A, b: B, f: F) -> NdViewResult<Self> {
        if a.num_dims() != b.num_dims() {
            return Err(NdViewError::DimensionMismatch {
                expected: a.num_dims(),
                got: b.num_dims(),
            });
        }
        if a.bounds() != b.bounds() {
            let describe = |bounds: Option<&Interval>| {
                bounds.map_or_else(|| "unbounded".to_string(), Interval::to_string)
            };
            return Err(NdViewError::BoundsMismatch {
                left: describe(a.bounds()),
                right: describe(b.bounds()),
            });
        }
        Ok(Self { a, b, f })
    }
}

impl<A: View, B: View, T, F: Fn(A::Item, B::Item) -> T> View for BiConverted<A, B, F> {
    type Item = T;

    fn num_dims(&self) -> usize {
        self.a.num_dims()
    }

    fn bounds(&self) -> Option<&Interval> {
        self.a.bounds()
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<T> {
        let left = self.a.get(pos)?;
        let right = self.b.get(pos)?;
        Ok((self.f)(left, right))
    }
}

/// Converter returned by [`argb_channel`].
pub type ArgbChannel<V> = Converted<
    V,
    Box<dyn Fn(Argb) -> u8 + Send + Sync>,
    Inverse<Box<dyn Fn(Argb, u8) -> Argb + Send + Sync>>,
>;

/// Exposes one channel of an ARGB view as `u8` (0 = alpha, 1 = red,
/// 2 = green, 3 = blue). Writes update only that channel of the source.
pub fn argb_channel<V: View<Item = Argb>>(source: V, channel: usize) -> NdViewResult<ArgbChannel<V>> {
    if channel > 3 {
        return Err(NdViewError::InvalidInput("ARGB channel must be in 0..=3"));
    }
    let forward: Box<dyn Fn(Argb) -> u8 + Send + Sync> = Box::new(move |c: Argb| c.channel(channel));
    let inverse: Box<dyn Fn(Argb, u8) -> Argb + Send + Sync> =
        Box::new(move |c: Argb, v: u8| c.with_channel(channel, v));
    Ok(Converted::new(source, forward).with_inverse(inverse))
}

/// Lazily converts any real view to `f32`.
pub fn real_to_f32<V>(source: V) -> Converted<V, fn(V::Item) -> f32>
where
    V: View,
    V::Item: RealPixel,
{
    let forward: fn(V::Item) -> f32 = |v| v.to_f64() as f32;
    Converted::new(source, forward)
}

/// Lazily converts any real view to `f64`.
pub fn real_to_f64<V>(source: V) -> Converted<V, fn(V::Item) -> f64>
where
    V: View,
    V::Item: RealPixel,
{
    let forward: fn(V::Item) -> f64 = |v| v.to_f64();
    Converted::new(source, forward)
}

/// Writes `value` at every position of a bounded writable view.
pub fn fill<V: WritableView>(view: &mut V, value: V::Item) -> NdViewResult<()>
where
    V::Item: Clone,
{
    assign(view, |_| value.clone())
}

/// Writes `f(current)` at every position of a bounded writable view.
pub fn assign<V: WritableView>(view: &mut V, f: impl Fn(V::Item) -> V::Item) -> NdViewResult<()> {
    let bounds = view
        .bounds()
        .cloned()
        .ok_or(NdViewError::InvalidInput("cannot iterate an unbounded view"))?;
    for pos in bounds.positions() {
        let current = view.get(&pos)?;
        view.set(&pos, f(current))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{argb_channel, assign, fill, real_to_f32, BiConverted};
    use crate::buffer::Buffer;
    use crate::pixel::Argb;
    use crate::util::NdViewError;
    use crate::view::{View, ViewExt, WritableView};

    #[test]
    fn unary_chain_matches_composition() {
        let src = Buffer::<u8>::from_vec((0..16).collect(), &[4, 4]).unwrap();
        let chain = real_to_f32(&src).convert(|v| (v.sqrt() as f64).cos());
        for (pos, &v) in src.iter() {
            let expected = ((v as f32).sqrt() as f64).cos();
            assert_eq!(chain.get(&pos).unwrap(), expected);
        }
    }

    #[test]
    fn binary_converter_requires_matching_bounds() {
        let a = Buffer::<f32>::from_vec(vec![1.0; 4], &[2, 2]).unwrap();
        let b = Buffer::<f32>::from_vec(vec![2.0; 6], &[3, 2]).unwrap();
        let err = BiConverted::new(&a, &b, |x: f32, y: f32| x - y).err().unwrap();
        assert!(matches!(err, NdViewError::BoundsMismatch { .. }));

        let c = Buffer::<f32>::from_vec(vec![0.5, 1.5, 2.5, 3.5], &[2, 2]).unwrap();
        let diff = (&a).convert_with(&c, |x, y| x as f64 - y as f64).unwrap();
        assert_eq!(diff.get(&[1, 1]).unwrap(), -2.5);
    }

    #[test]
    fn read_only_converter_rejects_writes() {
        let mut src = Buffer::<u8>::from_vec(vec![1, 2], &[2]).unwrap();
        let mut doubled = (&mut src).convert(|v| v * 2);
        let err = doubled.set(&[0], 8).err().unwrap();
        assert_eq!(
            err,
            NdViewError::InvalidWrite {
                reason: "converter has no inverse mapping",
            }
        );
    }

    #[test]
    fn inverse_mapping_writes_through() {
        let mut src = Buffer::<u8>::from_vec(vec![1, 2], &[2]).unwrap();
        {
            let mut doubled = (&mut src).convert(|v| v * 2).with_inverse(|_, w: u8| w / 2);
            doubled.set(&[1], 10).unwrap();
            assert_eq!(doubled.get(&[1]).unwrap(), 10);
        }
        assert_eq!(src.get(&[1]).unwrap(), 5);
    }

    #[test]
    fn zeroing_red_keeps_other_channels() {
        let original: Vec<Argb> = (0..12u8)
            .map(|i| Argb::rgba(i * 20, i * 3, 255 - i, 100 + i))
            .collect();
        let mut image = Buffer::from_vec(original.clone(), &[4, 3]).unwrap();
        {
            let mut red = argb_channel(&mut image, 1).unwrap();
            fill(&mut red, 0).unwrap();
        }
        for ((_, after), before) in image.flat_iter().zip(&original) {
            assert_eq!(after.red(), 0);
            assert_eq!(after.green(), before.green());
            assert_eq!(after.blue(), before.blue());
            assert_eq!(after.alpha(), before.alpha());
        }
    }

    #[test]
    fn assign_maps_every_element() {
        let mut src = Buffer::<i32>::from_vec(vec![1, 2, 3], &[3]).unwrap();
        assign(&mut src, |v| v * v).unwrap();
        assert_eq!(src.as_slice().unwrap(), &[1, 4, 9]);
    }
}
