//! Coordinate transforms of real views and rasterization back to integer
//! views.

use crate::interval::{Interval, RealInterval};
use crate::util::math::solve_linear;
use crate::util::{NdViewError, NdViewResult};
use crate::view::{check_domain, RealView, View};
use smallvec::SmallVec;

type RealCoords = SmallVec<[f64; 6]>;

/// Map from real coordinates to real coordinates of the same dimensionality.
pub trait RealTransform {
    fn num_dims(&self) -> usize;

    /// Writes the image of `pos` into `out`; both hold `num_dims` values.
    fn apply_into(&self, pos: &[f64], out: &mut [f64]);

    /// Maps a point.
    fn apply(&self, pos: &[f64]) -> NdViewResult<Vec<f64>> {
        if pos.len() != self.num_dims() {
            return Err(NdViewError::DimensionMismatch {
                expected: self.num_dims(),
                got: pos.len(),
            });
        }
        let mut out = vec![0.0; pos.len()];
        self.apply_into(pos, &mut out);
        Ok(out)
    }
}

/// Affine map `x -> A x + t` stored as an `n x (n + 1)` row-major matrix
/// whose last column is `t`.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineTransform {
    n: usize,
    matrix: Vec<f64>,
}

impl AffineTransform {
    pub fn identity(n: usize) -> Self {
        let mut matrix = vec![0.0; n * (n + 1)];
        for d in 0..n {
            matrix[d * (n + 1) + d] = 1.0;
        }
        Self { n, matrix }
    }

    /// Wraps an `n x (n + 1)` row-major matrix.
    pub fn from_matrix(n: usize, matrix: Vec<f64>) -> NdViewResult<Self> {
        if n == 0 || matrix.len() != n * (n + 1) {
            return Err(NdViewError::InvalidInput("affine matrix must be n x (n + 1)"));
        }
        Ok(Self { n, matrix })
    }

    pub fn translation(offset: &[f64]) -> Self {
        let mut t = Self::identity(offset.len());
        for (d, &o) in offset.iter().enumerate() {
            t.set(d, t.n, o);
        }
        t
    }

    /// Per-axis scaling about the origin.
    pub fn scale(factors: &[f64]) -> Self {
        let mut t = Self::identity(factors.len());
        for (d, &f) in factors.iter().enumerate() {
            t.set(d, d, f);
        }
        t
    }

    /// Counter-clockwise rotation about the origin of the `(x, y)` plane.
    pub fn rotation_2d(angle_rad: f64) -> Self {
        let (sin, cos) = angle_rad.sin_cos();
        Self {
            n: 2,
            matrix: vec![cos, -sin, 0.0, sin, cos, 0.0],
        }
    }

    pub fn matrix(&self) -> &[f64] {
        &self.matrix
    }

    fn at(&self, row: usize, col: usize) -> f64 {
        self.matrix[row * (self.n + 1) + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.matrix[row * (self.n + 1) + col] = value;
    }

    /// Returns the transform applying `self` first and `next` second.
    pub fn then(&self, next: &AffineTransform) -> NdViewResult<Self> {
        if self.n != next.n {
            return Err(NdViewError::DimensionMismatch {
                expected: self.n,
                got: next.n,
            });
        }
        let n = self.n;
        let mut out = Self::identity(n);
        for r in 0..n {
            for c in 0..=n {
                let mut acc: f64 = (0..n).map(|k| next.at(r, k) * self.at(k, c)).sum();
                if c == n {
                    acc += next.at(r, n);
                }
                out.set(r, c, acc);
            }
        }
        Ok(out)
    }

    /// Inverse transform; singular matrices are rejected.
    pub fn inverse(&self) -> NdViewResult<Self> {
        let n = self.n;
        let mut linear = vec![0.0; n * n];
        let mut inv = vec![0.0; n * n];
        for r in 0..n {
            for c in 0..n {
                linear[r * n + c] = self.at(r, c);
            }
            inv[r * n + r] = 1.0;
        }
        if !solve_linear(&mut linear, &mut inv, n, n) {
            return Err(NdViewError::InvalidInput("affine transform is not invertible"));
        }
        let mut out = Self::identity(n);
        for r in 0..n {
            let mut t = 0.0;
            for c in 0..n {
                let v = inv[r * n + c];
                out.set(r, c, v);
                t -= v * self.at(c, n);
            }
            out.set(r, n, t);
        }
        Ok(out)
    }

    /// Bounding box of the transformed corners of `bounds`.
    pub fn estimate_bounds(&self, bounds: &RealInterval) -> NdViewResult<RealInterval> {
        if bounds.num_dims() != self.n {
            return Err(NdViewError::DimensionMismatch {
                expected: self.n,
                got: bounds.num_dims(),
            });
        }
        let mut min = vec![f64::INFINITY; self.n];
        let mut max = vec![f64::NEG_INFINITY; self.n];
        let mut corner = vec![0.0; self.n];
        let mut mapped = vec![0.0; self.n];
        for mask in 0..(1usize << self.n) {
            for (d, c) in corner.iter_mut().enumerate() {
                *c = if (mask >> d) & 1 == 1 {
                    bounds.max(d)
                } else {
                    bounds.min(d)
                };
            }
            self.apply_into(&corner, &mut mapped);
            for d in 0..self.n {
                min[d] = min[d].min(mapped[d]);
                max[d] = max[d].max(mapped[d]);
            }
        }
        RealInterval::new(min, max)
    }
}

impl RealTransform for AffineTransform {
    fn num_dims(&self) -> usize {
        self.n
    }

    fn apply_into(&self, pos: &[f64], out: &mut [f64]) {
        for (r, value) in out.iter_mut().enumerate() {
            let row = &self.matrix[r * (self.n + 1)..(r + 1) * (self.n + 1)];
            *value = row[..self.n].iter().zip(pos).map(|(a, x)| a * x).sum::<f64>() + row[self.n];
        }
    }
}

/// Real view read through a coordinate transform: the value at `x` is the
/// source value at `transform(x)`.
pub struct Transformed<R, T> {
    source: R,
    transform: T,
}

/// Affinely moved real view, see [`RealViewExt::affine`].
pub type Affine<R> = Transformed<R, AffineTransform>;

impl<R: RealView, T: RealTransform> Transformed<R, T> {
    pub fn new(source: R, transform: T) -> NdViewResult<Self> {
        if source.num_dims() != transform.num_dims() {
            return Err(NdViewError::DimensionMismatch {
                expected: source.num_dims(),
                got: transform.num_dims(),
            });
        }
        Ok(Self { source, transform })
    }

    /// Map from output coordinates to source coordinates.
    pub fn source_transform(&self) -> &T {
        &self.transform
    }
}

impl<R: RealView, T: RealTransform> RealView for Transformed<R, T> {
    type Item = R::Item;

    fn num_dims(&self) -> usize {
        self.transform.num_dims()
    }

    fn get_real(&self, pos: &[f64]) -> NdViewResult<R::Item> {
        if pos.len() != self.num_dims() {
            return Err(NdViewError::DimensionMismatch {
                expected: self.num_dims(),
                got: pos.len(),
            });
        }
        let mut src: RealCoords = SmallVec::from_elem(0.0, pos.len());
        self.transform.apply_into(pos, &mut src);
        self.source.get_real(&src)
    }
}

/// Samples a real view at integer coordinates. The result is unbounded;
/// restrict it with `ViewExt::interval`.
pub struct Rastered<R> {
    source: R,
}

impl<R: RealView> Rastered<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }
}

impl<R: RealView> View for Rastered<R> {
    type Item = R::Item;

    fn num_dims(&self) -> usize {
        self.source.num_dims()
    }

    fn bounds(&self) -> Option<&Interval> {
        None
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<R::Item> {
        check_domain(self.num_dims(), None, pos)?;
        let real: RealCoords = pos.iter().map(|&p| p as f64).collect();
        self.source.get_real(&real)
    }
}

/// Fluent combinators for real views.
pub trait RealViewExt: RealView + Sized {
    /// Moves the content by `transform`: the result at `x` is the source at
    /// `transform^-1(x)`.
    fn affine(self, transform: AffineTransform) -> NdViewResult<Affine<Self>> {
        let inverse = transform.inverse()?;
        Transformed::new(self, inverse)
    }

    /// Reads the source at `transform(x)`, for warps without a closed-form
    /// inverse such as [`ThinPlateSpline`](super::ThinPlateSpline).
    fn transform<T: RealTransform>(self, transform: T) -> NdViewResult<Transformed<Self, T>> {
        Transformed::new(self, transform)
    }

    fn raster(self) -> Rastered<Self> {
        Rastered::new(self)
    }
}

impl<R: RealView> RealViewExt for R {}

#[cfg(test)]
mod tests {
    use super::{AffineTransform, RealTransform, RealViewExt};
    use crate::buffer::Buffer;
    use crate::interpolate::Interpolation;
    use crate::interval::{Interval, RealInterval};
    use crate::view::{Boundary, View, ViewExt};
    use std::f64::consts::FRAC_PI_2;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn inverse_undoes_transform() {
        let t = AffineTransform::rotation_2d(0.3)
            .then(&AffineTransform::translation(&[4.0, -2.0]))
            .unwrap()
            .then(&AffineTransform::scale(&[2.0, 0.5]))
            .unwrap();
        let inv = t.inverse().unwrap();
        let p = [1.5, -7.25];
        let back = inv.apply(&t.apply(&p).unwrap()).unwrap();
        assert!((back[0] - p[0]).abs() < 1e-9);
        assert!((back[1] - p[1]).abs() < 1e-9);

        let singular = AffineTransform::scale(&[1.0, 0.0]);
        assert!(singular.inverse().is_err());
    }

    #[test]
    fn rotated_bounds_of_square() {
        let square = RealInterval::from(&Interval::from_dims(&[10, 10]).unwrap());
        let rotated = AffineTransform::rotation_2d(FRAC_PI_4)
            .estimate_bounds(&square)
            .unwrap();
        let inner = rotated.largest_contained_interval().unwrap();
        assert_eq!(inner.min_slice(), &[-6, 0]);
        assert_eq!(inner.max_slice(), &[6, 12]);
    }

    #[test]
    fn quarter_turn_raster() {
        let src = Buffer::<u8>::from_vec((0..12).collect(), &[4, 3]).unwrap();
        let rotated = (&src)
            .extend(Boundary::Zero)
            .unwrap()
            .interpolate(Interpolation::NearestNeighbor)
            .affine(AffineTransform::rotation_2d(FRAC_PI_2))
            .unwrap()
            .raster();
        // (x, y) in the output reads (y, -x) in the source
        assert_eq!(rotated.get(&[-1, 2]).unwrap(), src.get(&[2, 1]).unwrap());
        assert_eq!(rotated.get(&[0, 0]).unwrap(), 0);
        assert_eq!(rotated.get(&[5, 5]).unwrap(), 0);
        let window = Interval::new(vec![-2, 0], vec![0, 3]).unwrap();
        let out = rotated.interval(window).unwrap().collect().unwrap();
        assert_eq!(out.get(&[-2, 3]).unwrap(), src.get(&[3, 2]).unwrap());
    }
}
