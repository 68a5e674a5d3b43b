//! Thin-plate spline warps between landmark sets.

use super::{AffineTransform, RealTransform};
use crate::util::math::solve_linear;
use crate::util::{NdViewError, NdViewResult};

/// Smooth non-rigid map taking every source landmark exactly onto its
/// target landmark.
///
/// `f(x) = A x + t + sum_i w_i U(|x - p_i|)` with the radial kernel
/// `U(r) = r^2 ln r`. The weights are orthogonal to the affine part, so
/// landmark sets related by an affine map yield that affine map.
///
/// Used with [`RealViewExt::transform`](super::RealViewExt::transform), the
/// warped view at `x` reads the source at `f(x)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ThinPlateSpline {
    n: usize,
    /// Source landmarks, `m x n` row-major.
    landmarks: Vec<f64>,
    /// Radial weights, `m x n` row-major.
    weights: Vec<f64>,
    affine: AffineTransform,
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// `r^2 ln r` from `r^2`.
fn radial(r2: f64) -> f64 {
    if r2 > 0.0 {
        0.5 * r2 * r2.ln()
    } else {
        0.0
    }
}

impl ThinPlateSpline {
    /// Fits the spline taking `source[i]` to `target[i]`.
    ///
    /// Needs at least `n + 1` landmarks that span the space; duplicated or
    /// degenerate (e.g. collinear in 2D) landmark sets are rejected.
    pub fn new(source: &[Vec<f64>], target: &[Vec<f64>]) -> NdViewResult<Self> {
        if source.len() != target.len() {
            return Err(NdViewError::DimensionMismatch {
                expected: source.len(),
                got: target.len(),
            });
        }
        let n = source.first().map_or(0, Vec::len);
        if n == 0 {
            return Err(NdViewError::InvalidInput("thin-plate spline needs landmarks"));
        }
        for p in source.iter().chain(target) {
            if p.len() != n {
                return Err(NdViewError::DimensionMismatch {
                    expected: n,
                    got: p.len(),
                });
            }
            if !p.iter().all(|v| v.is_finite()) {
                return Err(NdViewError::InvalidInput("landmarks must be finite"));
            }
        }
        let m = source.len();
        if m < n + 1 {
            return Err(NdViewError::InvalidInput(
                "thin-plate spline needs at least n + 1 landmarks",
            ));
        }

        // [K P; P^T 0] [w; a] = [q - p; 0], solved for the displacement so
        // that coinciding landmarks give exactly the identity.
        let size = m + n + 1;
        let mut system = vec![0.0; size * size];
        let mut rhs = vec![0.0; size * n];
        for i in 0..m {
            for j in 0..m {
                system[i * size + j] = radial(squared_distance(&source[i], &source[j]));
            }
            for d in 0..n {
                system[i * size + m + d] = source[i][d];
                system[(m + d) * size + i] = source[i][d];
                rhs[i * n + d] = target[i][d] - source[i][d];
            }
            system[i * size + m + n] = 1.0;
            system[(m + n) * size + i] = 1.0;
        }
        if !solve_linear(&mut system, &mut rhs, size, n) {
            return Err(NdViewError::InvalidInput("thin-plate landmarks are degenerate"));
        }

        let mut matrix = vec![0.0; n * (n + 1)];
        for r in 0..n {
            for c in 0..n {
                let diagonal = if r == c { 1.0 } else { 0.0 };
                matrix[r * (n + 1) + c] = diagonal + rhs[(m + c) * n + r];
            }
            matrix[r * (n + 1) + n] = rhs[(m + n) * n + r];
        }
        rhs.truncate(m * n);
        Ok(Self {
            n,
            landmarks: source.iter().flatten().copied().collect(),
            weights: rhs,
            affine: AffineTransform::from_matrix(n, matrix)?,
        })
    }

    pub fn num_landmarks(&self) -> usize {
        self.landmarks.len() / self.n
    }

    /// Affine part `A x + t` of the spline.
    pub fn affine_part(&self) -> &AffineTransform {
        &self.affine
    }
}

impl RealTransform for ThinPlateSpline {
    fn num_dims(&self) -> usize {
        self.n
    }

    fn apply_into(&self, pos: &[f64], out: &mut [f64]) {
        self.affine.apply_into(pos, out);
        for (p, w) in self.landmarks.chunks(self.n).zip(self.weights.chunks(self.n)) {
            let u = radial(squared_distance(pos, p));
            if u == 0.0 {
                continue;
            }
            for (o, wd) in out.iter_mut().zip(w) {
                *o += wd * u;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ThinPlateSpline;
    use crate::interpolate::{AffineTransform, RealTransform};
    use crate::util::NdViewError;

    fn grid_landmarks() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![10.0, 0.0],
            vec![0.0, 10.0],
            vec![10.0, 10.0],
            vec![5.0, 5.0],
            vec![2.0, 7.0],
        ]
    }

    #[test]
    fn maps_each_landmark_exactly() {
        let p = grid_landmarks();
        let q = vec![
            vec![0.5, -1.0],
            vec![11.0, 0.5],
            vec![-0.5, 9.0],
            vec![10.0, 12.0],
            vec![6.5, 4.0],
            vec![2.0, 8.5],
        ];
        let tps = ThinPlateSpline::new(&p, &q).unwrap();
        assert_eq!(tps.num_landmarks(), 6);
        for (src, dst) in p.iter().zip(&q) {
            let mapped = tps.apply(src).unwrap();
            for (got, want) in mapped.iter().zip(dst) {
                assert!((got - want).abs() < 1e-9, "{src:?} -> {mapped:?}");
            }
        }
        // off the landmarks the warp is not affine
        let mid = tps.apply(&[7.0, 3.0]).unwrap();
        let linear = tps.affine_part().apply(&[7.0, 3.0]).unwrap();
        assert!((mid[0] - linear[0]).abs() + (mid[1] - linear[1]).abs() > 1e-6);
    }

    #[test]
    fn coinciding_landmarks_give_identity() {
        let p = grid_landmarks();
        let tps = ThinPlateSpline::new(&p, &p).unwrap();
        for x in [[0.0, 0.0], [3.25, -8.0], [100.0, 42.5]] {
            let mapped = tps.apply(&x).unwrap();
            assert!((mapped[0] - x[0]).abs() < 1e-12);
            assert!((mapped[1] - x[1]).abs() < 1e-12);
        }

        let cube: Vec<Vec<f64>> = (0..8)
            .map(|i| (0..3).map(|d| ((i >> d) & 1) as f64 * 4.0).collect())
            .chain(std::iter::once(vec![1.0, 2.0, 3.0]))
            .collect();
        let tps = ThinPlateSpline::new(&cube, &cube).unwrap();
        assert_eq!(tps.apply(&[0.5, 7.0, -2.0]).unwrap(), vec![0.5, 7.0, -2.0]);
    }

    #[test]
    fn affine_landmarks_give_affine_spline() {
        let shear = AffineTransform::from_matrix(2, vec![1.0, 0.5, 3.0, 0.0, 2.0, -1.0]).unwrap();
        let p = grid_landmarks();
        let q: Vec<Vec<f64>> = p.iter().map(|x| shear.apply(x).unwrap()).collect();
        let tps = ThinPlateSpline::new(&p, &q).unwrap();
        for x in [[1.0, 1.0], [7.5, 2.25], [-3.0, 12.0]] {
            let got = tps.apply(&x).unwrap();
            let want = shear.apply(&x).unwrap();
            assert!((got[0] - want[0]).abs() < 1e-9);
            assert!((got[1] - want[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_unusable_landmarks() {
        let collinear = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]];
        assert_eq!(
            ThinPlateSpline::new(&collinear, &collinear).err().unwrap(),
            NdViewError::InvalidInput("thin-plate landmarks are degenerate")
        );

        let duplicated = vec![vec![0.0, 0.0], vec![4.0, 0.0], vec![0.0, 4.0], vec![4.0, 0.0]];
        assert!(ThinPlateSpline::new(&duplicated, &duplicated).is_err());

        let two = vec![vec![0.0, 0.0], vec![1.0, 0.0]];
        assert!(ThinPlateSpline::new(&two, &two).is_err());

        let p = grid_landmarks();
        assert!(matches!(
            ThinPlateSpline::new(&p, &p[..5]).err().unwrap(),
            NdViewError::DimensionMismatch { expected: 6, got: 5 }
        ));
        let tps = ThinPlateSpline::new(&p, &p).unwrap();
        assert!(tps.apply(&[1.0]).is_err());
    }
}
