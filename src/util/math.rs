//! Index folding and numeric helpers shared by boundary policies and FFT.

// Folding runs in `i128` so that any `i64` position and box fold without
// overflow; the result always lies in `[min, max]` and fits back into `i64`.

/// Folds `pos` into `[min, max]` by reflecting about the outer pixel edges.
///
/// The edge sample is repeated: for `[0, 2]`, `-1 -> 0`, `-2 -> 1`, `3 -> 2`.
pub(crate) fn fold_mirror(pos: i64, min: i64, max: i64) -> i64 {
    let n = max as i128 - min as i128 + 1;
    let period = 2 * n;
    let r = (pos as i128 - min as i128).rem_euclid(period);
    let folded = if r < n { r } else { period - 1 - r };
    (min as i128 + folded) as i64
}

/// Folds `pos` into `[min, max]` by reflecting about the edge sample centres.
///
/// The edge sample is not repeated: for `[0, 2]`, `-1 -> 1`, `3 -> 1`.
pub(crate) fn fold_reflect(pos: i64, min: i64, max: i64) -> i64 {
    let n = max as i128 - min as i128 + 1;
    if n == 1 {
        return min;
    }
    let period = 2 * n - 2;
    let r = (pos as i128 - min as i128).rem_euclid(period);
    let folded = if r < n { r } else { period - r };
    (min as i128 + folded) as i64
}

/// Wraps `pos` into `[min, max]` periodically.
pub(crate) fn fold_periodic(pos: i64, min: i64, max: i64) -> i64 {
    let n = max as i128 - min as i128 + 1;
    (min as i128 + (pos as i128 - min as i128).rem_euclid(n)) as i64
}

/// Returns true when `n` only has prime factors 2, 3, 5 and 7.
pub(crate) fn is_fast_size(mut n: usize) -> bool {
    if n == 0 {
        return false;
    }
    for p in [2usize, 3, 5, 7] {
        while n % p == 0 {
            n /= p;
        }
    }
    n == 1
}

/// Smallest size `>= n` that FFTs quickly.
pub(crate) fn next_fast_size(n: usize) -> usize {
    let mut candidate = n.max(1);
    while !is_fast_size(candidate) {
        candidate += 1;
    }
    candidate
}

/// Compensated summation of `f64` values.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    pub(crate) fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    pub(crate) fn sum(&self) -> f64 {
        self.sum
    }
}

/// Solves `A X = B` in place by Gauss-Jordan elimination with partial
/// pivoting.
///
/// `a` is `n x n` and `b` is `n x cols`, both row-major; on success `b` holds
/// `X` and `a` is left reduced. Returns `false` when `A` is singular relative
/// to its largest entry.
pub(crate) fn solve_linear(a: &mut [f64], b: &mut [f64], n: usize, cols: usize) -> bool {
    let scale = a.iter().fold(1.0f64, |m, v| m.max(v.abs()));
    let tolerance = 1e-12 * scale;
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&x, &y| a[x * n + col].abs().total_cmp(&a[y * n + col].abs()))
            .unwrap_or(col);
        if !(a[pivot * n + col].abs() >= tolerance) {
            return false;
        }
        if pivot != col {
            for c in 0..n {
                a.swap(pivot * n + c, col * n + c);
            }
            for c in 0..cols {
                b.swap(pivot * cols + c, col * cols + c);
            }
        }
        let p = a[col * n + col];
        for c in 0..n {
            a[col * n + c] /= p;
        }
        for c in 0..cols {
            b[col * cols + c] /= p;
        }
        for r in 0..n {
            let factor = a[r * n + col];
            if r == col || factor == 0.0 {
                continue;
            }
            for c in 0..n {
                a[r * n + c] -= factor * a[col * n + c];
            }
            for c in 0..cols {
                b[r * cols + c] -= factor * b[col * cols + c];
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{fold_mirror, fold_periodic, fold_reflect, next_fast_size, solve_linear, KahanSum};

    #[test]
    fn mirror_repeats_the_edge_sample() {
        let folded: Vec<i64> = (-4..=6).map(|p| fold_mirror(p, 0, 2)).collect();
        assert_eq!(folded, vec![2, 2, 1, 0, 0, 1, 2, 2, 1, 0, 0]);
    }

    #[test]
    fn reflect_skips_the_edge_sample() {
        let folded: Vec<i64> = (-3..=5).map(|p| fold_reflect(p, 0, 2)).collect();
        assert_eq!(folded, vec![1, 2, 1, 0, 1, 2, 1, 0, 1]);
        assert_eq!(fold_reflect(-7, 4, 4), 4);
    }

    #[test]
    fn periodic_wraps_with_offset_min() {
        assert_eq!(fold_periodic(9, 10, 12), 12);
        assert_eq!(fold_periodic(-1, 10, 12), 11);
        assert_eq!(fold_periodic(13, 10, 12), 10);
        assert_eq!(fold_periodic(11, 10, 12), 11);
    }

    #[test]
    fn extreme_positions_fold_into_the_box() {
        // [5, 7]: mirror period 6, reflect period 4, periodic period 3
        let (min, max) = (5, 7);
        assert_eq!(fold_mirror(i64::MIN, min, max), 5);
        assert_eq!(fold_mirror(i64::MAX, min, max), 7);
        assert_eq!(fold_reflect(i64::MIN, min, max), 6);
        assert_eq!(fold_reflect(i64::MAX, min, max), 7);
        assert_eq!(fold_periodic(i64::MIN, min, max), 7);
        assert_eq!(fold_periodic(i64::MAX, min, max), 7);
        assert_eq!(fold_mirror(0, i64::MIN, i64::MAX), 0);
        assert_eq!(fold_periodic(i64::MAX, -3, i64::MAX), i64::MAX);
    }

    #[test]
    fn linear_solve_with_pivoting() {
        // first pivot is zero, so rows must be swapped
        let mut a = vec![0.0, 2.0, 1.0, 3.0, 1.0, 0.0, 1.0, 1.0, 1.0];
        let mut b = vec![4.0, 5.0, 10.0, 4.0, 6.0, 5.0];
        assert!(solve_linear(&mut a, &mut b, 3, 2));
        let expected = [3.0, 1.0, 2.0, 1.0, 1.0, 3.0];
        for (got, want) in b.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }

        let mut singular = vec![1.0, 2.0, 2.0, 4.0];
        let mut rhs = vec![1.0, 2.0];
        assert!(!solve_linear(&mut singular, &mut rhs, 2, 1));
    }

    #[test]
    fn fast_sizes_skip_large_primes() {
        assert_eq!(next_fast_size(11), 12);
        assert_eq!(next_fast_size(34), 35);
        assert_eq!(next_fast_size(64), 64);
        assert_eq!(next_fast_size(0), 1);
    }

    #[test]
    fn kahan_sum_keeps_small_terms() {
        let mut sum = KahanSum::default();
        sum.add(1e16);
        for _ in 0..10 {
            sum.add(1.0);
        }
        sum.add(-1e16);
        assert_eq!(sum.sum(), 10.0);
    }
}
