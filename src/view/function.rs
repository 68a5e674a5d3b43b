//! Views computed directly from a function of the coordinate.

use super::{check_domain, RealView, View};
use crate::interval::Interval;
use crate::util::{NdViewError, NdViewResult};

/// Unbounded view whose value at `x` is `f(x)`.
pub struct FunctionView<F> {
    num_dims: usize,
    f: F,
}

impl<F> FunctionView<F> {
    pub fn new(num_dims: usize, f: F) -> Self {
        Self { num_dims, f }
    }
}

impl<T, F: Fn(&[i64]) -> T> View for FunctionView<F> {
    type Item = T;

    fn num_dims(&self) -> usize {
        self.num_dims
    }

    fn bounds(&self) -> Option<&Interval> {
        None
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<T> {
        check_domain(self.num_dims, None, pos)?;
        Ok((self.f)(pos))
    }
}

/// Real view whose value at `x` is `f(x)`.
pub struct FunctionRealView<F> {
    num_dims: usize,
    f: F,
}

impl<F> FunctionRealView<F> {
    pub fn new(num_dims: usize, f: F) -> Self {
        Self { num_dims, f }
    }
}

impl<T, F: Fn(&[f64]) -> T> RealView for FunctionRealView<F> {
    type Item = T;

    fn num_dims(&self) -> usize {
        self.num_dims
    }

    fn get_real(&self, pos: &[f64]) -> NdViewResult<T> {
        if pos.len() != self.num_dims {
            return Err(NdViewError::DimensionMismatch {
                expected: self.num_dims,
                got: pos.len(),
            });
        }
        Ok((self.f)(pos))
    }
}
