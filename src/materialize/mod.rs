//! Forcing lazy views into owned buffers.
//!
//! Materialization is the only place where a chain of views is evaluated.
//! Every position of the target box is visited exactly once, in the storage
//! order of the buffer layout. The first failing `get` aborts the copy and its
//! error is returned.

use crate::buffer::{Buffer, Layout};
use crate::interval::Interval;
use crate::pixel::Pixel;
use crate::trace::{trace_event, trace_span};
use crate::util::{NdViewError, NdViewResult};
use crate::view::{require_bounds, View};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

fn check_dims<V: View + ?Sized>(view: &V, interval: &Interval) -> NdViewResult<()> {
    if view.num_dims() != interval.num_dims() {
        return Err(NdViewError::DimensionMismatch {
            expected: view.num_dims(),
            got: interval.num_dims(),
        });
    }
    Ok(())
}

/// Copies `view` over `interval` into a new buffer with `layout`.
///
/// The buffer keeps the coordinates of `interval`, so a box starting at
/// `[-3, 5]` yields a buffer whose `min` is `[-3, 5]`.
pub fn materialize<V>(view: &V, interval: &Interval, layout: Layout) -> NdViewResult<Buffer<V::Item>>
where
    V: View + ?Sized,
    V::Item: Pixel,
{
    let _span = trace_span!("materialize", layout = layout.name()).entered();
    check_dims(view, interval)?;
    let mut buffer = Buffer::new(layout, interval.clone())?;
    copy_into(view, &mut buffer)?;
    trace_event!("materialized", elements = buffer.len());
    Ok(buffer)
}

/// Copies a bounded view over its own bounds.
pub fn collect<V>(view: &V, layout: Layout) -> NdViewResult<Buffer<V::Item>>
where
    V: View + ?Sized,
    V::Item: Pixel,
{
    let bounds = require_bounds(view, "cannot collect an unbounded view")?;
    materialize(view, &bounds, layout)
}

/// Overwrites every element of `buffer` with the value of `view` at the same
/// position.
pub fn copy_into<V>(view: &V, buffer: &mut Buffer<V::Item>) -> NdViewResult<()>
where
    V: View + ?Sized,
    V::Item: Pixel,
{
    check_dims(view, buffer.interval())?;
    let boxes: Vec<Interval> = (0..buffer.num_chunks())
        .map(|chunk| buffer.chunk_interval(chunk))
        .collect();
    for (values, chunk_box) in buffer.chunks_mut().iter_mut().zip(&boxes) {
        for (value, pos) in values.iter_mut().zip(chunk_box.positions()) {
            *value = view.get(&pos)?;
        }
    }
    Ok(())
}

/// Position of the first element of row `row` inside `chunk_box`.
///
/// A row is a run of `dim(0)` elements along dimension 0.
#[cfg(feature = "rayon")]
fn row_start(chunk_box: &Interval, mut row: usize) -> Vec<i64> {
    let mut pos = chunk_box.min_slice().to_vec();
    for (d, p) in pos.iter_mut().enumerate().skip(1) {
        let size = chunk_box.dim(d);
        *p += (row % size) as i64;
        row /= size;
    }
    pos
}

/// Parallel version of [`materialize`].
///
/// Rows of every chunk are evaluated on the rayon pool. The result is
/// identical to the sequential copy; when several rows fail, which error is
/// reported is unspecified.
#[cfg(feature = "rayon")]
pub fn materialize_par<V>(
    view: &V,
    interval: &Interval,
    layout: Layout,
) -> NdViewResult<Buffer<V::Item>>
where
    V: View + Sync + ?Sized,
    V::Item: Pixel,
{
    let _span = trace_span!("materialize_par", layout = layout.name()).entered();
    check_dims(view, interval)?;
    let mut buffer = Buffer::new(layout, interval.clone())?;
    let boxes: Vec<Interval> = (0..buffer.num_chunks())
        .map(|chunk| buffer.chunk_interval(chunk))
        .collect();
    buffer
        .chunks_mut()
        .par_iter_mut()
        .zip(boxes.par_iter())
        .try_for_each(|(values, chunk_box)| {
            values
                .par_chunks_mut(chunk_box.dim(0))
                .enumerate()
                .try_for_each(|(row, row_values)| {
                    let mut pos = row_start(chunk_box, row);
                    for value in row_values.iter_mut() {
                        *value = view.get(&pos)?;
                        pos[0] += 1;
                    }
                    Ok::<(), NdViewError>(())
                })
        })?;
    trace_event!("materialized", elements = buffer.len());
    Ok(buffer)
}
