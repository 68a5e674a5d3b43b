//! Owned storage backing materialized views.
//!
//! A buffer is split into chunks that share one nominal shape:
//!
//! * `Array`: a single chunk covering the whole box,
//! * `Planar`: one chunk per 2D plane (`dims[0] x dims[1]`),
//! * `Cell`: cubic blocks of edge `block`, clipped at the border.
//!
//! Inside a chunk elements are stored in flat order (dimension 0 fastest) and
//! chunks follow each other in flat order of the chunk grid. This storage
//! order is the iteration order of [`Buffer::positions`] and of the
//! materializer, so a cell buffer is visited block by block.
//!
//! Every layout addresses each chunk with 31-bit indices, so a single chunk
//! holds at most `i32::MAX` elements. [`Layout::check`] reports an
//! `Allocation` error before any memory is requested.

use crate::interval::Interval;
use crate::pixel::Pixel;
use crate::util::{NdViewError, NdViewResult};
use crate::view::{check_domain, View, WritableView};

/// Largest number of elements a single chunk can hold.
pub const MAX_CHUNK_ELEMENTS: u64 = i32::MAX as u64;

/// Memory layout of a [`Buffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// One contiguous chunk.
    Array,
    /// One chunk per 2D plane.
    Planar,
    /// Cubic blocks of edge `block`.
    Cell { block: usize },
}

impl Layout {
    pub fn name(&self) -> &'static str {
        match self {
            Layout::Array => "array",
            Layout::Planar => "planar",
            Layout::Cell { .. } => "cell",
        }
    }

    /// Checks that a box of size `dims` fits this layout without allocating.
    pub fn check(&self, dims: &[usize]) -> NdViewResult<()> {
        if dims.is_empty() || dims.contains(&0) {
            return Err(NdViewError::InvalidDimensions {
                dims: dims.iter().map(|&d| d as i64).collect(),
            });
        }
        if let Layout::Cell { block: 0 } = self {
            return Err(NdViewError::InvalidInput("cell block size must be positive"));
        }
        let total = product_u64(dims).ok_or(NdViewError::Allocation {
            elements: u64::MAX,
            limit: usize::MAX as u64,
            layout: self.name(),
        })?;
        if total > usize::MAX as u64 {
            return Err(NdViewError::Allocation {
                elements: total,
                limit: usize::MAX as u64,
                layout: self.name(),
            });
        }
        let chunk = product_u64(&self.chunk_dims(dims)).unwrap_or(u64::MAX);
        if chunk > MAX_CHUNK_ELEMENTS {
            // Report the requested total for contiguous storage, the chunk
            // size otherwise.
            let elements = if *self == Layout::Array { total } else { chunk };
            return Err(NdViewError::Allocation {
                elements,
                limit: MAX_CHUNK_ELEMENTS,
                layout: self.name(),
            });
        }
        Ok(())
    }

    fn chunk_dims(&self, dims: &[usize]) -> Vec<usize> {
        match *self {
            Layout::Array => dims.to_vec(),
            Layout::Planar => dims
                .iter()
                .enumerate()
                .map(|(d, &size)| if d < 2 { size } else { 1 })
                .collect(),
            Layout::Cell { block } => dims.iter().map(|&size| size.min(block)).collect(),
        }
    }
}

fn product_u64(dims: &[usize]) -> Option<u64> {
    dims.iter().try_fold(1u64, |acc, &d| acc.checked_mul(d as u64))
}

/// Flat index of `idx` inside a box of size `dims` (dimension 0 fastest).
fn flat_index(idx: &[usize], dims: &[usize]) -> usize {
    let mut offset = 0;
    for d in (0..dims.len()).rev() {
        offset = offset * dims[d] + idx[d];
    }
    offset
}

/// Owned n-dimensional storage.
#[derive(Clone, Debug)]
pub struct Buffer<T> {
    interval: Interval,
    layout: Layout,
    chunk_dims: Vec<usize>,
    grid_dims: Vec<usize>,
    chunks: Vec<Vec<T>>,
}

impl<T: Pixel> Buffer<T> {
    /// Allocates a default-filled buffer covering `interval`.
    pub fn new(layout: Layout, interval: Interval) -> NdViewResult<Self> {
        Self::filled(layout, interval, T::default())
    }

    /// Allocates a buffer covering `interval` with every element set to
    /// `value`.
    pub fn filled(layout: Layout, interval: Interval, value: T) -> NdViewResult<Self> {
        let dims = interval.dims();
        layout.check(&dims)?;
        let chunk_dims = layout.chunk_dims(&dims);
        let grid_dims: Vec<usize> = dims
            .iter()
            .zip(&chunk_dims)
            .map(|(&size, &chunk)| size.div_ceil(chunk))
            .collect();
        let num_chunks: usize = grid_dims.iter().product();
        let mut buffer = Self {
            interval,
            layout,
            chunk_dims,
            grid_dims,
            chunks: Vec::with_capacity(num_chunks),
        };
        for chunk in 0..num_chunks {
            let len: usize = buffer.actual_chunk_dims(chunk).iter().product();
            buffer.chunks.push(vec![value; len]);
        }
        Ok(buffer)
    }

    /// Wraps a flat vector (dimension 0 fastest) as a zero-min array buffer.
    pub fn from_vec(data: Vec<T>, dims: &[usize]) -> NdViewResult<Self> {
        let interval = Interval::from_dims(dims)?;
        Layout::Array.check(dims)?;
        let needed: usize = dims.iter().product();
        if data.len() != needed {
            return Err(NdViewError::InvalidInput("data length does not match dimensions"));
        }
        Ok(Self {
            interval,
            layout: Layout::Array,
            chunk_dims: dims.to_vec(),
            grid_dims: vec![1; dims.len()],
            chunks: vec![data],
        })
    }

    /// Copies the elements into a flat vector (dimension 0 fastest).
    pub fn to_flat_vec(&self) -> Vec<T> {
        if let Some(slice) = self.as_slice() {
            return slice.to_vec();
        }
        self.interval
            .positions()
            .map(|pos| *self.element(&pos))
            .collect()
    }
}

impl<T> Buffer<T> {
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn dims(&self) -> Vec<usize> {
        self.interval.dims()
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns the number of storage chunks.
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves the buffer so that its box starts at `min`.
    pub fn with_min(mut self, min: &[i64]) -> NdViewResult<Self> {
        self.interval.check_len(min.len())?;
        let offset: Vec<i64> = min
            .iter()
            .zip(self.interval.min_slice())
            .map(|(new, old)| new.checked_sub(*old))
            .collect::<Option<_>>()
            .ok_or(NdViewError::InvalidInput("translated box leaves the i64 range"))?;
        self.interval = self.interval.translate(&offset)?;
        Ok(self)
    }

    /// Returns the single contiguous chunk of an array buffer.
    pub fn as_slice(&self) -> Option<&[T]> {
        match self.chunks.as_slice() {
            [only] => Some(only.as_slice()),
            _ => None,
        }
    }

    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        match self.chunks.as_mut_slice() {
            [only] => Some(only.as_mut_slice()),
            _ => None,
        }
    }

    /// Returns a reference to the element at `pos`.
    pub fn get_ref(&self, pos: &[i64]) -> NdViewResult<&T> {
        check_domain(self.interval.num_dims(), Some(&self.interval), pos)?;
        Ok(self.element(pos))
    }

    /// Returns a mutable reference to the element at `pos`.
    pub fn get_mut(&mut self, pos: &[i64]) -> NdViewResult<&mut T> {
        check_domain(self.interval.num_dims(), Some(&self.interval), pos)?;
        let (chunk, offset) = self.locate(pos);
        Ok(&mut self.chunks[chunk][offset])
    }

    /// Elements in storage order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.chunks.iter().flatten()
    }

    /// Mutable elements in storage order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.chunks.iter_mut().flatten()
    }

    /// Positions in storage order.
    pub fn positions(&self) -> impl Iterator<Item = Vec<i64>> + '_ {
        (0..self.chunks.len()).flat_map(move |chunk| self.chunk_interval(chunk).into_positions())
    }

    /// Positions paired with their elements, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Vec<i64>, &T)> + '_ {
        self.positions().zip(self.values())
    }

    /// Positions paired with their elements in flat order, independent of
    /// the layout.
    pub fn flat_iter(&self) -> impl Iterator<Item = (Vec<i64>, &T)> + '_ {
        self.interval.positions().map(move |pos| {
            let value = self.element(&pos);
            (pos, value)
        })
    }

    /// Chunk storage, for parallel materialization.
    pub(crate) fn chunks_mut(&mut self) -> &mut [Vec<T>] {
        &mut self.chunks
    }

    /// The box covered by chunk `chunk`.
    pub(crate) fn chunk_interval(&self, chunk: usize) -> Interval {
        let grid_idx = self.grid_index(chunk);
        let actual = self.actual_chunk_dims(chunk);
        let min: Vec<i64> = grid_idx
            .iter()
            .enumerate()
            .map(|(d, &g)| self.interval.min(d) + (g * self.chunk_dims[d]) as i64)
            .collect();
        let max: Vec<i64> = min
            .iter()
            .zip(&actual)
            .map(|(&lo, &size)| lo + size as i64 - 1)
            .collect();
        Interval::new(min, max).expect("chunk boxes are never empty")
    }

    fn grid_index(&self, mut chunk: usize) -> Vec<usize> {
        self.grid_dims
            .iter()
            .map(|&g| {
                let idx = chunk % g;
                chunk /= g;
                idx
            })
            .collect()
    }

    fn actual_chunk_dims(&self, chunk: usize) -> Vec<usize> {
        let dims = self.interval.dims();
        self.grid_index(chunk)
            .iter()
            .enumerate()
            .map(|(d, &g)| self.chunk_dims[d].min(dims[d] - g * self.chunk_dims[d]))
            .collect()
    }

    /// Maps an in-bounds position to `(chunk, offset)`.
    fn locate(&self, pos: &[i64]) -> (usize, usize) {
        let n = pos.len();
        let mut grid_idx = smallvec::SmallVec::<[usize; 6]>::with_capacity(n);
        let mut local = smallvec::SmallVec::<[usize; 6]>::with_capacity(n);
        let mut local_dims = smallvec::SmallVec::<[usize; 6]>::with_capacity(n);
        for (d, &p) in pos.iter().enumerate() {
            let rel = (p - self.interval.min(d)) as usize;
            let cell = self.chunk_dims[d];
            let g = rel / cell;
            grid_idx.push(g);
            local.push(rel % cell);
            local_dims.push(cell.min(self.interval.dim(d) - g * cell));
        }
        (
            flat_index(&grid_idx, &self.grid_dims),
            flat_index(&local, &local_dims),
        )
    }

    fn element(&self, pos: &[i64]) -> &T {
        let (chunk, offset) = self.locate(pos);
        &self.chunks[chunk][offset]
    }
}

impl<T: Clone> View for Buffer<T> {
    type Item = T;

    fn num_dims(&self) -> usize {
        self.interval.num_dims()
    }

    fn bounds(&self) -> Option<&Interval> {
        Some(&self.interval)
    }

    fn get(&self, pos: &[i64]) -> NdViewResult<T> {
        self.get_ref(pos).cloned()
    }
}

impl<T: Clone> WritableView for Buffer<T> {
    fn set(&mut self, pos: &[i64], value: T) -> NdViewResult<()> {
        *self.get_mut(pos)? = value;
        Ok(())
    }
}
