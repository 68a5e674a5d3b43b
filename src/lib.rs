//! ndview: lazily evaluated n-dimensional views over images and volumes.
//!
//! A [`View`] maps integer coordinates to values without storing them.
//! Views are composed from buffers, functions, boundary extensions,
//! coordinate transforms and per-pixel converters, and nothing is computed
//! until a chain is read or materialized into a [`Buffer`]. On top of that
//! the crate provides interpolation, affine and thin-plate spline warps for
//! real coordinates, view-based filters, and FFT convolution and
//! deconvolution.
//!
//! Optional features: `rayon` (default; parallel materialization and FFT
//! lanes), `image-io` (loading and saving via the `image` crate) and
//! `tracing` (spans around the expensive passes).

pub mod buffer;
pub mod convert;
pub mod fft;
pub mod interpolate;
pub mod interval;
#[cfg(feature = "image-io")]
pub mod io;
pub mod materialize;
pub mod ops;
pub mod pixel;
mod trace;
pub mod util;
pub mod view;

pub use buffer::{Buffer, Layout};
pub use convert::{argb_channel, BiConverted, Converted};
pub use fft::{ComplexBuffer, FftConfig, FftConvolution, FftWorkers, RealSpectrum};
pub use interpolate::{
    Affine, AffineTransform, Interpolated, Interpolation, Rastered, RealTransform, RealViewExt,
    ThinPlateSpline, Transformed,
};
pub use interval::{Interval, RealInterval};
pub use materialize::{collect, copy_into, materialize};
#[cfg(feature = "rayon")]
pub use materialize::materialize_par;
pub use pixel::{Argb, Numeric, Pixel, RealPixel};
pub use util::{NdViewError, NdViewResult};
pub use view::{
    Boundary, DynView, FunctionRealView, FunctionView, RealView, View, ViewExt, WritableView,
};
