//! Loading and saving 2D buffers via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Axis 0 is the image
//! column (x) and axis 1 the row (y), so the flat order of a buffer is the
//! row-major pixel order of the file.

use crate::buffer::Buffer;
use crate::pixel::{Argb, Pixel};
use crate::util::{NdViewError, NdViewResult};
use image::{ColorType, DynamicImage, GrayImage, ImageBuffer, Luma, RgbaImage};
use std::path::Path;

/// Element types that can be read from a decoded image.
pub trait FromImage: Pixel {
    /// Converts a decoded image, failing with `TypeMismatch` when its colour
    /// type cannot be represented.
    fn from_dynamic(img: &DynamicImage) -> NdViewResult<Buffer<Self>>;
}

/// Element types that can be encoded as an image.
pub trait ToImage: Pixel {
    fn to_dynamic(buffer: &Buffer<Self>) -> NdViewResult<DynamicImage>;
}

fn mismatch(expected: &'static str, img: &DynamicImage) -> NdViewError {
    NdViewError::TypeMismatch {
        expected,
        found: format!("{:?}", img.color()),
    }
}

fn wrap<T: Pixel>(data: Vec<T>, width: u32, height: u32) -> NdViewResult<Buffer<T>> {
    Buffer::from_vec(data, &[width as usize, height as usize])
}

/// Width and height of a 2D buffer.
fn plane_size<T>(buffer: &Buffer<T>) -> NdViewResult<(u32, u32)> {
    match buffer.dims().as_slice() {
        &[w, h] => {
            let w = u32::try_from(w).map_err(|_| NdViewError::InvalidInput("image too wide"))?;
            let h = u32::try_from(h).map_err(|_| NdViewError::InvalidInput("image too tall"))?;
            Ok((w, h))
        }
        _ => Err(NdViewError::InvalidInput("only 2D buffers can be saved as images")),
    }
}

impl FromImage for u8 {
    fn from_dynamic(img: &DynamicImage) -> NdViewResult<Buffer<u8>> {
        match img {
            DynamicImage::ImageLuma8(gray) => wrap(gray.as_raw().clone(), gray.width(), gray.height()),
            _ => Err(mismatch("8-bit grey", img)),
        }
    }
}

impl FromImage for u16 {
    fn from_dynamic(img: &DynamicImage) -> NdViewResult<Buffer<u16>> {
        match img.color() {
            ColorType::L8 | ColorType::L16 => {
                let gray = img.to_luma16();
                // to_luma16 rescales 8-bit data to the full 16-bit range
                let data = if img.color() == ColorType::L8 {
                    gray.as_raw().iter().map(|&v| v / 257).collect()
                } else {
                    gray.as_raw().clone()
                };
                wrap(data, gray.width(), gray.height())
            }
            _ => Err(mismatch("8- or 16-bit grey", img)),
        }
    }
}

impl FromImage for f32 {
    fn from_dynamic(img: &DynamicImage) -> NdViewResult<Buffer<f32>> {
        match img {
            DynamicImage::ImageLuma8(gray) => wrap(
                gray.as_raw().iter().map(|&v| v as f32).collect(),
                gray.width(),
                gray.height(),
            ),
            DynamicImage::ImageLuma16(gray) => wrap(
                gray.as_raw().iter().map(|&v| v as f32).collect(),
                gray.width(),
                gray.height(),
            ),
            _ => Err(mismatch("grey", img)),
        }
    }
}

impl FromImage for Argb {
    fn from_dynamic(img: &DynamicImage) -> NdViewResult<Buffer<Argb>> {
        let rgba = img.to_rgba8();
        let data = rgba
            .pixels()
            .map(|p| Argb::rgba(p[0], p[1], p[2], p[3]))
            .collect();
        wrap(data, rgba.width(), rgba.height())
    }
}

impl ToImage for u8 {
    fn to_dynamic(buffer: &Buffer<u8>) -> NdViewResult<DynamicImage> {
        let (w, h) = plane_size(buffer)?;
        let gray = GrayImage::from_raw(w, h, buffer.to_flat_vec())
            .ok_or(NdViewError::InvalidInput("pixel count does not match image size"))?;
        Ok(DynamicImage::ImageLuma8(gray))
    }
}

impl ToImage for u16 {
    fn to_dynamic(buffer: &Buffer<u16>) -> NdViewResult<DynamicImage> {
        let (w, h) = plane_size(buffer)?;
        let gray: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_raw(w, h, buffer.to_flat_vec())
            .ok_or(NdViewError::InvalidInput("pixel count does not match image size"))?;
        Ok(DynamicImage::ImageLuma16(gray))
    }
}

/// `f32` values are rounded and clamped into `[0, 255]`.
impl ToImage for f32 {
    fn to_dynamic(buffer: &Buffer<f32>) -> NdViewResult<DynamicImage> {
        let (w, h) = plane_size(buffer)?;
        let data = buffer
            .to_flat_vec()
            .into_iter()
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        let gray = GrayImage::from_raw(w, h, data)
            .ok_or(NdViewError::InvalidInput("pixel count does not match image size"))?;
        Ok(DynamicImage::ImageLuma8(gray))
    }
}

impl ToImage for Argb {
    fn to_dynamic(buffer: &Buffer<Argb>) -> NdViewResult<DynamicImage> {
        let (w, h) = plane_size(buffer)?;
        let data = buffer
            .to_flat_vec()
            .into_iter()
            .flat_map(|c| [c.red(), c.green(), c.blue(), c.alpha()])
            .collect();
        let rgba = RgbaImage::from_raw(w, h, data)
            .ok_or(NdViewError::InvalidInput("pixel count does not match image size"))?;
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

/// Loads an image from disk as a zero-min 2D buffer of `T`.
pub fn load<T: FromImage, P: AsRef<Path>>(path: P) -> NdViewResult<Buffer<T>> {
    let img = image::open(path).map_err(|err| NdViewError::ImageIo {
        reason: err.to_string(),
    })?;
    T::from_dynamic(&img)
}

/// Saves a 2D buffer; the format follows the file extension.
pub fn save<T: ToImage, P: AsRef<Path>>(buffer: &Buffer<T>, path: P) -> NdViewResult<()> {
    let img = T::to_dynamic(buffer)?;
    img.save(path).map_err(|err| NdViewError::ImageIo {
        reason: err.to_string(),
    })
}
