use std::path::Path;

use image::{GrayImage, ImageBuffer, ImageFormat, Luma};
use ndarray::{Array2, ArrayView2};

use crate::error::{CoregError, Result};
use crate::frame::Layer;

/// Load an image as a single-channel continuous layer scaled to `[0, 1]`.
pub fn load_image(path: &Path) -> Result<Layer> {
    let gray = image::open(path)?.to_luma16();
    let (w, h) = gray.dimensions();
    let data = Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        gray.get_pixel(col as u32, row as u32).0[0] as f32 / 65535.0
    });
    Ok(Layer::from_array2(data))
}

/// Load an 8-bit label image as a categorical layer holding the raw
/// integer labels.
pub fn load_labels(path: &Path) -> Result<Layer> {
    let gray = image::open(path)?.to_luma8();
    let (w, h) = gray.dimensions();
    let data = Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        gray.get_pixel(col as u32, row as u32).0[0] as f32
    });
    Ok(Layer::from_array2(data))
}

fn buffer_error(h: usize, w: usize) -> CoregError {
    CoregError::InvalidDimensions {
        width: w,
        height: h,
    }
}

/// Save a `[0, 1]` raster as 16-bit grayscale TIFF.
pub fn save_tiff(data: &ArrayView2<'_, f32>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let pixels: Vec<u16> = data
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 65535.0).round() as u16)
        .collect();

    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or_else(|| buffer_error(h, w))?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a `[0, 1]` raster as 8-bit grayscale PNG.
pub fn save_png(data: &ArrayView2<'_, f32>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let pixels: Vec<u8> = data
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();

    let img = GrayImage::from_raw(w as u32, h as u32, pixels).ok_or_else(|| buffer_error(h, w))?;
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a raster, choosing the format from the file extension (TIFF by
/// default).
pub fn save_image(data: &ArrayView2<'_, f32>, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(data, path),
        _ => save_tiff(data, path),
    }
}

/// Save integer labels in `0..=255` as an 8-bit PNG.
pub fn save_labels(data: &ArrayView2<'_, f32>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let pixels: Vec<u8> = data
        .iter()
        .map(|&v| v.round().clamp(0.0, 255.0) as u8)
        .collect();

    let img = GrayImage::from_raw(w as u32, h as u32, pixels).ok_or_else(|| buffer_error(h, w))?;
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
