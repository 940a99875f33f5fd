//! Square size normalization for images and their label maps.
//!
//! Both resizers sample the nearest source pixel. Images are low-pass filtered before
//! downscaling, label maps never are: blending two neighbouring labels would invent a
//! class that does not exist in the ground truth.

use image::{GrayImage, ImageBuffer, Pixel, RgbImage, imageops};

use super::DatasetError;

/// Resizes an RGB image to `size x size`.
///
/// When the image shrinks along an axis, a Gaussian blur with
/// `sigma = (factor - 1) / 2` (largest axis factor) is applied first.
pub fn resize_image(image: &RgbImage, size: u32) -> Result<RgbImage, DatasetError> {
    check_extent(image.width(), image.height(), size)?;

    let sigma = anti_aliasing_sigma(image.width(), image.height(), size);
    if sigma > 0.0 {
        let smoothed = imageops::blur(image, sigma);
        Ok(sample_nearest(&smoothed, size))
    } else {
        Ok(sample_nearest(image, size))
    }
}

/// Resizes a label map to `size x size` without any smoothing, so the output only
/// contains labels already present in `mask`.
pub fn resize_label_map(mask: &GrayImage, size: u32) -> Result<GrayImage, DatasetError> {
    check_extent(mask.width(), mask.height(), size)?;
    Ok(sample_nearest(mask, size))
}

fn check_extent(width: u32, height: u32, size: u32) -> Result<(), DatasetError> {
    if width == 0 || height == 0 || size == 0 {
        return Err(DatasetError::EmptyImage {
            width,
            height,
            size,
        });
    }
    Ok(())
}

fn anti_aliasing_sigma(width: u32, height: u32, size: u32) -> f32 {
    let factor = width.max(height) as f32 / size as f32;
    ((factor - 1.0) / 2.0).max(0.0)
}

fn sample_nearest<P: Pixel>(
    source: &ImageBuffer<P, Vec<P::Subpixel>>,
    size: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let (width, height) = source.dimensions();
    let columns: Vec<u32> = (0..size).map(|x| nearest_index(x, width, size)).collect();
    let rows: Vec<u32> = (0..size).map(|y| nearest_index(y, height, size)).collect();

    ImageBuffer::from_fn(size, size, |x, y| {
        *source.get_pixel(columns[x as usize], rows[y as usize])
    })
}

/// Maps an output index to the source index whose pixel center is closest.
fn nearest_index(index: u32, source: u32, target: u32) -> u32 {
    let scale = source as f64 / target as f64;
    let position = ((index as f64 + 0.5) * scale - 0.5).round();
    position.clamp(0.0, (source - 1) as f64) as u32
}
