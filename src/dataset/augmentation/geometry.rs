use image::{ImageBuffer, Pixel, imageops};
use rand::Rng;

use crate::dataset::DatasetError;

/// Crop window shared by an image and its label map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropParams {
    pub top: u32,
    pub left: u32,
    pub height: u32,
    pub width: u32,
}

impl CropParams {
    /// Draws a `size x size` window that fits inside a `width x height` input.
    ///
    /// Offsets are uniform over every valid position, both bounds included. A window
    /// matching the input exactly is returned without consuming randomness.
    pub fn sample<R: Rng + ?Sized>(
        rng: &mut R,
        width: u32,
        height: u32,
        size: u32,
    ) -> Result<Self, DatasetError> {
        if width < size || height < size {
            return Err(DatasetError::CropTooLarge {
                size,
                width,
                height,
            });
        }

        if width == size && height == size {
            return Ok(Self {
                top: 0,
                left: 0,
                height,
                width,
            });
        }

        Ok(Self {
            top: rng.gen_range(0..=height - size),
            left: rng.gen_range(0..=width - size),
            height: size,
            width: size,
        })
    }

    pub fn apply<P: Pixel + 'static>(
        &self,
        source: &ImageBuffer<P, Vec<P::Subpixel>>,
    ) -> ImageBuffer<P, Vec<P::Subpixel>> {
        imageops::crop_imm(source, self.left, self.top, self.width, self.height).to_image()
    }
}

/// Flip decision for one pair: flips when `draw` exceeds `threshold`.
pub fn flip_decision(draw: f64, threshold: f64) -> bool {
    draw > threshold
}

pub fn flip_pair<P: Pixel + 'static, Q: Pixel + 'static>(
    image: ImageBuffer<P, Vec<P::Subpixel>>,
    mask: ImageBuffer<Q, Vec<Q::Subpixel>>,
    flip: bool,
) -> (
    ImageBuffer<P, Vec<P::Subpixel>>,
    ImageBuffer<Q, Vec<Q::Subpixel>>,
) {
    if flip {
        (
            imageops::flip_horizontal(&image),
            imageops::flip_horizontal(&mask),
        )
    } else {
        (image, mask)
    }
}
