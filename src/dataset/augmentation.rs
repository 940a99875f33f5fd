mod color;
mod geometry;

pub use color::{
    JitterFactors, adjust_brightness, adjust_contrast, adjust_hue, adjust_saturation,
    color_jitter,
};
pub use geometry::{CropParams, flip_decision, flip_pair};

use burn::prelude::*;
use image::{GrayImage, RgbImage};
use rand::Rng;

use super::DatasetError;

#[derive(Config, Debug)]
pub struct AugmentationConfig {
    /// Edge length of the square random crop.
    #[config(default = 512)]
    pub crop_size: u32,

    /// A pair is flipped when a uniform draw in `[0, 1)` exceeds this value.
    #[config(default = 0.5)]
    pub flip_threshold: f64,

    #[config(default = 0.1)]
    pub brightness: f32,

    #[config(default = 0.1)]
    pub contrast: f32,

    #[config(default = 0.1)]
    pub saturation: f32,

    #[config(default = 0.05)]
    pub hue: f32,
}

impl AugmentationConfig {
    pub fn init(&self) -> AugmentationPipeline {
        self.assertions();
        AugmentationPipeline {
            crop_size: self.crop_size,
            flip_threshold: self.flip_threshold,
            brightness: self.brightness,
            contrast: self.contrast,
            saturation: self.saturation,
            hue: self.hue,
        }
    }

    fn assertions(&self) {
        assert!(
            self.crop_size > 0,
            "Crop size must be positive. Got {}",
            self.crop_size
        );

        assert!(
            (0.0..=1.0).contains(&self.flip_threshold),
            "Flip threshold must lie in [0, 1]. Got {}",
            self.flip_threshold
        );

        for (name, rate) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
        ] {
            assert!(
                rate >= 0.0 && rate.is_finite(),
                "Jitter rate `{name}` must be non-negative. Got {rate}"
            );
        }

        assert!(
            (0.0..=0.5).contains(&self.hue),
            "Hue rate must lie in [0, 0.5]. Got {}",
            self.hue
        );
    }
}

/// Color jitter, then one synchronized crop and flip for an image and its label map.
///
/// The pipeline holds no state between calls: for the same input and the same `rng`
/// state it always produces the same output.
#[derive(Clone, Debug)]
pub struct AugmentationPipeline {
    crop_size: u32,
    flip_threshold: f64,
    brightness: f32,
    contrast: f32,
    saturation: f32,
    hue: f32,
}

impl AugmentationPipeline {
    pub fn augment<R: Rng + ?Sized>(
        &self,
        mut image: RgbImage,
        mask: GrayImage,
        rng: &mut R,
    ) -> Result<(RgbImage, GrayImage), DatasetError> {
        ensure_aligned("decoding", &image, &mask)?;

        let factors = color_jitter(
            &mut image,
            rng,
            self.brightness,
            self.contrast,
            self.saturation,
            self.hue,
        );

        let params = CropParams::sample(rng, image.width(), image.height(), self.crop_size)?;
        let image = params.apply(&image);
        let mask = params.apply(&mask);
        ensure_aligned("crop", &image, &mask)?;

        let flip = flip_decision(rng.gen_range(0.0..1.0), self.flip_threshold);
        let (image, mask) = flip_pair(image, mask, flip);
        ensure_aligned("flip", &image, &mask)?;

        log::debug!("Augmented pair with {factors:?}, {params:?}, flip: {flip}");

        Ok((image, mask))
    }

    pub fn crop_size(&self) -> u32 {
        self.crop_size
    }
}

fn ensure_aligned(
    step: &'static str,
    image: &RgbImage,
    mask: &GrayImage,
) -> Result<(), DatasetError> {
    if image.dimensions() != mask.dimensions() {
        return Err(DatasetError::Misaligned {
            step,
            image_width: image.width(),
            image_height: image.height(),
            mask_width: mask.width(),
            mask_height: mask.height(),
        });
    }
    Ok(())
}
