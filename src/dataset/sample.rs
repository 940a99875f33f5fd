use burn::prelude::*;
use image::{GrayImage, RgbImage};

/// Per-channel normalization applied after scaling pixels to `[0, 1]`.
///
/// `mean` and `std` hold either one value for every channel or one value per channel.
/// The defaults leave the image unchanged.
#[derive(Config, Debug)]
pub struct NormalizeConfig {
    #[config(default = "vec![0.0]")]
    pub mean: Vec<f32>,

    #[config(default = "vec![1.0]")]
    pub std: Vec<f32>,
}

impl NormalizeConfig {
    pub fn init(&self) -> Normalizer {
        self.assertions();
        Normalizer {
            mean: broadcast(&self.mean),
            std: broadcast(&self.std),
        }
    }

    fn assertions(&self) {
        for (name, values) in [("mean", &self.mean), ("std", &self.std)] {
            assert!(
                values.len() == 1 || values.len() == CHANNELS,
                "Normalization `{name}` needs 1 or {CHANNELS} values. Got {}",
                values.len()
            );
        }

        assert!(
            self.std.iter().all(|s| *s != 0.0),
            "Normalization std must be non-zero. Got {:?}",
            self.std
        );
    }
}

const CHANNELS: usize = 3;

fn broadcast(values: &[f32]) -> [f32; CHANNELS] {
    match values {
        [value] => [*value; CHANNELS],
        _ => std::array::from_fn(|c| values[c]),
    }
}

#[derive(Clone, Debug)]
pub struct Normalizer {
    mean: [f32; CHANNELS],
    std: [f32; CHANNELS],
}

impl Default for Normalizer {
    fn default() -> Self {
        NormalizeConfig::new().init()
    }
}

/// One training sample: a normalized `[C, H, W]` image tensor and its raw label map.
#[derive(Clone, Debug)]
pub struct SegmentationSample {
    pub image: TensorData,
    pub mask: GrayImage,
}

impl SegmentationSample {
    pub fn height(&self) -> usize {
        self.mask.height() as usize
    }

    pub fn width(&self) -> usize {
        self.mask.width() as usize
    }
}

/// Converts an augmented pair into a sample.
pub fn assemble(image: &RgbImage, mask: GrayImage, normalizer: &Normalizer) -> SegmentationSample {
    let (width, height) = image.dimensions();
    let plane = width as usize * height as usize;
    let mut data = vec![0.0f32; CHANNELS * plane];

    for (index, pixel) in image.pixels().enumerate() {
        for c in 0..CHANNELS {
            let value = pixel.0[c] as f32 / 255.0;
            data[c * plane + index] = (value - normalizer.mean[c]) / normalizer.std[c];
        }
    }

    SegmentationSample {
        image: TensorData::new(data, [CHANNELS, height as usize, width as usize]),
        mask,
    }
}

#[cfg(test)]
mod tests {
    use image::{Luma, Rgb};

    use super::*;

    fn pair() -> (RgbImage, GrayImage) {
        let image = RgbImage::from_fn(3, 2, |x, y| Rgb([51 * x as u8, 255, 102 * y as u8]));
        let mask = GrayImage::from_fn(3, 2, |x, _| Luma([x as u8 + 4]));
        (image, mask)
    }

    #[test]
    fn default_normalization_only_rescales() {
        let (image, mask) = pair();
        let sample = assemble(&image, mask.clone(), &Normalizer::default());

        assert_eq!(sample.image.shape, vec![3, 2, 3]);
        let values = sample.image.to_vec::<f32>().unwrap();
        // Channel 0, row 0.
        assert_eq!(&values[0..3], &[0.0, 0.2, 0.4]);
        // Channel 1 is saturated everywhere.
        assert!(values[6..12].iter().all(|v| *v == 1.0));
        // Channel 2, row 1.
        assert_eq!(&values[15..18], &[0.4, 0.4, 0.4]);
        assert_eq!(sample.mask, mask);
    }

    #[test]
    fn per_channel_statistics_are_applied() {
        let (image, mask) = pair();
        let normalizer = NormalizeConfig::new()
            .with_mean(vec![0.0, 0.5, 0.0])
            .with_std(vec![1.0, 0.5, 2.0])
            .init();

        let values = assemble(&image, mask, &normalizer)
            .image
            .to_vec::<f32>()
            .unwrap();

        assert!(values[6..12].iter().all(|v| *v == 1.0));
        assert_eq!(values[15], 0.2);
    }

    #[test]
    #[should_panic(expected = "needs 1 or 3 values")]
    fn rejects_mismatched_statistics() {
        NormalizeConfig::new().with_mean(vec![0.0, 0.0]).init();
    }
}
