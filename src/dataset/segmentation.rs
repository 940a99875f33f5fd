use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use burn::data::dataset::Dataset;
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use image::{ColorType, DynamicImage, GrayImage, RgbImage};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::{
    AugmentationConfig, AugmentationPipeline, DatasetError, DatasetIndex, ImageMaskPair,
    NormalizeConfig, Normalizer, SegmentationSample, Subset, assemble, resize_image,
    resize_label_map,
};

/// Decodes an image as RGB and its label map as one 8-bit channel.
pub fn load_pair(pair: &ImageMaskPair) -> Result<(RgbImage, GrayImage), DatasetError> {
    let image = open(&pair.image_path)?.into_rgb8();
    let mask = label_channel(open(&pair.mask_path)?)?;
    Ok((image, mask))
}

fn open(path: &Path) -> Result<DynamicImage, DatasetError> {
    image::open(path).map_err(|source| DatasetError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Label maps stored as color images carry the label in their first channel.
fn label_channel(mask: DynamicImage) -> Result<GrayImage, DatasetError> {
    let (width, height, color) = (mask.width(), mask.height(), mask.color());
    let labels: Vec<u8> = match color {
        ColorType::L8 => return Ok(mask.into_luma8()),
        ColorType::L16 => mask.into_luma16().iter().map(|&x| x as u8).collect(),
        ColorType::La8 => mask.into_luma_alpha8().iter().step_by(2).copied().collect(),
        ColorType::Rgb8 => mask.into_rgb8().iter().step_by(3).copied().collect(),
        ColorType::Rgba8 => mask.into_rgba8().iter().step_by(4).copied().collect(),
        ColorType::Rgb16 => mask
            .into_rgb16()
            .iter()
            .step_by(3)
            .map(|&x| x as u8)
            .collect(),
        other => return Err(DatasetError::UnsupportedMask(other)),
    };

    GrayImage::from_raw(width, height, labels).ok_or(DatasetError::UnsupportedMask(color))
}

/// Random-access segmentation dataset over an index of image/mask pairs.
///
/// Every fetch resizes both files to `image_resize`, optionally augments them and
/// assembles a [`SegmentationSample`]. Each fetch seeds its own random source from the
/// dataset seed, the index and the epoch of that index, so parallel workers never share
/// random state. The epoch of an index is the number of times it was fetched through
/// [`Dataset::get`] before, which gives every pass of a dataloader fresh draws while
/// keeping the sequence reproducible whatever the worker scheduling.
///
/// Clones share the epoch counters.
#[derive(Clone, Debug)]
pub struct SegmentationDataset {
    index: DatasetIndex,
    image_resize: u32,
    augmentation: Option<AugmentationPipeline>,
    normalizer: Normalizer,
    seed: u64,
    epochs: Arc<[AtomicU64]>,
}

impl SegmentationDataset {
    pub fn new(index: DatasetIndex, image_resize: u32) -> Self {
        let epochs = (0..index.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            index,
            image_resize,
            augmentation: None,
            normalizer: Normalizer::default(),
            seed: 0,
            epochs,
        }
    }

    /// Opens the subset named `subset` under `root`.
    ///
    /// The tag is validated before the manifest is read.
    pub fn open<P: AsRef<Path>>(
        root: P,
        subset: &str,
        image_resize: u32,
        augmentation: Option<&AugmentationConfig>,
    ) -> Result<Self, DatasetError> {
        let subset: Subset = subset.parse()?;
        let index = DatasetIndex::load(root, subset)?;
        let dataset = Self::new(index, image_resize);

        Ok(match augmentation {
            Some(config) => dataset.with_augmentation(config),
            None => dataset,
        })
    }

    pub fn with_augmentation(mut self, config: &AugmentationConfig) -> Self {
        let pipeline = config.init();
        if pipeline.crop_size() > self.image_resize {
            log::warn!(
                "Crop size {} exceeds resize target {}, every fetch will panic",
                pipeline.crop_size(),
                self.image_resize
            );
        }
        self.augmentation = Some(pipeline);
        self
    }

    pub fn with_normalize(mut self, config: &NormalizeConfig) -> Self {
        self.normalizer = config.init();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn index(&self) -> &DatasetIndex {
        &self.index
    }

    /// Fetches `index` as drawn in `epoch`. Does not advance the epoch counters.
    pub fn try_get_at(
        &self,
        index: usize,
        epoch: u64,
    ) -> Result<SegmentationSample, DatasetError> {
        let mut rng = StdRng::seed_from_u64(fetch_seed(self.seed, index, epoch));
        self.try_get_with_rng(index, &mut rng)
    }

    /// Fetches `index` in its next epoch.
    pub fn try_get(&self, index: usize) -> Result<SegmentationSample, DatasetError> {
        let epoch = self
            .epochs
            .get(index)
            .map(|counter| counter.fetch_add(1, Ordering::Relaxed))
            .unwrap_or_default();
        self.try_get_at(index, epoch)
    }

    pub fn try_get_with_rng<R: rand::Rng + ?Sized>(
        &self,
        index: usize,
        rng: &mut R,
    ) -> Result<SegmentationSample, DatasetError> {
        let pair = self.index.get(index).ok_or(DatasetError::OutOfRange {
            index,
            len: self.index.len(),
        })?;

        let (image, mask) = load_pair(pair)?;
        self.transform(image, mask, rng)
    }

    /// Resize, augment and assemble one decoded pair.
    pub fn transform<R: rand::Rng + ?Sized>(
        &self,
        image: RgbImage,
        mask: GrayImage,
        rng: &mut R,
    ) -> Result<SegmentationSample, DatasetError> {
        let image = resize_image(&image, self.image_resize)?;
        let mask = resize_label_map(&mask, self.image_resize)?;

        let (image, mask) = match &self.augmentation {
            Some(pipeline) => pipeline.augment(image, mask, rng)?,
            None => (image, mask),
        };

        Ok(assemble(&image, mask, &self.normalizer))
    }
}

/// Derives the seed of one fetch from the dataset seed, the sample index and its epoch.
fn fetch_seed(seed: u64, index: usize, epoch: u64) -> u64 {
    mix(mix(seed ^ mix(index as u64)) ^ epoch)
}

// splitmix64
fn mix(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl Dataset<SegmentationSample> for SegmentationDataset {
    fn get(&self, index: usize) -> Option<SegmentationSample> {
        match self.try_get(index) {
            Ok(sample) => Some(sample),
            Err(DatasetError::OutOfRange { .. }) => None,
            // The dataloader reads `None` as the end of the dataset.
            Err(err) => panic!("Failed to fetch sample {index}: {err}"),
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

#[derive(Clone)]
pub struct SegmentationBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> SegmentationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

#[derive(Clone, Debug)]
pub struct SegmentationBatch<B: Backend> {
    /// `[N, C, H, W]`
    pub images: Tensor<B, 4, Float>,
    /// `[N, H, W]`
    pub masks: Tensor<B, 3, Int>,
}

impl<B: Backend> Batcher<SegmentationSample, SegmentationBatch<B>> for SegmentationBatcher<B> {
    fn batch(&self, items: Vec<SegmentationSample>) -> SegmentationBatch<B> {
        let mut images = Vec::with_capacity(items.len());
        let mut masks = Vec::with_capacity(items.len());

        for item in items {
            let [height, width] = [item.height(), item.width()];

            let image_tensor = Tensor::<B, 3>::from_data(
                item.image.convert::<B::FloatElem>(),
                &self.device,
            );

            let labels: Vec<i64> = item.mask.into_raw().into_iter().map(i64::from).collect();
            let mask_tensor = Tensor::<B, 2, Int>::from_data(
                TensorData::new(labels, Shape::new([height, width])).convert::<B::IntElem>(),
                &self.device,
            );

            images.push(image_tensor);
            masks.push(mask_tensor);
        }

        let images: Tensor<B, 4> = Tensor::stack::<4>(images, 0);
        let masks: Tensor<B, 3, Int> = Tensor::stack::<3>(masks, 0);

        SegmentationBatch { images, masks }
    }
}
