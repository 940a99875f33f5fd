mod augmentation;
mod error;
mod manifest;
mod resize;
mod sample;
mod segmentation;

pub use augmentation::*;
pub use error::DatasetError;
pub use manifest::{DatasetIndex, ImageMaskPair, MANIFEST_FILE, ManifestRow, Subset};
pub use resize::{resize_image, resize_label_map};
pub use sample::{NormalizeConfig, Normalizer, SegmentationSample, assemble};
pub use segmentation::{SegmentationBatch, SegmentationBatcher, SegmentationDataset, load_pair};
