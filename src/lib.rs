#[cfg(feature = "dataset")]
pub mod dataset;

#[cfg(feature = "evaluation")]
pub mod evaluation;

#[cfg(feature = "dataset")]
pub use dataset::{
    AugmentationConfig, AugmentationPipeline, DatasetError, DatasetIndex, NormalizeConfig,
    SegmentationDataset, SegmentationSample, Subset,
};

#[cfg(feature = "evaluation")]
pub use evaluation::{IoUMetric, SegmentationOutput, iou};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
