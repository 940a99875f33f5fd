pub mod metrics;
pub mod output;

pub use metrics::{BACKGROUND, IoUInput, IoUMetric, class_ious, iou, sample_iou};
pub use output::SegmentationOutput;
