use std::collections::BTreeSet;
use std::marker::PhantomData;

use burn::prelude::*;
use burn::train::metric::state::{FormatOptions, NumericMetricState};
use burn::train::metric::{Metric, MetricEntry, MetricMetadata, Numeric};
use derive_new::new;

/// Label value excluded from the IoU average.
pub const BACKGROUND: i64 = 0;

/// Per-class IoU of every non-background class present in `targets`.
///
/// `targets` is `[N, H, W]` and `scores` is `[N, C, H, W]`; the predicted class of a
/// pixel is the arg-max over `C`. Only classes found in the ground truth are scored,
/// so no union is ever empty.
pub fn class_ious<B: Backend>(targets: Tensor<B, 3, Int>, scores: Tensor<B, 4>) -> Vec<(i64, f64)> {
    let [batch_size, _, height, width] = scores.dims();
    assert_eq!(
        targets.dims(),
        [batch_size, height, width],
        "Targets must match the spatial shape of the scores"
    );

    let predictions: Tensor<B, 3, Int> = scores.argmax(1).squeeze(1);

    let classes: BTreeSet<i64> = targets.to_data().iter::<i64>().collect();

    classes
        .into_iter()
        .filter(|class| *class != BACKGROUND)
        .map(|class| {
            let target_mask = targets.clone().equal_elem(class).float();
            let pred_mask = predictions.clone().equal_elem(class).float();

            let intersection = (target_mask.clone() * pred_mask.clone())
                .sum()
                .into_scalar()
                .elem::<f64>();
            let union = (target_mask.clone() + pred_mask.clone() - target_mask * pred_mask)
                .sum()
                .into_scalar()
                .elem::<f64>();

            (class, intersection / union)
        })
        .collect()
}

/// Mean IoU over the non-background classes present in `targets`.
///
/// Returns `NaN` when the ground truth only contains background.
pub fn iou<B: Backend>(targets: Tensor<B, 3, Int>, scores: Tensor<B, 4>) -> f64 {
    let ious = class_ious(targets, scores);
    if ious.is_empty() {
        return f64::NAN;
    }
    ious.iter().map(|(_, iou)| iou).sum::<f64>() / ious.len() as f64
}

/// [`iou`] for a single `[H, W]` label map and its `[C, H, W]` score map.
pub fn sample_iou<B: Backend>(targets: Tensor<B, 2, Int>, scores: Tensor<B, 3>) -> f64 {
    iou(targets.unsqueeze(), scores.unsqueeze())
}

/// Running mean IoU, reported in percent.
///
/// Batches whose ground truth holds no foreground class do not enter the average.
#[derive(Default)]
pub struct IoUMetric<B: Backend> {
    state: NumericMetricState,
    _b: PhantomData<B>,
}

#[derive(new)]
pub struct IoUInput<B: Backend> {
    /// `[N, C, H, W]`
    outputs: Tensor<B, 4>,
    /// `[N, H, W]`
    targets: Tensor<B, 3, Int>,
}

impl<B: Backend> IoUMetric<B> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: Backend> Metric for IoUMetric<B> {
    type Input = IoUInput<B>;
    const NAME: &'static str = "IoU";

    fn update(&mut self, input: &IoUInput<B>, _metadata: &MetricMetadata) -> MetricEntry {
        let [batch_size, _, _, _] = input.outputs.dims();
        let iou = iou(input.targets.clone(), input.outputs.clone());

        if iou.is_nan() {
            log::debug!("Skipping IoU of a background-only batch");
            return MetricEntry::new(
                Self::NAME.to_string(),
                format!("{} NaN", Self::NAME),
                f64::NAN.to_string(),
            );
        }

        self.state.update(
            100.0 * iou,
            batch_size,
            FormatOptions::new(Self::NAME).unit("%").precision(2),
        )
    }

    fn clear(&mut self) {
        self.state.reset()
    }
}

impl<B: Backend> Numeric for IoUMetric<B> {
    fn value(&self) -> f64 {
        self.state.value()
    }
}
