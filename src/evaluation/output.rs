use burn::{
    backend::NdArray,
    prelude::*,
    tensor::{Int, Transaction},
    train::metric::{Adaptor, ItemLazy},
};
use derive_new::new;

use super::IoUInput;

/// Model scores for one batch alongside the ground-truth label maps.
#[derive(new)]
pub struct SegmentationOutput<B: Backend> {
    /// `[N, C, H, W]`
    pub output: Tensor<B, 4>,
    /// `[N, H, W]`
    pub targets: Tensor<B, 3, Int>,
}

impl<B: Backend> ItemLazy for SegmentationOutput<B> {
    type ItemSync = SegmentationOutput<NdArray>;

    fn sync(self) -> Self::ItemSync {
        let [output, targets] = Transaction::default()
            .register(self.output)
            .register(self.targets)
            .execute()
            .try_into()
            .expect("Correct amount of tensor data");

        let device = &Default::default();

        SegmentationOutput {
            output: Tensor::from_data(output, device),
            targets: Tensor::from_data(targets, device),
        }
    }
}

impl<B: Backend> Adaptor<IoUInput<B>> for SegmentationOutput<B> {
    fn adapt(&self) -> IoUInput<B> {
        IoUInput::new(self.output.clone(), self.targets.clone())
    }
}
