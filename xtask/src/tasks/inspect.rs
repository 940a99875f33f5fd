use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use burn::data::dataset::Dataset;
use clap::Args;
use fashion_seg::{AugmentationConfig, SegmentationDataset};

#[derive(Args)]
pub struct InspectArgs {
    /// Dataset root holding `data.json`.
    #[arg(short, long)]
    pub root: PathBuf,

    #[arg(short, long, default_value = "train")]
    pub subset: String,

    #[arg(long, default_value_t = 580)]
    pub image_resize: u32,

    #[arg(long, default_value_t = 512)]
    pub crop_size: u32,

    #[arg(long, default_value_t = 0.5)]
    pub flip_threshold: f64,

    /// Skip color jitter, crop and flip.
    #[arg(long, default_value_t = false)]
    pub no_augment: bool,

    #[arg(short, long, default_value_t = 5)]
    pub count: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

pub fn run(args: &InspectArgs) -> Result<()> {
    let augmentation = (!args.no_augment).then(|| {
        AugmentationConfig::new()
            .with_crop_size(args.crop_size)
            .with_flip_threshold(args.flip_threshold)
    });

    let dataset = SegmentationDataset::open(
        &args.root,
        &args.subset,
        args.image_resize,
        augmentation.as_ref(),
    )
    .with_context(|| format!("Failed to open dataset at {}", args.root.display()))?
    .with_seed(args.seed);

    let index = dataset.index();
    log::info!(
        "Subset `{}`: {} listed pairs, {} usable, {} excluded",
        args.subset,
        index.listed(),
        index.len(),
        index.excluded()
    );

    if dataset.is_empty() {
        bail!("Subset `{}` has no usable image/mask pair", args.subset);
    }

    let step = (dataset.len() / args.count.max(1)).max(1);
    for (i, sample_index) in (0..dataset.len()).step_by(step).take(args.count).enumerate() {
        let sample = dataset
            .try_get(sample_index)
            .with_context(|| format!("Failed to fetch sample {sample_index}"))?;
        let labels: BTreeSet<u8> = sample.mask.pixels().map(|p| p.0[0]).collect();

        log::info!(
            "Sample #{i} (index {sample_index}): image {:?}, mask {}x{}, labels {:?}",
            sample.image.shape,
            sample.height(),
            sample.width(),
            labels
        );
    }

    Ok(())
}
