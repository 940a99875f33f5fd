use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use burn::backend::NdArray;
use burn::data::dataloader::DataLoaderBuilder;
use burn::data::dataset::Dataset;
use fashion_seg::dataset::{MANIFEST_FILE, SegmentationBatcher};
use fashion_seg::{AugmentationConfig, DatasetError, SegmentationDataset};
use image::{GrayImage, Luma, Rgb, RgbImage};

const SIZE: u32 = 40;

fn write_pair(root: &Path, name: &str, with_mask: bool) {
    let image = RgbImage::from_fn(SIZE, SIZE, |x, y| {
        Rgb([(x * 6) as u8, (y * 6) as u8, ((x + y) * 3) as u8])
    });
    image.save(root.join(format!("{name}.jpg"))).unwrap();

    if with_mask {
        let mask = GrayImage::from_fn(SIZE, SIZE, |x, y| {
            Luma([if x < SIZE / 2 { 0 } else if y < SIZE / 2 { 3 } else { 7 }])
        });
        mask.save(root.join(format!("{name}.png"))).unwrap();
    }
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_pair(root, "a", true);
    write_pair(root, "b", true);
    write_pair(root, "c", false);
    write_pair(root, "d", true);

    fs::write(
        root.join(MANIFEST_FILE),
        r#"[
            {"image_path": "a.jpg", "mask_path": "a.png", "set": "train"},
            {"image_path": "b.jpg", "mask_path": "b.png", "set": "train"},
            {"image_path": "c.jpg", "mask_path": "c.png", "set": "train"},
            {"image_path": "d.jpg", "mask_path": "d.png", "set": "validation"}
        ]"#,
    )
    .unwrap();

    dir
}

fn labels(mask: &GrayImage) -> BTreeSet<u8> {
    mask.pixels().map(|p| p.0[0]).collect()
}

#[test]
fn train_subset_skips_incomplete_pairs() {
    let dir = fixture();
    let dataset = SegmentationDataset::open(dir.path(), "train", 32, None).unwrap();

    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.index().listed(), 3);
    assert_eq!(dataset.index().excluded(), 1);
}

#[test]
fn unknown_subset_fails_fast() {
    let dir = fixture();
    let err = SegmentationDataset::open(dir.path(), "val", 32, None).unwrap_err();

    assert!(matches!(err, DatasetError::UnknownSubset(_)));
}

#[test]
fn augmented_samples_keep_label_alphabet() {
    let dir = fixture();
    let config = AugmentationConfig::new().with_crop_size(24);
    let dataset = SegmentationDataset::open(dir.path(), "train", 32, Some(&config))
        .unwrap()
        .with_seed(17);

    for index in 0..dataset.len() {
        let sample = dataset.get(index).unwrap();

        assert_eq!(sample.image.shape, vec![3, 24, 24]);
        assert_eq!(sample.mask.dimensions(), (24, 24));
        assert!(labels(&sample.mask).is_subset(&BTreeSet::from([0, 3, 7])));
    }
}

#[test]
fn fetches_are_reproducible() {
    let dir = fixture();
    let config = AugmentationConfig::new().with_crop_size(20);
    let dataset = SegmentationDataset::open(dir.path(), "train", 32, Some(&config))
        .unwrap()
        .with_seed(3);

    let first = dataset.try_get_at(1, 4).unwrap();
    let second = dataset.try_get_at(1, 4).unwrap();

    assert_eq!(first.mask, second.mask);
    assert_eq!(
        first.image.to_vec::<f32>().unwrap(),
        second.image.to_vec::<f32>().unwrap()
    );
}

#[test]
fn validation_subset_without_augmentation_is_resized_only() {
    let dir = fixture();
    let dataset = SegmentationDataset::open(dir.path(), "validation", 20, None).unwrap();

    let sample = dataset.get(0).unwrap();

    assert_eq!(sample.mask.dimensions(), (20, 20));
    assert_eq!(sample.mask.get_pixel(0, 0).0[0], 0);
    assert_eq!(sample.mask.get_pixel(19, 0).0[0], 3);
    assert_eq!(sample.mask.get_pixel(19, 19).0[0], 7);
}

#[test]
fn dataloader_batches_across_workers() {
    let dir = fixture();
    let config = AugmentationConfig::new().with_crop_size(16);
    let dataset = SegmentationDataset::open(dir.path(), "train", 32, Some(&config))
        .unwrap()
        .with_seed(5);

    let batcher = SegmentationBatcher::<NdArray>::new(Default::default());
    let dataloader = DataLoaderBuilder::new(batcher)
        .batch_size(2)
        .num_workers(2)
        .build(dataset);

    let batches: Vec<_> = dataloader.iter().collect();
    let items: usize = batches.iter().map(|batch| batch.images.dims()[0]).sum();

    assert_eq!(items, 2);
    for batch in batches {
        let [n, c, h, w] = batch.images.dims();
        assert_eq!([c, h, w], [3, 16, 16]);
        assert_eq!(batch.masks.dims(), [n, 16, 16]);
    }
}

fn corrupt_fixture(corrupt: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    for name in ["a", "b", "c"] {
        write_pair(root, name, true);
    }
    fs::write(root.join(corrupt), b"not an image").unwrap();

    fs::write(
        root.join(MANIFEST_FILE),
        r#"[
            {"image_path": "a.jpg", "mask_path": "a.png", "set": "train"},
            {"image_path": "b.jpg", "mask_path": "b.png", "set": "train"},
            {"image_path": "c.jpg", "mask_path": "c.png", "set": "train"}
        ]"#,
    )
    .unwrap();

    dir
}

#[test]
fn undecodable_image_is_reported() {
    let dir = corrupt_fixture("b.jpg");
    let dataset = SegmentationDataset::open(dir.path(), "train", 32, None).unwrap();

    assert_eq!(dataset.len(), 3);
    assert!(matches!(dataset.try_get(1), Err(DatasetError::Decode { .. })));
}

#[test]
#[should_panic(expected = "Failed to fetch sample 1")]
fn undecodable_image_panics_instead_of_ending_the_epoch() {
    let dir = corrupt_fixture("b.jpg");
    let dataset = SegmentationDataset::open(dir.path(), "train", 32, None).unwrap();

    assert!(dataset.get(0).is_some());
    dataset.get(1);
}

#[test]
#[should_panic(expected = "Failed to fetch sample 2")]
fn corrupt_mask_panics() {
    let dir = corrupt_fixture("c.png");
    let dataset = SegmentationDataset::open(dir.path(), "train", 32, None).unwrap();

    dataset.get(2);
}

#[test]
#[should_panic(expected = "is larger than input image size")]
fn oversized_crop_panics_on_fetch() {
    let dir = fixture();
    let config = AugmentationConfig::new();
    let dataset = SegmentationDataset::open(dir.path(), "train", 16, Some(&config)).unwrap();

    dataset.get(0);
}

#[test]
fn epochs_draw_fresh_augmentations() {
    let dir = fixture();
    let config = AugmentationConfig::new().with_crop_size(16);
    let dataset = SegmentationDataset::open(dir.path(), "train", 32, Some(&config))
        .unwrap()
        .with_seed(8);

    let masks: Vec<GrayImage> = (0..6).map(|_| dataset.get(0).unwrap().mask).collect();

    assert!(masks.iter().any(|mask| *mask != masks[0]));
    for (epoch, mask) in masks.iter().enumerate() {
        assert_eq!(dataset.try_get_at(0, epoch as u64).unwrap().mask, *mask);
    }
}

#[test]
fn epoch_sequence_is_reproducible() {
    let dir = fixture();
    let config = AugmentationConfig::new().with_crop_size(16);
    let open = || {
        SegmentationDataset::open(dir.path(), "train", 32, Some(&config))
            .unwrap()
            .with_seed(8)
    };
    let (first, second) = (open(), open());

    for _ in 0..3 {
        for index in 0..first.len() {
            assert_eq!(first.get(index).unwrap().mask, second.get(index).unwrap().mask);
        }
    }
}
