use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Subset must be one of [train, validation, test]. Is `{0}`")]
    UnknownSubset(String),

    #[error("I/O error on `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest `{path}`: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unable to decode `{path}`: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unsupported label map color type `{0:?}`")]
    UnsupportedMask(image::ColorType),

    #[error("Cannot resize an empty image ({width}x{height}) to {size}x{size}")]
    EmptyImage { width: u32, height: u32, size: u32 },

    #[error("Required crop size {size}x{size} is larger than input image size {width}x{height}")]
    CropTooLarge { size: u32, width: u32, height: u32 },

    #[error("Image ({image_width}x{image_height}) and mask ({mask_width}x{mask_height}) are misaligned after {step}")]
    Misaligned {
        step: &'static str,
        image_width: u32,
        image_height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    #[error("Index {index} out of range for dataset of length {len}")]
    OutOfRange { index: usize, len: usize },
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
