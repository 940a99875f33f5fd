use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use super::DatasetError;

pub const MANIFEST_FILE: &str = "data.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subset {
    Train,
    Validation,
    Test,
}

impl Subset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subset::Train => "train",
            Subset::Validation => "validation",
            Subset::Test => "test",
        }
    }
}

impl FromStr for Subset {
    type Err = DatasetError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "train" => Ok(Subset::Train),
            "validation" => Ok(Subset::Validation),
            "test" => Ok(Subset::Test),
            other => Err(DatasetError::UnknownSubset(other.to_string())),
        }
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the manifest. Paths are relative to the dataset root.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestRow {
    pub image_path: PathBuf,
    pub mask_path: PathBuf,
    pub set: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMaskPair {
    pub image_path: PathBuf,
    pub mask_path: PathBuf,
}

/// Image/mask pairs of one subset whose files both exist.
#[derive(Debug, Clone, Default)]
pub struct DatasetIndex {
    pairs: Vec<ImageMaskPair>,
    listed: usize,
}

impl DatasetIndex {
    /// Reads `<root>/data.json` and keeps the rows of `subset` whose image and mask
    /// are both present on disk.
    pub fn load<P: AsRef<Path>>(root: P, subset: Subset) -> Result<Self, DatasetError> {
        let root = root.as_ref();
        let manifest_path = root.join(MANIFEST_FILE);

        let content = std::fs::read_to_string(&manifest_path)
            .map_err(|source| DatasetError::io(&manifest_path, source))?;
        let rows: Vec<ManifestRow> =
            serde_json::from_str(&content).map_err(|source| DatasetError::Manifest {
                path: manifest_path.clone(),
                source,
            })?;

        let pairs = rows
            .into_iter()
            .filter(|row| row.set == subset.as_str())
            .map(|row| ImageMaskPair {
                image_path: root.join(row.image_path),
                mask_path: root.join(row.mask_path),
            })
            .collect();

        let index = Self::from_pairs(pairs);
        log::info!(
            "Read {} {subset} images from {}, built {} image pairs",
            index.listed,
            manifest_path.display(),
            index.len()
        );
        Ok(index)
    }

    pub fn from_pairs(pairs: Vec<ImageMaskPair>) -> Self {
        let listed = pairs.len();
        let pairs: Vec<_> = pairs
            .into_iter()
            .filter(|pair| pair.image_path.is_file() && pair.mask_path.is_file())
            .collect();

        let index = Self { pairs, listed };
        if index.excluded() > 0 {
            log::warn!(
                "Excluded {} of {} pairs with a missing image or mask",
                index.excluded(),
                listed
            );
        }
        index
    }

    pub fn pairs(&self) -> &[ImageMaskPair] {
        &self.pairs
    }

    pub fn get(&self, index: usize) -> Option<&ImageMaskPair> {
        self.pairs.get(index)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of rows listed for the subset, before filtering.
    pub fn listed(&self) -> usize {
        self.listed
    }

    /// Number of listed pairs dropped because a file was missing.
    pub fn excluded(&self) -> usize {
        self.listed - self.pairs.len()
    }
}
