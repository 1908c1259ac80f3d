use std::path::{Path, PathBuf};

use super::{patches::open_patch_pairs, require_dir};
use crate::{adapter::InputAdapter, error::DatasetError};

/// Reader of a directory of patch pairs without cameras.
///
/// Points keep the ids of the images they are visible in, with `(0, 0)` as texture
/// coordinates since no projection is available.
#[derive(Debug, Clone)]
pub struct DenseReader {
    path: PathBuf,
}

impl DenseReader {
    /// Create a reader for an existing directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = require_dir(path.as_ref())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Read all patch pairs of the directory and drive the adapter with their points.
    pub fn load<A: InputAdapter + ?Sized>(&self, adapter: &mut A) -> Result<(), DatasetError> {
        let pairs = open_patch_pairs(&self.path)?;
        if pairs.is_empty() {
            log::warn!("No patch files in {}", self.path.display());
        }

        let mut num_points = 0;
        for pair in pairs {
            num_points += pair.count();
            pair.emit_points(adapter, |_, _| Ok((0.0, 0.0)))?;
        }

        log::info!("Read {} points from {}", num_points, self.path.display());
        Ok(())
    }
}
