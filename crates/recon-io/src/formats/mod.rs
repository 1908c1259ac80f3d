use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use crate::{error::DatasetError, tokens::LineReader};

pub(crate) mod cmvs;
mod dense;
mod nvm;
pub(crate) mod patches;
mod ply;
mod rmv;
mod rmv_writer;

pub use cmvs::CmvsReader;
pub use dense::DenseReader;
pub use nvm::NvmReader;
pub use ply::PlyReader;
pub use rmv::RmvReader;
pub use rmv_writer::{write_rmv, RmvWriter};

/// Version tag written at the top of RMV files.
pub const RMV_VERSION_1: &str = "RMV_1";

/// Field delimiter of RMV files.
pub const RMV_DELIMITER: char = ';';

/// Field delimiters of the whitespace separated formats.
pub(crate) const WHITESPACE: &str = " \t";

/// A line reader over a text file.
pub(crate) type FileLines = LineReader<BufReader<File>>;

/// Open a text file for line based decoding.
pub(crate) fn open_lines(path: &Path) -> Result<FileLines, DatasetError> {
    let file = File::open(require_file(path)?)?;
    Ok(LineReader::new(BufReader::new(file), path.display().to_string()))
}

/// Check that `path` is an existing file.
pub(crate) fn require_file(path: &Path) -> Result<&Path, DatasetError> {
    if !path.is_file() {
        return Err(DatasetError::FileDoesNotExist(path.to_path_buf()));
    }
    Ok(path)
}

/// Check that `path` is an existing directory.
pub(crate) fn require_dir(path: &Path) -> Result<&Path, DatasetError> {
    if !path.is_dir() {
        return Err(DatasetError::DirectoryDoesNotExist(path.to_path_buf()));
    }
    Ok(path)
}

/// Resolve a file name stored in a dataset against the directory of the dataset.
pub(crate) fn resolve(base: &Path, file_name: &str) -> PathBuf {
    let path = base.join(file_name);
    if path.is_absolute() {
        return path;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&path))
        .unwrap_or(path)
}

/// Directory containing the file at `path`.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}
