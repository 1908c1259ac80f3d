use std::path::{Path, PathBuf};

use crate::{
    adapter::{InputAdapter, OutputAdapter},
    error::DatasetError,
    formats::{
        patches::has_patch_files, CmvsReader, DenseReader, NvmReader, PlyReader, RmvReader,
        RmvWriter,
    },
    pointcloud::TexturedPointCloud,
};

const INFO_MAX_LENGTH: usize = 40;
const INFO_HEAD: usize = 17;
const INFO_TAIL: usize = 20;

/// The supported dataset layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// `.rmv` text file.
    Rmv,
    /// `.nvm` structure from motion file.
    Nvm,
    /// Multi view stereo output directory with a `00` subdirectory.
    Cmvs,
    /// `.ply` point cloud.
    Ply,
    /// Directory of patch pairs.
    Dense,
    /// None of the above.
    Unrecognized,
}

impl DatasetFormat {
    /// Detect the layout of a dataset to read.
    ///
    /// Directories are recognized by their content, files by their extension,
    /// ignoring case.
    pub fn detect_input(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.is_dir() {
            if path.join("00").is_dir() {
                return DatasetFormat::Cmvs;
            }
            if has_patch_files(path) {
                return DatasetFormat::Dense;
            }
            return DatasetFormat::Unrecognized;
        }

        match lowercase_extension(path).as_deref() {
            Some("rmv") => DatasetFormat::Rmv,
            Some("nvm") => DatasetFormat::Nvm,
            Some("ply") => DatasetFormat::Ply,
            _ => DatasetFormat::Unrecognized,
        }
    }

    /// Detect the layout of a dataset to write, only RMV can be written.
    pub fn detect_output(path: impl AsRef<Path>) -> Self {
        match lowercase_extension(path.as_ref()).as_deref() {
            Some("rmv") => DatasetFormat::Rmv,
            _ => DatasetFormat::Unrecognized,
        }
    }

    /// A short display name.
    pub fn name(&self) -> &'static str {
        match self {
            DatasetFormat::Rmv => "RMV",
            DatasetFormat::Nvm => "NVM",
            DatasetFormat::Cmvs => "CMVS",
            DatasetFormat::Ply => "PLY",
            DatasetFormat::Dense => "Dense",
            DatasetFormat::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Shorten a path for display, keeping its head and tail.
fn abbreviate(path: &Path, format: DatasetFormat) -> String {
    if format == DatasetFormat::Unrecognized {
        return "[none]".to_string();
    }

    let text = path.display().to_string();
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= INFO_MAX_LENGTH {
        return text;
    }
    let head: String = chars[..INFO_HEAD].iter().collect();
    let tail: String = chars[chars.len() - INFO_TAIL..].iter().collect();
    format!("{head}...{tail}")
}

/// A dataset to read, with its layout resolved once at construction.
///
/// Example:
///
/// ```no_run
/// use recon_io::{DatasetFormat, InputData};
///
/// let input = InputData::new("scene.nvm");
/// assert_eq!(input.format(), DatasetFormat::Nvm);
///
/// let cloud = input.load_point_cloud().unwrap();
/// println!("{} points", cloud.len());
/// ```
#[derive(Debug, Clone)]
pub struct InputData {
    path: PathBuf,
    format: DatasetFormat,
    info: String,
}

impl InputData {
    /// Create an input for the file or directory at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = DatasetFormat::detect_input(&path);
        let info = abbreviate(&path, format);
        Self { path, format, info }
    }

    /// The detected layout.
    pub fn format(&self) -> DatasetFormat {
        self.format
    }

    /// Check if the layout was recognized.
    pub fn is_valid(&self) -> bool {
        self.format != DatasetFormat::Unrecognized
    }

    /// A short description for display.
    pub fn info(&self) -> &str {
        &self.info
    }

    /// The dataset path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the dataset and drive the adapter with its content.
    pub fn load<A: InputAdapter + ?Sized>(&self, adapter: &mut A) -> Result<(), DatasetError> {
        log::debug!("Loading {} dataset {}", self.format, self.path.display());
        match self.format {
            DatasetFormat::Rmv => RmvReader::open(&self.path)?.load(adapter),
            DatasetFormat::Nvm => NvmReader::open(&self.path)?.load(adapter),
            DatasetFormat::Cmvs => CmvsReader::open(&self.path)?.load(adapter),
            DatasetFormat::Ply => PlyReader::open(&self.path)?.load(adapter),
            DatasetFormat::Dense => DenseReader::open(&self.path)?.load(adapter),
            DatasetFormat::Unrecognized => Err(DatasetError::UnrecognizedFormat(self.path.clone())),
        }
    }

    /// Read the dataset into a new point cloud.
    pub fn load_point_cloud(&self) -> Result<TexturedPointCloud, DatasetError> {
        let mut cloud = TexturedPointCloud::new();
        self.load(&mut cloud)?;
        Ok(cloud)
    }
}

/// A dataset to write, with its layout resolved once at construction.
#[derive(Debug, Clone)]
pub struct OutputData {
    path: PathBuf,
    format: DatasetFormat,
    info: String,
}

impl OutputData {
    /// Create an output for the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = DatasetFormat::detect_output(&path);
        let info = abbreviate(&path, format);
        Self { path, format, info }
    }

    /// The detected layout.
    pub fn format(&self) -> DatasetFormat {
        self.format
    }

    /// Check if the layout was recognized.
    pub fn is_valid(&self) -> bool {
        self.format != DatasetFormat::Unrecognized
    }

    /// A short description for display.
    pub fn info(&self) -> &str {
        &self.info
    }

    /// The dataset path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode the reconstruction and write the file.
    pub fn write<S: OutputAdapter + ?Sized>(&self, source: &mut S) -> Result<(), DatasetError> {
        match self.format {
            DatasetFormat::Rmv => RmvWriter::new(&self.path).write(source),
            _ => Err(DatasetError::InvalidFileExtension(self.path.clone())),
        }
    }
}
