use std::path::PathBuf;

use recon_3d::projection::ProjectionError;

use crate::{jpeg::JpegHeaderError, ply::PlyError, tokens::TokenError};

/// An error type for reading and writing datasets.
///
/// Every error aborts the whole operation; readers never return partial datasets.
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// Error when a required directory does not exist.
    #[error("Directory does not exist: {0}")]
    DirectoryDoesNotExist(PathBuf),

    /// A file does not start with the expected magic string.
    #[error("Invalid file {path}: expected '{expected}', found '{found}'")]
    InvalidMagic {
        /// The offending file.
        path: PathBuf,
        /// The expected magic string.
        expected: &'static str,
        /// What the file contains instead.
        found: String,
    },

    /// The version tag of a file is not supported.
    #[error("Unsupported version '{found}' in {path}")]
    UnsupportedVersion {
        /// The offending file.
        path: PathBuf,
        /// The version tag found.
        found: String,
    },

    /// Invalid file extension.
    #[error("File does not have a valid extension: {0}")]
    InvalidFileExtension(PathBuf),

    /// The path does not match any supported dataset layout.
    #[error("Unrecognized dataset format: {0}")]
    UnrecognizedFormat(PathBuf),

    /// A declared record count does not match the observed one.
    #[error("Count mismatch in {path}: declared {declared}, found {found}")]
    CountMismatch {
        /// The file declaring the count.
        path: PathBuf,
        /// The declared count.
        declared: usize,
        /// The count found in the accompanying file.
        found: usize,
    },

    /// A line or field could not be decoded.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// A point references a texture that was never registered.
    #[error("Point references unknown texture {0}")]
    UnknownTexture(u32),

    /// The header of an image could not be decoded.
    #[error("Failed to decode the header of {path}. {source}")]
    JpegHeader {
        /// The image file.
        path: PathBuf,
        /// The decoding error.
        source: JpegHeaderError,
    },

    /// A point could not be reprojected into a texture.
    #[error("Failed to reproject a point into texture {texture_id}. {source}")]
    Projection {
        /// The texture the point was projected into.
        texture_id: u32,
        /// The projection error.
        source: ProjectionError,
    },

    /// A value cannot be represented in the output format.
    #[error("Invalid field for output: {0}")]
    InvalidField(String),

    /// Error from the PLY parser.
    #[error(transparent)]
    Ply(#[from] PlyError),

    /// Error to open or write a file.
    #[error("Failed to manipulate the file. {0}")]
    Io(#[from] std::io::Error),
}
