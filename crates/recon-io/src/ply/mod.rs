mod parser;
mod properties;

pub use parser::*;
pub use properties::*;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read PLY file
    #[error("Failed to read PLY file. {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the `ply` magic
    #[error("Missing 'ply' magic")]
    MissingMagic,

    /// Malformed PLY header
    #[error("Malformed PLY header at line {line}: {message}")]
    MalformedHeader {
        /// Header line number.
        line: usize,
        /// What is wrong with the line.
        message: String,
    },

    /// Unsupported PLY data type
    #[error("Unsupported PLY data type: {0}")]
    UnsupportedDataType(String),

    /// Unsupported PLY storage format
    #[error("Unsupported PLY format: {0}")]
    UnsupportedFormat(String),

    /// A value in the body could not be decoded
    #[error("Invalid value in element '{element}': {message}")]
    InvalidValue {
        /// The element being decoded.
        element: String,
        /// What is wrong with the value.
        message: String,
    },

    /// The body ends before all declared elements were read
    #[error("Unexpected end of PLY data in element '{0}'")]
    UnexpectedEof(String),
}
