#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Canonical event protocol shared by all readers and writers.
///
/// Readers drive an [`adapter::InputAdapter`] and the writer pulls from an
/// [`adapter::OutputAdapter`].
pub mod adapter;

/// Format detection and dispatch to the matching reader or writer.
pub mod dataset;

/// Error types for dataset reading and writing.
pub mod error;

/// Readers and writers of the supported dataset formats.
pub mod formats;

/// Minimal JPEG header inspection to recover image sizes.
pub mod jpeg;

/// Callback driven PLY parser.
pub mod ply;

/// In-memory textured point cloud implementing both adapter traits.
pub mod pointcloud;

/// Line and token decoding for the text based formats.
pub mod tokens;

pub use dataset::{DatasetFormat, InputData, OutputData};
pub use error::DatasetError;
