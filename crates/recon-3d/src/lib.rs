#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Camera parameterizations and their conversion to a common projection.
pub mod camera;

/// Projection matrices and point reprojection.
pub mod projection;
