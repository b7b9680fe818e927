//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations every backend must
//! support: identify, convert, resize, and crop. Batch drivers only talk to
//! this trait, so they can run against the recording mock in tests.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::geometry::CropBox;
use super::params::{ConvertParams, CropParams, ResizeParams};
use crate::types::Dimensions;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("Failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },
    #[error("Crop box {crop} exceeds image bounds {dims}")]
    CropOutOfBounds { crop: CropBox, dims: Dimensions },
    #[error("Unsupported output format for {0}")]
    UnsupportedOutput(PathBuf),
    #[error(
        "Output size {0} is too large (at most {max_edge}px per side, {max_pixels} pixels)",
        max_edge = super::geometry::MAX_EDGE,
        max_pixels = super::geometry::MAX_PIXELS
    )]
    OutputTooLarge(Dimensions),
}

impl BackendError {
    pub(crate) fn decode(path: &Path, reason: impl ToString) -> Self {
        BackendError::Decode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encode(path: &Path, reason: impl ToString) -> Self {
        BackendError::Encode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Trait for image codec backends.
pub trait ImageBackend {
    /// Read pixel dimensions without transforming the image.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode, normalize to RGB, and re-encode in the requested format.
    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError>;

    /// Resize to exact dimensions.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;

    /// Cut out a box. Boxes outside the source fail with
    /// [`BackendError::CropOutOfBounds`].
    fn crop(&self, params: &CropParams) -> Result<(), BackendError>;
}
