//! Single-image operations.
//!
//! These functions combine [`geometry`](super::geometry) with backend
//! execution: they read dimensions only when the geometry needs them, build
//! the parameter struct, and hand it to the backend. Overwrite policy and
//! outcome reporting belong to the batch drivers.

use super::backend::{BackendError, ImageBackend};
use super::geometry::{self, CropBox};
use super::params::{ConvertParams, CropParams, Quality, ResizeFilter, ResizeParams};
use crate::formats::FormatSpec;
use crate::types::{CropSpec, Dimensions, ResizeSpec};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<Dimensions> {
    backend.identify(path)
}

/// An image at rest: a path plus dimensions read on first use.
///
/// Owned by whichever driver is processing the file. Dimensions are fetched
/// through the backend at most once, and never for operations that don't
/// need them (size resizes, box crops, conversions).
#[derive(Debug)]
pub struct ImageRef {
    path: PathBuf,
    dimensions: OnceCell<Dimensions>,
}

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dimensions: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Intrinsic dimensions, identified on the first call and cached.
    pub fn dimensions(&self, backend: &impl ImageBackend) -> Result<Dimensions> {
        if let Some(dims) = self.dimensions.get() {
            return Ok(*dims);
        }
        let dims = get_dimensions(backend, &self.path)?;
        Ok(*self.dimensions.get_or_init(|| dims))
    }

    /// Dimensions if they have already been read.
    pub fn known_dimensions(&self) -> Option<Dimensions> {
        self.dimensions.get().copied()
    }
}

fn missing_dimensions(image: &ImageRef) -> BackendError {
    BackendError::decode(image.path(), "dimensions unavailable")
}

/// Target size for resizing `image` according to `spec`.
///
/// Targets beyond [`geometry::within_output_limits`] are refused before any
/// pixels are allocated.
pub fn plan_resize(
    backend: &impl ImageBackend,
    image: &ImageRef,
    spec: &ResizeSpec,
) -> Result<Dimensions> {
    let dims = if geometry::resize_needs_dimensions(spec) {
        Some(image.dimensions(backend)?)
    } else {
        None
    };
    let target =
        geometry::resize_dimensions(spec, dims).ok_or_else(|| missing_dimensions(image))?;
    if !geometry::within_output_limits(target) {
        return Err(BackendError::OutputTooLarge(target));
    }
    Ok(target)
}

/// Crop box for `image` according to `spec`.
pub fn plan_crop(
    backend: &impl ImageBackend,
    image: &ImageRef,
    spec: &CropSpec,
) -> Result<CropBox> {
    let dims = if geometry::crop_needs_dimensions(spec) {
        Some(image.dimensions(backend)?)
    } else {
        None
    };
    geometry::crop_box(spec, dims).ok_or_else(|| missing_dimensions(image))
}

/// Re-encode `image` into `output` as `format`.
pub fn convert_image(
    backend: &impl ImageBackend,
    image: &ImageRef,
    output: &Path,
    format: FormatSpec,
    quality: Quality,
    optimize: bool,
) -> Result<()> {
    backend.convert(&ConvertParams {
        source: image.path().to_path_buf(),
        output: output.to_path_buf(),
        format,
        quality,
        optimize,
    })
}

/// Resize `image` into `output`. Returns the dimensions written.
pub fn resize_image(
    backend: &impl ImageBackend,
    image: &ImageRef,
    output: &Path,
    spec: &ResizeSpec,
    filter: ResizeFilter,
    quality: Quality,
) -> Result<Dimensions> {
    let target = plan_resize(backend, image, spec)?;
    backend.resize(&ResizeParams {
        source: image.path().to_path_buf(),
        output: output.to_path_buf(),
        width: target.width,
        height: target.height,
        filter,
        quality,
    })?;
    Ok(target)
}

/// Crop `image` into `output`. Returns the box that was cut.
pub fn crop_image(
    backend: &impl ImageBackend,
    image: &ImageRef,
    output: &Path,
    spec: &CropSpec,
    quality: Quality,
) -> Result<CropBox> {
    let crop = plan_crop(backend, image, spec)?;
    backend.crop(&CropParams {
        source: image.path().to_path_buf(),
        output: output.to_path_buf(),
        crop,
        quality,
    })?;
    Ok(crop)
}
