//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`operations`](super::operations) module (which
//! decides sizes and boxes) and the [`backend`](super::backend) (which does
//! the pixel work), so drivers can be tested against a mock backend.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 95). Clamped on construction.
//! - [`ResizeFilter`]: Resampling filter for resizes (default nearest-neighbour).
//! - [`ConvertParams`]: Re-encode a source into a named format.
//! - [`ResizeParams`]: Resize a source to exact target dimensions.
//! - [`CropParams`]: Cut a box out of a source.

use super::geometry::CropBox;
use crate::formats::FormatSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Resampling filter used when resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    #[default]
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub fn to_filter_type(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Parameters for a format conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: FormatSpec,
    pub quality: Quality,
    /// Spend more encoder effort for smaller output where the format allows it.
    pub optimize: bool,
}

/// Parameters for a resize to exact dimensions.
///
/// The output format follows the extension of `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub filter: ResizeFilter,
    pub quality: Quality,
}

/// Parameters for a crop.
///
/// The output format follows the extension of `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub crop: CropBox,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_95() {
        assert_eq!(Quality::default().value(), 95);
    }

    #[test]
    fn resize_filter_default_is_nearest() {
        assert_eq!(ResizeFilter::default(), ResizeFilter::Nearest);
        assert_eq!(
            ResizeFilter::default().to_filter_type(),
            image::imageops::FilterType::Nearest
        );
    }

    #[test]
    fn resize_filter_parses_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            filter: ResizeFilter,
        }
        let w: Wrapper = toml::from_str(r#"filter = "catmull-rom""#).unwrap();
        assert_eq!(w.filter, ResizeFilter::CatmullRom);
    }
}
