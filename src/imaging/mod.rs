//! Image processing on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions`, `avif-parse` for AVIF |
//! | **Decode AVIF** | `avif-parse` + `rav1d`, converted from YUV to RGB8 |
//! | **Convert** | decode, normalize to RGB8, per-format encoder |
//! | **Resize** | `resize_exact` with the configured filter |
//! | **Crop** | `crop_imm` after a bounds check |
//!
//! The module is split into:
//! - **Geometry**: Pure functions for crop boxes and resize targets (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`], with AVIF decoding on `rav1d`
//! - **Operations**: Single-image functions combining geometry + backend

mod avif;
pub mod backend;
pub mod geometry;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use geometry::CropBox;
pub use operations::{ImageRef, convert_image, crop_image, get_dimensions, resize_image};
pub use params::{ConvertParams, CropParams, Quality, ResizeFilter, ResizeParams};
pub use rust_backend::RustBackend;
