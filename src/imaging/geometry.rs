//! Pure geometry for crops and resizes.
//!
//! All functions here are pure and testable without any I/O or images. None
//! of them clamp against the source image: a box that falls outside the
//! source is rejected by the backend when the crop is executed.

use crate::types::{Alignment, AspectRatio, CropSpec, Dimensions, ResizeSpec};
use serde::Serialize;
use std::fmt;

/// A crop rectangle as `(x0, y0, x1, y1)`, right and bottom edges exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl CropBox {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// True if the box lies within an image of the given size.
    pub fn fits_within(&self, dims: Dimensions) -> bool {
        self.x1 <= dims.width && self.y1 <= dims.height
    }
}

impl fmt::Display for CropBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Start offset of a span of length `chosen` inside `total`.
///
/// `top`/`left` pin to 0, `bottom`/`right` pin to the far edge, and center
/// (or no alignment) splits the remainder, rounding down.
pub fn align_start(total: u32, chosen: u32, align: Option<Alignment>) -> u32 {
    let slack = total.saturating_sub(chosen);
    match align.unwrap_or_default() {
        Alignment::Top | Alignment::Left => 0,
        Alignment::Bottom | Alignment::Right => slack,
        Alignment::Center => slack / 2,
    }
}

/// Largest box of the requested aspect ratio inside `dims`.
///
/// When the target ratio is wider than the image, the full width is kept and
/// the height is cut to `floor(width / ratio)`; otherwise the full height is
/// kept and the width is cut to `floor(height * ratio)`. The cut axis is
/// positioned with [`align_start`].
///
/// # Examples
/// ```
/// # use pix::imaging::geometry::crop_box_for_ratio;
/// # use pix::types::{Alignment, AspectRatio, Dimensions};
/// let ratio = AspectRatio::parse("16:9").unwrap();
/// let b = crop_box_for_ratio(Dimensions::new(1000, 1000), ratio, Some(Alignment::Top));
/// assert_eq!((b.x0, b.y0, b.x1, b.y1), (0, 0, 1000, 562));
/// ```
pub fn crop_box_for_ratio(
    dims: Dimensions,
    ratio: AspectRatio,
    align: Option<Alignment>,
) -> CropBox {
    let (w, h) = (u64::from(dims.width), u64::from(dims.height));
    let (rw, rh) = (u64::from(ratio.width), u64::from(ratio.height));

    // rw/rh > w/h, cross-multiplied to stay in integers
    if rw * h > w * rh {
        let new_height = (w * rh / rw) as u32;
        let y0 = align_start(dims.height, new_height, align);
        CropBox {
            x0: 0,
            y0,
            x1: dims.width,
            y1: y0 + new_height,
        }
    } else {
        let new_width = (h * rw / rh) as u32;
        let x0 = align_start(dims.width, new_width, align);
        CropBox {
            x0,
            y0: 0,
            x1: x0 + new_width,
            y1: dims.height,
        }
    }
}

/// Box for an absolute `WxH+X+Y` crop.
pub fn crop_box_absolute(width: u32, height: u32, x: u32, y: u32) -> CropBox {
    CropBox {
        x0: x,
        y0: y,
        x1: x.saturating_add(width),
        y1: y.saturating_add(height),
    }
}

/// Source dimensions are only needed for ratio crops.
pub fn crop_needs_dimensions(spec: &CropSpec) -> bool {
    matches!(spec, CropSpec::Ratio { .. })
}

/// Resolve a crop spec to a box. `dims` is required for ratio crops.
pub fn crop_box(spec: &CropSpec, dims: Option<Dimensions>) -> Option<CropBox> {
    match *spec {
        CropSpec::Ratio { ratio, align } => dims.map(|d| crop_box_for_ratio(d, ratio, align)),
        CropSpec::Box {
            width,
            height,
            x,
            y,
        } => Some(crop_box_absolute(width, height, x, y)),
    }
}

/// Source dimensions are only needed for scale resizes.
pub fn resize_needs_dimensions(spec: &ResizeSpec) -> bool {
    matches!(spec, ResizeSpec::Scale(_))
}

/// Target size for a resize. `dims` is required for scale resizes.
///
/// Scaled dimensions are rounded to the nearest pixel and never drop below 1.
pub fn resize_dimensions(spec: &ResizeSpec, dims: Option<Dimensions>) -> Option<Dimensions> {
    match *spec {
        ResizeSpec::Size(size) => Some(size),
        ResizeSpec::Scale(factor) => dims.map(|d| {
            Dimensions::new(
                scale_edge(d.width, factor),
                scale_edge(d.height, factor),
            )
        }),
    }
}

/// Edges too long for `u32` saturate; [`within_output_limits`] rejects them.
fn scale_edge(edge: u32, factor: f64) -> u32 {
    ((f64::from(edge) * factor).round() as u32).max(1)
}

/// Longest edge a resize may produce.
pub const MAX_EDGE: u32 = 65_535;

/// Most pixels a resize may produce (256 megapixels).
pub const MAX_PIXELS: u64 = 1 << 28;

/// True if an image of `dims` is small enough to allocate as a resize target.
pub fn within_output_limits(dims: Dimensions) -> bool {
    dims.width <= MAX_EDGE
        && dims.height <= MAX_EDGE
        && u64::from(dims.width) * u64::from(dims.height) <= MAX_PIXELS
}
