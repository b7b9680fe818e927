//! Operation specifications shared by the CLI, config, and batch drivers.
//!
//! Mutually exclusive option pairs (`--ratio`/`--size` for crop,
//! `--size`/`--scale` for resize) are modelled as enums, and the
//! `from_options` constructors are the only place where "both" or "neither"
//! is rejected. Everything downstream holds exactly one variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Invalid operation options: a malformed string or a bad option combination.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid size `{0}`: expected WxH with positive integers (e.g. 800x600)")]
    InvalidSize(String),
    #[error("invalid ratio `{0}`: expected W:H with positive integers (e.g. 16:9)")]
    InvalidRatio(String),
    #[error("invalid crop box `{0}`: expected WxH+X+Y (e.g. 800x600+100+150)")]
    InvalidCropBox(String),
    #[error("invalid alignment `{0}`: expected top, bottom, left, right, or center")]
    InvalidAlignment(String),
    #[error("invalid scale `{0}`: expected a positive number")]
    InvalidScale(f64),
    #[error(
        "unsupported format `{0}`: expected one of {list}",
        list = crate::formats::supported_formats_list()
    )]
    UnknownFormat(String),
    #[error("either {0} must be specified")]
    MissingOption(&'static str),
    #[error("{0} are mutually exclusive")]
    ConflictingOptions(&'static str),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse `WxH` into two positive integers.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidSize(s.to_string());
        let (w, h) = s.split_once('x').ok_or_else(invalid)?;
        let width: u32 = w.parse().map_err(|_| invalid())?;
        let height: u32 = h.parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Where a ratio crop is positioned along the axis being reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Top,
    Bottom,
    Left,
    Right,
    #[default]
    Center,
}

impl Alignment {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "top" => Ok(Alignment::Top),
            "bottom" => Ok(Alignment::Bottom),
            "left" => Ok(Alignment::Left),
            "right" => Ok(Alignment::Right),
            "center" => Ok(Alignment::Center),
            other => Err(ParseError::InvalidAlignment(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Alignment::Top => "top",
            Alignment::Bottom => "bottom",
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Center => "center",
        }
    }
}

impl FromStr for Alignment {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aspect ratio `W:H` with both terms positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidRatio(s.to_string());
        let (w, h) = s.split_once(':').ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// How to crop: by aspect ratio with alignment, or by an absolute box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CropSpec {
    Ratio {
        ratio: AspectRatio,
        /// `None` behaves as [`Alignment::Center`].
        align: Option<Alignment>,
    },
    Box {
        width: u32,
        height: u32,
        x: u32,
        y: u32,
    },
}

impl CropSpec {
    /// Build from the raw `--ratio`, `--size`, and `--align` options.
    ///
    /// Exactly one of `ratio` and `size` must be given. `align` only applies
    /// to ratio crops and is ignored for an absolute box.
    pub fn from_options(
        ratio: Option<&str>,
        size: Option<&str>,
        align: Option<Alignment>,
    ) -> Result<Self, ParseError> {
        match (ratio, size) {
            (Some(_), Some(_)) => Err(ParseError::ConflictingOptions("`--ratio` and `--size`")),
            (None, None) => Err(ParseError::MissingOption("`--ratio` or `--size`")),
            (Some(r), None) => Ok(CropSpec::Ratio {
                ratio: AspectRatio::parse(r)?,
                align,
            }),
            (None, Some(s)) => Self::parse_box(s),
        }
    }

    /// Parse `WxH+X+Y` into an absolute box. All four values are
    /// non-negative integers.
    pub fn parse_box(s: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidCropBox(s.to_string());
        let tokens: Vec<&str> = s.split(['x', '+']).collect();
        let [w, h, x, y] = tokens[..] else {
            return Err(invalid());
        };
        let parse = |t: &str| t.parse::<u32>().map_err(|_| invalid());
        Ok(CropSpec::Box {
            width: parse(w)?,
            height: parse(h)?,
            x: parse(x)?,
            y: parse(y)?,
        })
    }
}

impl fmt::Display for CropSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropSpec::Ratio { ratio, align } => {
                write!(f, "ratio {}, align {}", ratio, align.unwrap_or_default())
            }
            CropSpec::Box {
                width,
                height,
                x,
                y,
            } => write!(f, "box {}x{}+{}+{}", width, height, x, y),
        }
    }
}

/// How to resize: to an absolute size, or by a scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeSpec {
    Size(Dimensions),
    Scale(f64),
}

impl ResizeSpec {
    /// Build from the raw `--size` and `--scale` options; exactly one must be given.
    pub fn from_options(size: Option<&str>, scale: Option<f64>) -> Result<Self, ParseError> {
        match (size, scale) {
            (Some(_), Some(_)) => Err(ParseError::ConflictingOptions("`--size` and `--scale`")),
            (None, None) => Err(ParseError::MissingOption("`--size` or `--scale`")),
            (Some(s), None) => Ok(ResizeSpec::Size(Dimensions::parse(s)?)),
            (None, Some(factor)) => {
                if !factor.is_finite() || factor <= 0.0 {
                    return Err(ParseError::InvalidScale(factor));
                }
                Ok(ResizeSpec::Scale(factor))
            }
        }
    }
}

impl fmt::Display for ResizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResizeSpec::Size(dims) => write!(f, "size {}", dims),
            ResizeSpec::Scale(factor) => write!(f, "scale {}", factor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Dimensions
    // =========================================================================

    #[test]
    fn dimensions_parse_valid() {
        assert_eq!(Dimensions::parse("800x600").unwrap(), Dimensions::new(800, 600));
    }

    #[test]
    fn dimensions_reject_zero() {
        assert!(Dimensions::parse("0x600").is_err());
        assert!(Dimensions::parse("800x0").is_err());
    }

    #[test]
    fn dimensions_reject_malformed() {
        for bad in ["800", "800x", "x600", "800x600x2", "a x b", "-1x5", "800X600"] {
            assert!(
                matches!(Dimensions::parse(bad), Err(ParseError::InvalidSize(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn dimensions_display_round_trips_syntax() {
        assert_eq!(Dimensions::new(640, 480).to_string(), "640x480");
    }

    // =========================================================================
    // Alignment and ratio
    // =========================================================================

    #[test]
    fn alignment_parse_all() {
        for a in ["top", "bottom", "left", "right", "center"] {
            assert_eq!(Alignment::parse(a).unwrap().name(), a);
        }
        assert!(Alignment::parse("middle").is_err());
    }

    #[test]
    fn alignment_default_is_center() {
        assert_eq!(Alignment::default(), Alignment::Center);
    }

    #[test]
    fn ratio_parse_valid() {
        let r = AspectRatio::parse("16:9").unwrap();
        assert_eq!((r.width, r.height), (16, 9));
    }

    #[test]
    fn ratio_reject_zero_and_malformed() {
        for bad in ["0:9", "16:0", "16", "16:9:1", "a:b", "1.5:1"] {
            assert!(AspectRatio::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    // =========================================================================
    // CropSpec
    // =========================================================================

    #[test]
    fn crop_box_parse() {
        assert_eq!(
            CropSpec::parse_box("800x600+100+150").unwrap(),
            CropSpec::Box {
                width: 800,
                height: 600,
                x: 100,
                y: 150
            }
        );
    }

    #[test]
    fn crop_box_allows_zero_offsets() {
        assert!(CropSpec::parse_box("10x10+0+0").is_ok());
    }

    #[test]
    fn crop_box_rejects_wrong_token_count() {
        for bad in ["800x600", "800x600+100", "800x600+1+2+3", "", "800+600+1+2+3"] {
            assert!(
                matches!(CropSpec::parse_box(bad), Err(ParseError::InvalidCropBox(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn crop_box_rejects_non_integers() {
        assert!(CropSpec::parse_box("800x600+a+150").is_err());
        assert!(CropSpec::parse_box("800x600+-1+150").is_err());
    }

    #[test]
    fn crop_options_require_exactly_one() {
        assert!(matches!(
            CropSpec::from_options(None, None, None),
            Err(ParseError::MissingOption(_))
        ));
        assert!(matches!(
            CropSpec::from_options(Some("1:1"), Some("1x1+0+0"), None),
            Err(ParseError::ConflictingOptions(_))
        ));
    }

    #[test]
    fn crop_options_ratio_keeps_alignment() {
        let spec = CropSpec::from_options(Some("4:3"), None, Some(Alignment::Bottom)).unwrap();
        assert_eq!(
            spec,
            CropSpec::Ratio {
                ratio: AspectRatio {
                    width: 4,
                    height: 3
                },
                align: Some(Alignment::Bottom),
            }
        );
    }

    // =========================================================================
    // ResizeSpec
    // =========================================================================

    #[test]
    fn resize_options_require_exactly_one() {
        assert!(matches!(
            ResizeSpec::from_options(None, None),
            Err(ParseError::MissingOption(_))
        ));
        assert!(matches!(
            ResizeSpec::from_options(Some("10x10"), Some(0.5)),
            Err(ParseError::ConflictingOptions(_))
        ));
    }

    #[test]
    fn resize_options_size() {
        assert_eq!(
            ResizeSpec::from_options(Some("320x200"), None).unwrap(),
            ResizeSpec::Size(Dimensions::new(320, 200))
        );
    }

    #[test]
    fn resize_options_reject_bad_scale() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(ResizeSpec::from_options(None, Some(bad)).is_err());
        }
        assert_eq!(
            ResizeSpec::from_options(None, Some(2.0)).unwrap(),
            ResizeSpec::Scale(2.0)
        );
    }
}
