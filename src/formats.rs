//! Supported raster formats and extension classification.
//!
//! The registry is a closed set of eight formats. Classification looks only
//! at the extension string of a path, never at file contents:
//!
//! | Extension | Format |
//! |-----------|--------|
//! | `png` | [`FormatSpec::Png`] |
//! | `jpeg`, `jpg` | [`FormatSpec::Jpeg`] |
//! | `webp` | [`FormatSpec::Webp`] |
//! | `avif` | [`FormatSpec::Avif`] |
//! | `heif` | [`FormatSpec::Heif`] |
//! | `tiff` | [`FormatSpec::Tiff`] |
//! | `bmp` | [`FormatSpec::Bmp`] |
//! | `ico` | [`FormatSpec::Ico`] |
//!
//! Matching is case-sensitive: `photo.JPG` is not a supported file. `jpg` is
//! the only alias.

use crate::types::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// One of the supported raster encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatSpec {
    Png,
    Jpeg,
    Webp,
    Avif,
    Heif,
    Tiff,
    Bmp,
    Ico,
}

impl FormatSpec {
    /// All supported formats, in the order shown to users.
    pub const ALL: [FormatSpec; 8] = [
        FormatSpec::Png,
        FormatSpec::Jpeg,
        FormatSpec::Webp,
        FormatSpec::Avif,
        FormatSpec::Heif,
        FormatSpec::Tiff,
        FormatSpec::Bmp,
        FormatSpec::Ico,
    ];

    /// Canonical name, also used as the output file extension.
    pub fn name(self) -> &'static str {
        match self {
            FormatSpec::Png => "png",
            FormatSpec::Jpeg => "jpeg",
            FormatSpec::Webp => "webp",
            FormatSpec::Avif => "avif",
            FormatSpec::Heif => "heif",
            FormatSpec::Tiff => "tiff",
            FormatSpec::Bmp => "bmp",
            FormatSpec::Ico => "ico",
        }
    }

    /// Look up a format by extension or name. `jpg` maps to `jpeg`.
    fn from_extension(ext: &str) -> Option<Self> {
        let ext = if ext == "jpg" { "jpeg" } else { ext };
        Self::ALL.into_iter().find(|f| f.name() == ext)
    }

    /// Parse a user-supplied format name (`--format`, config files).
    pub fn from_name(name: &str) -> Result<Self, ParseError> {
        Self::from_extension(name).ok_or_else(|| ParseError::UnknownFormat(name.to_string()))
    }

    /// Classify a path by its extension.
    ///
    /// Returns `None` for a missing extension, a non-UTF-8 extension, or
    /// anything outside the supported set.
    pub fn classify(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for FormatSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// True iff the path's extension names a supported format.
pub fn is_supported(path: impl AsRef<Path>) -> bool {
    FormatSpec::classify(path).is_some()
}

/// Comma-separated list of supported format names, for help text.
pub fn supported_formats_list() -> String {
    FormatSpec::ALL
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_every_supported_extension() {
        for format in FormatSpec::ALL {
            let path = format!("image.{}", format.name());
            assert_eq!(FormatSpec::classify(&path), Some(format), "{path}");
        }
    }

    #[test]
    fn jpg_is_an_alias_for_jpeg() {
        assert_eq!(FormatSpec::classify("a.jpg"), Some(FormatSpec::Jpeg));
        assert_eq!(FormatSpec::classify("a.jpeg"), Some(FormatSpec::Jpeg));
    }

    #[test]
    fn extension_matching_is_case_sensitive() {
        assert_eq!(FormatSpec::classify("a.JPG"), None);
        assert_eq!(FormatSpec::classify("a.Png"), None);
        assert!(!is_supported("a.JPEG"));
    }

    #[test]
    fn missing_extension_is_unsupported() {
        assert_eq!(FormatSpec::classify("README"), None);
        assert_eq!(FormatSpec::classify(""), None);
        assert_eq!(FormatSpec::classify(".hidden"), None);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        assert!(!is_supported("notes.txt"));
        assert!(!is_supported("anim.gif"));
        assert!(!is_supported("archive.tar.gz"));
    }

    #[test]
    fn classify_uses_last_extension_only() {
        assert_eq!(FormatSpec::classify("photo.png.webp"), Some(FormatSpec::Webp));
    }

    #[test]
    fn from_name_accepts_jpg() {
        assert_eq!(FormatSpec::from_name("jpg").unwrap(), FormatSpec::Jpeg);
        assert_eq!("webp".parse::<FormatSpec>().unwrap(), FormatSpec::Webp);
    }

    #[test]
    fn from_name_rejects_unknown() {
        assert!(matches!(
            FormatSpec::from_name("gif"),
            Err(ParseError::UnknownFormat(name)) if name == "gif"
        ));
    }

    #[test]
    fn unknown_format_message_lists_supported_formats() {
        let err = FormatSpec::from_name("gif").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported format `gif`: expected one of png, jpeg, webp, avif, heif, tiff, bmp, ico"
        );
    }

    #[test]
    fn display_uses_canonical_name() {
        assert_eq!(FormatSpec::Jpeg.to_string(), "jpeg");
    }

    #[test]
    fn supported_list_matches_registry_order() {
        assert_eq!(
            supported_formats_list(),
            "png, jpeg, webp, avif, heif, tiff, bmp, ico"
        );
    }
}
