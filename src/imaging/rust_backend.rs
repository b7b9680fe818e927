//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, WebP, TIFF, BMP, ICO) | `image::ImageReader` with content sniffing |
//! | Decode (AVIF) | `avif-parse` + `rav1d`, see [`avif`](super::avif) |
//! | Identify (AVIF) | `avif-parse` container metadata |
//! | Resize | `image::DynamicImage::resize_exact` |
//! | Crop | `image::DynamicImage::crop_imm` after an explicit bounds check |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG | `PngEncoder` (best compression when optimizing) |
//! | Encode → WebP | `WebPEncoder::new_lossless` (quality does not apply) |
//! | Encode → AVIF | `AvifEncoder::new_with_speed_quality` (rav1e) |
//! | Encode → TIFF, BMP, ICO | `DynamicImage::write_to` |
//!
//! HEIF is part of the format registry but has no codec here; decoding or
//! encoding it fails per file.

use super::avif;
use super::backend::{BackendError, ImageBackend};
use super::params::{ConvertParams, CropParams, ResizeParams};
use crate::formats::FormatSpec;
use crate::types::Dimensions;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

/// Map a registry format onto the `image` crate's format, where one exists.
fn image_format(format: FormatSpec) -> Option<ImageFormat> {
    match format {
        FormatSpec::Png => Some(ImageFormat::Png),
        FormatSpec::Jpeg => Some(ImageFormat::Jpeg),
        FormatSpec::Webp => Some(ImageFormat::WebP),
        FormatSpec::Avif => Some(ImageFormat::Avif),
        FormatSpec::Tiff => Some(ImageFormat::Tiff),
        FormatSpec::Bmp => Some(ImageFormat::Bmp),
        FormatSpec::Ico => Some(ImageFormat::Ico),
        FormatSpec::Heif => None,
    }
}

/// Registry formats with a pixel decoder compiled in.
///
/// Built once per process. `ImageFormat::reading_enabled()` reports AVIF
/// because the `"avif"` feature compiles its encoder, but AVIF is read
/// through [`avif`](super::avif) instead.
static DECODABLE: LazyLock<Vec<FormatSpec>> = LazyLock::new(|| {
    FormatSpec::ALL
        .into_iter()
        .filter(|f| {
            *f == FormatSpec::Avif || image_format(*f).is_some_and(|fmt| fmt.reading_enabled())
        })
        .collect()
});

/// Registry formats with an encoder compiled in.
static ENCODABLE: LazyLock<Vec<FormatSpec>> = LazyLock::new(|| {
    FormatSpec::ALL
        .into_iter()
        .filter(|f| image_format(*f).is_some_and(|fmt| fmt.writing_enabled()))
        .collect()
});

/// Formats whose pixels this backend can read.
pub fn decodable_formats() -> &'static [FormatSpec] {
    &DECODABLE
}

/// Formats this backend can write.
pub fn encodable_formats() -> &'static [FormatSpec] {
    &ENCODABLE
}

/// Production backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image, sniffing the format from its contents.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    match FormatSpec::classify(path) {
        Some(FormatSpec::Avif) => return avif::decode(path),
        Some(format) if !decodable_formats().contains(&format) => {
            return Err(BackendError::decode(path, format!("no {format} decoder available")));
        }
        _ => {}
    }
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| BackendError::decode(path, e))
}

/// Encode `img` into `path` as `format`.
fn save_image(
    img: &DynamicImage,
    path: &Path,
    format: FormatSpec,
    quality: u32,
    optimize: bool,
) -> Result<(), BackendError> {
    let target = image_format(format).filter(|_| encodable_formats().contains(&format));
    let Some(target) = target else {
        return Err(BackendError::encode(path, format!("no {format} encoder available")));
    };

    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    let quality = quality.clamp(1, 100) as u8;

    let result = match format {
        FormatSpec::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        }
        FormatSpec::Png => {
            let compression = if optimize {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            img.write_with_encoder(PngEncoder::new_with_quality(
                &mut writer,
                compression,
                image::codecs::png::FilterType::Adaptive,
            ))
        }
        FormatSpec::Webp => {
            let pixels = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            pixels.write_with_encoder(WebPEncoder::new_lossless(&mut writer))
        }
        FormatSpec::Avif => {
            let speed = if optimize { 4 } else { 6 };
            img.write_with_encoder(AvifEncoder::new_with_speed_quality(
                &mut writer,
                speed,
                quality,
            ))
        }
        _ => img.write_to(&mut writer, target),
    };

    if let Err(e) = result {
        // Don't leave a truncated file behind
        drop(writer);
        let _ = std::fs::remove_file(path);
        return Err(BackendError::encode(path, e));
    }
    writer.flush()?;
    Ok(())
}

/// Output format for resize and crop follows the output extension.
fn output_format(path: &Path) -> Result<FormatSpec, BackendError> {
    FormatSpec::classify(path).ok_or_else(|| BackendError::UnsupportedOutput(path.to_path_buf()))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        if FormatSpec::classify(path) == Some(FormatSpec::Avif) {
            return avif::identify(path);
        }
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| BackendError::decode(path, e))?;
        Ok(Dimensions::new(width, height))
    }

    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        save_image(
            &rgb,
            &params.output,
            params.format,
            params.quality.value(),
            params.optimize,
        )
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let format = output_format(&params.output)?;
        let img = load_image(&params.source)?;
        let resized = img.resize_exact(
            params.width,
            params.height,
            params.filter.to_filter_type(),
        );
        save_image(&resized, &params.output, format, params.quality.value(), true)
    }

    fn crop(&self, params: &CropParams) -> Result<(), BackendError> {
        let format = output_format(&params.output)?;
        let img = load_image(&params.source)?;
        let dims = Dimensions::new(img.width(), img.height());
        let crop = params.crop;
        if !crop.fits_within(dims) {
            return Err(BackendError::CropOutOfBounds { crop, dims });
        }
        let cropped = img.crop_imm(crop.x0, crop.y0, crop.width(), crop.height());
        save_image(&cropped, &params.output, format, params.quality.value(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::geometry::CropBox;
    use crate::imaging::params::{Quality, ResizeFilter};
    use image::{ImageEncoder, RgbImage, RgbaImage};

    /// Create a small valid JPEG file with the given dimensions.
    fn create_test_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = std::fs::File::create(path).unwrap();
        let writer = BufWriter::new(file);
        JpegEncoder::new(writer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }

    /// Create a small RGBA PNG file with the given dimensions.
    fn create_test_png(path: &Path, width: u32, height: u32) {
        RgbaImage::from_fn(width, height, |x, _| image::Rgba([x as u8, 0, 0, 200]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn capability_tables_cover_everything_but_heif() {
        assert!(!decodable_formats().contains(&FormatSpec::Heif));
        assert!(!encodable_formats().contains(&FormatSpec::Heif));
        for format in [
            FormatSpec::Png,
            FormatSpec::Jpeg,
            FormatSpec::Webp,
            FormatSpec::Avif,
            FormatSpec::Bmp,
        ] {
            assert!(decodable_formats().contains(&format), "{format}");
            assert!(encodable_formats().contains(&format), "{format}");
        }
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!(dims, Dimensions::new(200, 150));
    }

    #[test]
    fn identify_sniffs_content_not_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("mislabelled");
        create_test_png(&tmp.path().join("real.png"), 30, 20);
        std::fs::rename(tmp.path().join("real.png"), &path).unwrap();

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!(dims, Dimensions::new(30, 20));
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn identify_garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "not an image").unwrap();

        let result = RustBackend::new().identify(&path);
        assert!(matches!(result, Err(BackendError::Decode { .. })));
    }

    #[test]
    fn convert_rgba_png_to_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 40, 30);
        let output = tmp.path().join("out.jpeg");

        RustBackend::new()
            .convert(&ConvertParams {
                source,
                output: output.clone(),
                format: FormatSpec::Jpeg,
                quality: Quality::new(80),
                optimize: true,
            })
            .unwrap();

        let decoded = image::open(&output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn convert_jpeg_to_png_and_webp() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 64, 48);
        let backend = RustBackend::new();

        for format in [FormatSpec::Png, FormatSpec::Webp, FormatSpec::Bmp] {
            let output = tmp.path().join(format!("out.{}", format));
            backend
                .convert(&ConvertParams {
                    source: source.clone(),
                    output: output.clone(),
                    format,
                    quality: Quality::default(),
                    optimize: false,
                })
                .unwrap();
            assert_eq!(
                backend.identify(&output).unwrap(),
                Dimensions::new(64, 48),
                "{format}"
            );
        }
    }

    #[test]
    fn convert_to_heif_is_encode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 10, 10);

        let result = RustBackend::new().convert(&ConvertParams {
            source,
            output: tmp.path().join("out.heif"),
            format: FormatSpec::Heif,
            quality: Quality::default(),
            optimize: true,
        });
        assert!(matches!(result, Err(BackendError::Encode { .. })));
    }

    #[test]
    fn convert_corrupt_source_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.png");
        std::fs::write(&source, b"\x89PNG\r\n\x1a\nnot really").unwrap();

        let result = RustBackend::new().convert(&ConvertParams {
            source,
            output: tmp.path().join("out.jpeg"),
            format: FormatSpec::Jpeg,
            quality: Quality::default(),
            optimize: true,
        });
        assert!(matches!(result, Err(BackendError::Decode { .. })));
    }

    #[test]
    fn avif_roundtrip_through_backend() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 48, 32);
        let avif_path = tmp.path().join("middle.avif");
        let backend = RustBackend::new();

        backend
            .convert(&ConvertParams {
                source,
                output: avif_path.clone(),
                format: FormatSpec::Avif,
                quality: Quality::new(80),
                optimize: false,
            })
            .unwrap();
        assert_eq!(backend.identify(&avif_path).unwrap(), Dimensions::new(48, 32));

        // AVIF input decodes for resize and convert alike
        let resized = tmp.path().join("small.png");
        backend
            .resize(&ResizeParams {
                source: avif_path.clone(),
                output: resized.clone(),
                width: 24,
                height: 16,
                filter: ResizeFilter::Triangle,
                quality: Quality::default(),
            })
            .unwrap();
        assert_eq!(backend.identify(&resized).unwrap(), Dimensions::new(24, 16));

        let png = tmp.path().join("back.png");
        backend
            .convert(&ConvertParams {
                source: avif_path,
                output: png.clone(),
                format: FormatSpec::Png,
                quality: Quality::default(),
                optimize: false,
            })
            .unwrap();
        assert_eq!(backend.identify(&png).unwrap(), Dimensions::new(48, 32));
    }

    #[test]
    fn resize_to_exact_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 400, 300);
        let output = tmp.path().join("resized.png");

        let backend = RustBackend::new();
        backend
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 123,
                height: 45,
                filter: ResizeFilter::Nearest,
                quality: Quality::default(),
            })
            .unwrap();

        assert_eq!(backend.identify(&output).unwrap(), Dimensions::new(123, 45));
    }

    #[test]
    fn resize_to_unknown_extension_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 100, 100);

        let result = RustBackend::new().resize(&ResizeParams {
            source,
            output: tmp.path().join("output.gif"),
            width: 50,
            height: 50,
            filter: ResizeFilter::Lanczos3,
            quality: Quality::default(),
        });
        assert!(matches!(result, Err(BackendError::UnsupportedOutput(_))));
    }

    #[test]
    fn crop_within_bounds() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 100, 80);
        let output = tmp.path().join("cropped.png");

        let backend = RustBackend::new();
        backend
            .crop(&CropParams {
                source,
                output: output.clone(),
                crop: CropBox {
                    x0: 10,
                    y0: 20,
                    x1: 60,
                    y1: 80,
                },
                quality: Quality::default(),
            })
            .unwrap();

        assert_eq!(backend.identify(&output).unwrap(), Dimensions::new(50, 60));
        // Column 10 of the source becomes column 0 of the crop
        let cropped = image::open(&output).unwrap().to_rgba8();
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
    }

    #[test]
    fn crop_out_of_bounds_is_not_clamped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 100, 80);
        let output = tmp.path().join("cropped.png");

        let result = RustBackend::new().crop(&CropParams {
            source,
            output: output.clone(),
            crop: CropBox {
                x0: 50,
                y0: 0,
                x1: 150,
                y1: 80,
            },
            quality: Quality::default(),
        });

        assert!(matches!(result, Err(BackendError::CropOutOfBounds { .. })));
        assert!(!output.exists());
    }
}
