//! Caption orchestration.
//!
//! The captioning model and the EXIF writer live outside this crate. This
//! module gathers the images to caption, keeps the requested batch size
//! within what the device can handle, sends everything to a
//! [`CaptionService`] in one call, and optionally stores each caption through
//! a [`MetadataWriter`].

use crate::batch::{Listed, list_images};
use crate::config::CaptionConfig;
use crate::formats;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Input not found: {0}")]
    NotFound(PathBuf),
    #[error("Caption service failed: {0}")]
    Service(String),
    #[error("Caption service returned {got} captions for {expected} images")]
    CountMismatch { expected: usize, got: usize },
    #[error("Failed to write metadata to {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },
}

/// Generation settings passed to the caption service.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionParams {
    pub max_tokens: u32,
    pub seed: Option<u64>,
    pub temperature: f32,
    pub batch_size: usize,
    pub prompt: Option<String>,
}

impl Default for CaptionParams {
    fn default() -> Self {
        Self {
            max_tokens: 32,
            seed: None,
            temperature: 1.0,
            batch_size: 1,
            prompt: None,
        }
    }
}

impl From<&CaptionConfig> for CaptionParams {
    fn from(config: &CaptionConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            seed: config.seed,
            temperature: config.temperature,
            batch_size: config.batch_size,
            prompt: config.prompt.clone(),
        }
    }
}

/// An image-to-text model.
pub trait CaptionService {
    /// Whether inference runs on a GPU. Decides how large a batch is safe.
    fn uses_gpu(&self) -> bool;

    /// Caption every image, returning one caption per input in input order.
    fn caption(
        &self,
        images: &[PathBuf],
        params: &CaptionParams,
    ) -> Result<Vec<String>, CaptionError>;
}

/// Stores a caption inside an image file.
pub trait MetadataWriter {
    fn set_comment(&self, path: &Path, text: &str) -> Result<(), CaptionError>;
}

/// Why the requested batch size was changed or flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSizeWarning {
    /// Above 2 on CPU; forced down to 2.
    CpuLimited { requested: usize },
    /// Above 8 on GPU; kept, but memory may run out.
    Large { requested: usize },
}

impl fmt::Display for BatchSizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchSizeWarning::CpuLimited { requested } => write!(
                f,
                "Batch size {} is greater than 2 on CPU; using 2. Use a GPU or a smaller batch.",
                requested
            ),
            BatchSizeWarning::Large { requested } => write!(
                f,
                "Batch size {} is greater than 8 and may run out of memory.",
                requested
            ),
        }
    }
}

/// Batch size to actually use, plus a warning when it was adjusted or is risky.
pub fn effective_batch_size(requested: usize, gpu: bool) -> (usize, Option<BatchSizeWarning>) {
    if requested > 2 && !gpu {
        (2, Some(BatchSizeWarning::CpuLimited { requested }))
    } else if requested > 8 {
        (requested, Some(BatchSizeWarning::Large { requested }))
    } else {
        (requested, None)
    }
}

/// Images to caption: the input file itself, or the supported files directly
/// inside a directory, sorted by name. Unsupported files are dropped either
/// way, and so are directory entries that can't be inspected.
pub fn collect_caption_inputs(input: &Path) -> Result<Vec<PathBuf>, CaptionError> {
    if input.is_file() {
        Ok(if formats::is_supported(input) {
            vec![input.to_path_buf()]
        } else {
            Vec::new()
        })
    } else if input.is_dir() {
        Ok(list_images(input)?
            .into_iter()
            .filter_map(|entry| match entry {
                Listed::File(path) => Some(path),
                Listed::Unreadable { .. } => None,
            })
            .collect())
    } else {
        Err(CaptionError::NotFound(input.to_path_buf()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Captioned {
    pub source: PathBuf,
    pub caption: String,
    /// `None` when no writer was given, otherwise the write result.
    pub metadata: Option<Result<(), String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionReport {
    pub batch_size: usize,
    pub warning: Option<BatchSizeWarning>,
    pub captions: Vec<Captioned>,
}

/// Caption everything under `input`.
///
/// A service failure aborts the run, since captions come back as a single
/// batch. Metadata failures are recorded per image.
pub fn caption_images(
    service: &impl CaptionService,
    writer: Option<&dyn MetadataWriter>,
    input: &Path,
    params: &CaptionParams,
) -> Result<CaptionReport, CaptionError> {
    let images = collect_caption_inputs(input)?;
    let (batch_size, warning) = effective_batch_size(params.batch_size, service.uses_gpu());
    if images.is_empty() {
        return Ok(CaptionReport {
            batch_size,
            warning,
            captions: Vec::new(),
        });
    }

    let params = CaptionParams {
        batch_size,
        ..params.clone()
    };
    let texts = service.caption(&images, &params)?;
    if texts.len() != images.len() {
        return Err(CaptionError::CountMismatch {
            expected: images.len(),
            got: texts.len(),
        });
    }

    let captions = images
        .into_iter()
        .zip(texts)
        .map(|(source, caption)| {
            let metadata = writer.map(|w| {
                w.set_comment(&source, &caption)
                    .map_err(|e| e.to_string())
            });
            Captioned {
                source,
                caption,
                metadata,
            }
        })
        .collect();

    Ok(CaptionReport {
        batch_size,
        warning,
        captions,
    })
}
