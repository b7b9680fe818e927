//! Batch drivers for convert, resize, crop, and prune.
//!
//! Every driver accepts either a single file or a directory. A directory is
//! processed one level deep: its regular files are visited in file-name
//! order, and for convert, resize, and crop only files with a supported
//! extension are considered. Prune looks at every regular file.
//!
//! ## Failure model
//!
//! Problems with the request itself abort before any file is touched and
//! come back as [`BatchError`]: a missing input, a directory convert without
//! a target format, an output root that is a file. Problems with individual
//! files never abort the run. A file that can't be inspected, decoded,
//! encoded, copied, or deleted is recorded as [`Outcome::Failed`] and the
//! driver moves on. That includes directory entries such as dangling
//! symlinks.
//! Existing destinations are left alone unless overwriting is enabled, and
//! are recorded as [`Outcome::Skipped`].
//!
//! ## Reporting
//!
//! Each driver returns a [`BatchReport`] with one [`FileOutcome`] per visited
//! file, in visiting order. When given a channel, it also streams a
//! [`BatchEvent`] for the start of the run and for every outcome as it
//! happens, so a CLI can print progress while the batch runs.

use crate::formats::{self, FormatSpec};
use crate::imaging::{
    BackendError, CropBox, ImageBackend, ImageRef, Quality, ResizeFilter, convert_image, crop_image,
    resize_image,
};
use crate::paths::{self, resolve_output_path, should_write};
use crate::prune::{PruneRule, should_prune};
use crate::types::{CropSpec, Dimensions, ParseError, ResizeSpec};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid option: {0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Config(String),
    #[error("Input not found: {0}")]
    NotFound(PathBuf),
}

/// Settings shared by every writing driver.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Output directory, or in single-file mode an explicit output file.
    pub output_dir: PathBuf,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Target format. Required for directories; a single file falls back to
    /// its own format.
    pub format: Option<FormatSpec>,
    pub prefix: String,
    pub surfix: String,
    pub quality: Quality,
    pub optimize: bool,
}

#[derive(Debug, Clone)]
pub struct ResizeOptions {
    pub spec: ResizeSpec,
    pub filter: ResizeFilter,
    pub quality: Quality,
}

#[derive(Debug, Clone)]
pub struct CropOptions {
    pub spec: CropSpec,
    pub quality: Quality,
}

#[derive(Debug, Clone)]
pub struct PruneOptions {
    pub min_resolution: Dimensions,
    pub rule: PruneRule,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Convert,
    Resize,
    Crop,
    Prune,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Convert => "convert",
            Operation::Resize => "resize",
            Operation::Crop => "crop",
            Operation::Prune => "prune",
        })
    }
}

/// Why a file produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// The destination exists and overwriting is off.
    Exists,
    /// The destination is the source itself.
    InPlace,
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    Converted { output: PathBuf, format: FormatSpec },
    /// Already in the target format; copied instead of re-encoded.
    Copied { output: PathBuf },
    Resized { output: PathBuf, dimensions: Dimensions },
    Cropped { output: PathBuf, crop: CropBox },
    Skipped { output: PathBuf, reason: SkipReason },
    Pruned { dimensions: Dimensions },
    WouldPrune { dimensions: Dimensions },
    Kept { dimensions: Dimensions },
    Failed { reason: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Progress events streamed while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        operation: Operation,
        input: PathBuf,
        file_count: usize,
    },
    File(FileOutcome),
}

/// Every outcome of one run, in visiting order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub operation: Operation,
    pub input: PathBuf,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_failure()).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Collects outcomes and forwards them to the event channel.
struct Reporter {
    events: Option<Sender<BatchEvent>>,
    report: BatchReport,
}

impl Reporter {
    fn start(
        operation: Operation,
        input: &Path,
        file_count: usize,
        events: Option<Sender<BatchEvent>>,
    ) -> Self {
        if let Some(tx) = &events {
            // A closed receiver only means nobody is listening.
            let _ = tx.send(BatchEvent::Started {
                operation,
                input: input.to_path_buf(),
                file_count,
            });
        }
        Self {
            events,
            report: BatchReport {
                operation,
                input: input.to_path_buf(),
                outcomes: Vec::new(),
            },
        }
    }

    fn record(&mut self, source: &Path, outcome: Outcome) {
        let entry = FileOutcome {
            source: source.to_path_buf(),
            outcome,
        };
        if let Some(tx) = &self.events {
            let _ = tx.send(BatchEvent::File(entry.clone()));
        }
        self.report.outcomes.push(entry);
    }

    fn finish(self) -> BatchReport {
        self.report
    }
}

fn failed(reason: impl ToString) -> Outcome {
    Outcome::Failed {
        reason: reason.to_string(),
    }
}

/// What a driver was pointed at.
enum Input {
    File(PathBuf),
    Directory(PathBuf),
}

fn classify_input(input: &Path) -> Result<Input, BatchError> {
    if input.is_file() {
        Ok(Input::File(input.to_path_buf()))
    } else if input.is_dir() {
        Ok(Input::Directory(input.to_path_buf()))
    } else {
        Err(BatchError::NotFound(input.to_path_buf()))
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Listed {
    /// A regular file, possibly reached through a symlink.
    File(PathBuf),
    /// An entry that couldn't be inspected, such as a dangling symlink.
    Unreadable { path: PathBuf, reason: String },
}

impl Listed {
    pub(crate) fn path(&self) -> &Path {
        match self {
            Listed::File(path) | Listed::Unreadable { path, .. } => path,
        }
    }
}

/// Regular files directly inside `dir`, sorted by name.
///
/// Directories, including symlinks to them, are left out. Entries that can't
/// be inspected are listed as [`Listed::Unreadable`] so each driver can fail
/// them individually; only an unreadable `dir` itself is an error.
fn list_files(dir: &Path) -> std::io::Result<Vec<Listed>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() {
                    files.push(Listed::File(entry.into_path()));
                }
            }
            // A symlink back to an ancestor is a directory
            Err(e) if e.loop_ancestor().is_some() => {}
            Err(e) => match e.path() {
                Some(path) if e.depth() > 0 => files.push(Listed::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }),
                _ => return Err(e.into()),
            },
        }
    }
    files.sort_by(|a, b| a.path().file_name().cmp(&b.path().file_name()));
    Ok(files)
}

/// Entries directly inside `dir` with a supported extension, sorted by name.
pub(crate) fn list_images(dir: &Path) -> std::io::Result<Vec<Listed>> {
    Ok(list_files(dir)?
        .into_iter()
        .filter(|entry| formats::is_supported(entry.path()))
        .collect())
}

fn ensure_output_dir(output_dir: &Path) -> Result<(), BatchError> {
    if output_dir.is_file() {
        return Err(BatchError::Config(format!(
            "output directory {} is an existing file",
            output_dir.display()
        )));
    }
    Ok(())
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// ============================================================================
// Convert
// ============================================================================

/// Re-encode images into another format.
///
/// In directory mode `opts.format` is required. Files already in the target
/// format are copied into the output directory under their own name rather
/// than re-encoded.
pub fn convert(
    backend: &impl ImageBackend,
    input: &Path,
    batch: &BatchOptions,
    opts: &ConvertOptions,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    match classify_input(input)? {
        Input::File(file) => {
            let format = if paths::explicit_file_target(&batch.output_dir) {
                FormatSpec::classify(&batch.output_dir)
            } else {
                opts.format.or_else(|| FormatSpec::classify(&file))
            };
            let Some(format) = format else {
                return Err(BatchError::Config(format!(
                    "cannot tell which format to write for {}; use --format",
                    file.display()
                )));
            };

            let mut reporter = Reporter::start(Operation::Convert, input, 1, events);
            let outcome = match paths::single_file_output(
                &file,
                &batch.output_dir,
                Some(format),
                &opts.prefix,
                &opts.surfix,
            ) {
                Ok(dest) => convert_one(backend, &file, &dest, format, batch.overwrite, opts),
                Err(e) => failed(e),
            };
            reporter.record(&file, outcome);
            Ok(reporter.finish())
        }
        Input::Directory(dir) => {
            let Some(format) = opts.format else {
                return Err(BatchError::Config(
                    "a target format is required when converting a directory; use --format"
                        .to_string(),
                ));
            };
            ensure_output_dir(&batch.output_dir)?;

            let files = list_images(&dir)?;
            let mut reporter = Reporter::start(Operation::Convert, input, files.len(), events);
            for entry in &files {
                let file = match entry {
                    Listed::File(file) => file,
                    Listed::Unreadable { path, reason } => {
                        reporter.record(path, failed(reason));
                        continue;
                    }
                };
                let outcome = if paths::is_already_target(file, format) {
                    copy_one(file, &batch.output_dir, batch.overwrite)
                } else {
                    match resolve_output_path(
                        file,
                        &batch.output_dir,
                        Some(format),
                        &opts.prefix,
                        &opts.surfix,
                    ) {
                        Ok(dest) => {
                            convert_one(backend, file, &dest, format, batch.overwrite, opts)
                        }
                        Err(e) => failed(e),
                    }
                };
                reporter.record(file, outcome);
            }
            Ok(reporter.finish())
        }
    }
}

fn convert_one(
    backend: &impl ImageBackend,
    source: &Path,
    dest: &Path,
    format: FormatSpec,
    overwrite: bool,
    opts: &ConvertOptions,
) -> Outcome {
    if !should_write(dest, overwrite) {
        return Outcome::Skipped {
            output: dest.to_path_buf(),
            reason: SkipReason::Exists,
        };
    }
    let image = ImageRef::new(source);
    match convert_image(backend, &image, dest, format, opts.quality, opts.optimize) {
        Ok(()) => Outcome::Converted {
            output: dest.to_path_buf(),
            format,
        },
        Err(e) => failed(e),
    }
}

/// Copy a file that is already in the target format into `output_dir`,
/// keeping its name.
fn copy_one(source: &Path, output_dir: &Path, overwrite: bool) -> Outcome {
    let Some(name) = source.file_name() else {
        return failed(format!("{} has no file name", source.display()));
    };
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        return failed(e);
    }
    let dest = output_dir.join(name);
    if is_same_file(source, &dest) {
        return Outcome::Skipped {
            output: dest,
            reason: SkipReason::InPlace,
        };
    }
    if !should_write(&dest, overwrite) {
        return Outcome::Skipped {
            output: dest,
            reason: SkipReason::Exists,
        };
    }
    match std::fs::copy(source, &dest) {
        Ok(_) => Outcome::Copied { output: dest },
        Err(e) => failed(e),
    }
}

// ============================================================================
// Resize and crop
// ============================================================================

/// Resize images to a fixed size or by a scale factor.
///
/// Outputs keep the source's name and extension.
pub fn resize(
    backend: &impl ImageBackend,
    input: &Path,
    batch: &BatchOptions,
    opts: &ResizeOptions,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    transform(Operation::Resize, input, batch, events, |image, dest| {
        resize_image(backend, image, dest, &opts.spec, opts.filter, opts.quality).map(
            |dimensions| Outcome::Resized {
                output: dest.to_path_buf(),
                dimensions,
            },
        )
    })
}

/// Crop images by aspect ratio or by an absolute box.
///
/// Boxes that fall outside an image fail for that image only.
pub fn crop(
    backend: &impl ImageBackend,
    input: &Path,
    batch: &BatchOptions,
    opts: &CropOptions,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    transform(Operation::Crop, input, batch, events, |image, dest| {
        crop_image(backend, image, dest, &opts.spec, opts.quality).map(|crop| {
            Outcome::Cropped {
                output: dest.to_path_buf(),
                crop,
            }
        })
    })
}

/// Shared traversal for drivers that write one output per input under the
/// input's own name.
fn transform<F>(
    operation: Operation,
    input: &Path,
    batch: &BatchOptions,
    events: Option<Sender<BatchEvent>>,
    apply: F,
) -> Result<BatchReport, BatchError>
where
    F: Fn(&ImageRef, &Path) -> Result<Outcome, BackendError>,
{
    let (files, single) = match classify_input(input)? {
        Input::File(file) => (vec![Listed::File(file)], true),
        Input::Directory(dir) => {
            ensure_output_dir(&batch.output_dir)?;
            (list_images(&dir)?, false)
        }
    };

    let mut reporter = Reporter::start(operation, input, files.len(), events);
    for entry in &files {
        let file = match entry {
            Listed::File(file) => file,
            Listed::Unreadable { path, reason } => {
                reporter.record(path, failed(reason));
                continue;
            }
        };
        let dest = if single {
            paths::single_file_output(file, &batch.output_dir, None, "", "")
        } else {
            resolve_output_path(file, &batch.output_dir, None, "", "")
        };
        let outcome = match dest {
            Err(e) => failed(e),
            Ok(dest) if !should_write(&dest, batch.overwrite) => Outcome::Skipped {
                output: dest,
                reason: SkipReason::Exists,
            },
            Ok(dest) => apply(&ImageRef::new(file), &dest).unwrap_or_else(failed),
        };
        reporter.record(file, outcome);
    }
    Ok(reporter.finish())
}

// ============================================================================
// Prune
// ============================================================================

/// Delete images below a minimum resolution.
///
/// Every regular file in a directory is considered, whatever its extension.
/// Files whose dimensions can't be read are reported as failures and left
/// in place.
pub fn prune(
    backend: &impl ImageBackend,
    input: &Path,
    opts: &PruneOptions,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    let files = match classify_input(input)? {
        Input::File(file) => vec![Listed::File(file)],
        Input::Directory(dir) => list_files(&dir)?,
    };

    let mut reporter = Reporter::start(Operation::Prune, input, files.len(), events);
    for entry in &files {
        let file = match entry {
            Listed::File(file) => file,
            Listed::Unreadable { path, reason } => {
                reporter.record(path, failed(reason));
                continue;
            }
        };
        let image = ImageRef::new(file);
        let outcome = match image.dimensions(backend) {
            Err(e) => failed(e),
            Ok(dimensions) if !should_prune(dimensions, opts.min_resolution, opts.rule) => {
                Outcome::Kept { dimensions }
            }
            Ok(dimensions) if opts.dry_run => Outcome::WouldPrune { dimensions },
            Ok(dimensions) => match std::fs::remove_file(file) {
                Ok(()) => Outcome::Pruned { dimensions },
                Err(e) => failed(e),
            },
        };
        reporter.record(file, outcome);
    }
    Ok(reporter.finish())
}
