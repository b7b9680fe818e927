//! # pix
//!
//! Batch image conversion, resizing, cropping, and pruning for a single file
//! or a whole directory.
//!
//! # Architecture: Pure Decisions, One Codec Seam
//!
//! Every command is a thin driver over pure functions. The drivers decide
//! what to do with each file (which output path, which crop box, which size,
//! whether to delete); the actual pixel work goes through the
//! [`imaging::ImageBackend`] trait:
//!
//! ```text
//! input ─┬─ file ──────────────┐
//!        └─ dir ─ list, sort, ─┤
//!                 filter       ▼
//!          paths + geometry + prune  (pure)
//!                              │
//!                              ▼
//!                     ImageBackend  (image crate, or a mock in tests)
//!                              │
//!                              ▼
//!                  FileOutcome ─► event channel + BatchReport
//! ```
//!
//! This keeps the interesting logic (crop boxes, scale rounding, overwrite
//! policy, naming) testable without encoding a single image.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`formats`] | The eight supported formats and extension classification |
//! | [`types`] | Parsed option values: sizes, ratios, crop boxes, alignments |
//! | [`paths`] | Output naming, prefix/surfix decoration, overwrite policy |
//! | [`imaging`] | Geometry, backend trait, `image`-crate backend, single-image operations |
//! | [`prune`] | Minimum-resolution decision |
//! | [`batch`] | Convert, resize, crop, and prune drivers with per-file outcomes |
//! | [`caption`] | Caption orchestration over an external model and metadata writer |
//! | [`config`] | `pix.toml` loading, validation, and merging over stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Per-File Failures Never Stop a Batch
//!
//! A corrupt image in a directory of thousands should cost one line of
//! output, not the run. Only problems with the request itself (a missing
//! input, a directory convert with no target format, an invalid config)
//! abort, and they do so before any file is touched.
//!
//! ## Case-Sensitive Extensions
//!
//! Extensions are matched exactly as written; `jpg` is the only alias.
//! `photo.JPG` is not picked up by directory commands.
//!
//! ## Already-Converted Files Are Copied
//!
//! When a directory convert meets a file that is already in the target
//! format, it copies the file into the output directory instead of
//! re-encoding it, so no generation loss is introduced.

pub mod batch;
pub mod caption;
pub mod config;
pub mod formats;
pub mod imaging;
pub mod output;
pub mod paths;
pub mod prune;
pub mod types;
