//! Configuration module.
//!
//! Handles loading, validating, and merging `pix.toml`. Stock defaults are
//! the base layer; a user file overrides only the keys it names, and command
//! line flags override both.
//!
//! ## Config File Location
//!
//! `pix` reads the file passed with `--config`, or `pix.toml` in the current
//! directory if there is one. Without either, the stock defaults apply.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! overwrite = false         # Replace existing output files
//!
//! [convert]
//! quality = 95              # Lossy encoding quality (0-100)
//! optimize = true           # Extra encoder effort for smaller files
//! prefix = ""               # Prepended to every output file stem
//! surfix = ""               # Appended to every output file stem
//!
//! [resize]
//! filter = "nearest"        # nearest, triangle, catmull-rom, gaussian, lanczos3
//! quality = 95
//!
//! [crop]
//! quality = 95
//!
//! [prune]
//! rule = "both"             # both, lexicographic
//!
//! [caption]
//! max_tokens = 32
//! batch_size = 1
//! temperature = 1.0
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [convert]
//! quality = 80
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::ResizeFilter;
use crate::prune::PruneRule;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "pix.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `pix.toml`.
///
/// All fields have defaults. User files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PixConfig {
    /// Overwrite policy shared by every writing command.
    pub output: OutputConfig,
    pub convert: ConvertConfig,
    pub resize: ResizeConfig,
    pub crop: CropConfig,
    pub prune: PruneConfig,
    /// Generation settings handed to a caption service.
    pub caption: CaptionConfig,
}

impl PixConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (section, quality) in [
            ("convert", self.convert.quality),
            ("resize", self.resize.quality),
            ("crop", self.crop.quality),
        ] {
            if quality > 100 {
                return Err(ConfigError::Validation(format!(
                    "{section}.quality must be 0-100"
                )));
            }
        }
        if self.caption.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "caption.max_tokens must be non-zero".into(),
            ));
        }
        if self.caption.batch_size == 0 {
            return Err(ConfigError::Validation(
                "caption.batch_size must be non-zero".into(),
            ));
        }
        if !(self.caption.temperature.is_finite() && self.caption.temperature > 0.0) {
            return Err(ConfigError::Validation(
                "caption.temperature must be a positive number".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub overwrite: bool,
}

/// Format conversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Lossy encoding quality (0-100).
    pub quality: u32,
    /// Spend more encoder effort for smaller files.
    pub optimize: bool,
    pub prefix: String,
    pub surfix: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            quality: 95,
            optimize: true,
            prefix: String::new(),
            surfix: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub filter: ResizeFilter,
    pub quality: u32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            filter: ResizeFilter::default(),
            quality: 95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    pub quality: u32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self { quality: 95 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PruneConfig {
    pub rule: PruneRule,
}

/// Caption generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionConfig {
    pub max_tokens: u32,
    pub batch_size: usize,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            max_tokens: 32,
            batch_size: 1,
            temperature: 1.0,
            seed: None,
            prompt: None,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PixConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

fn read_toml(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load `pix.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `pix.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    read_toml(&config_path).map(Some)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PixConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PixConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective configuration.
///
/// An explicit path must exist. Without one, `pix.toml` in `dir` is used if
/// present. User values are merged on top of stock defaults, unknown keys
/// are rejected, and the result is validated.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<PixConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => Some(read_toml(path)?),
        None => load_raw_config(dir)?,
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `pix.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pix Configuration
# =================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# pix reads the file given with --config, or ./pix.toml if it exists.
# Command line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Replace output files that already exist. When false, existing files are
# reported as skipped and left untouched.
overwrite = false

# ---------------------------------------------------------------------------
# Convert
# ---------------------------------------------------------------------------
[convert]
# Lossy encoding quality (0 = worst, 100 = best). Used by JPEG and AVIF.
quality = 95

# Spend more encoder effort for smaller files (PNG compression, AVIF speed).
optimize = true

# Literal text added before and after each output file stem:
# photo.png -> <prefix>photo<surfix>.webp
prefix = ""
surfix = ""

# ---------------------------------------------------------------------------
# Resize
# ---------------------------------------------------------------------------
[resize]
# Resampling filter: nearest, triangle, catmull-rom, gaussian, lanczos3.
filter = "nearest"
quality = 95

# ---------------------------------------------------------------------------
# Crop
# ---------------------------------------------------------------------------
[crop]
quality = 95

# ---------------------------------------------------------------------------
# Prune
# ---------------------------------------------------------------------------
[prune]
# How an image is compared against the minimum resolution.
#   both          - delete only when width AND height are below the minimum
#   lexicographic - compare (width, height) as a tuple, width first
rule = "both"

# ---------------------------------------------------------------------------
# Caption
# ---------------------------------------------------------------------------
[caption]
# Maximum number of tokens generated per caption.
max_tokens = 32

# Images per inference batch. On CPU, batches above 2 are reduced to 2.
batch_size = 1

# Sampling temperature.
temperature = 1.0

# Fixed seed for reproducible captions.
# seed = 42

# Text the model continues from.
# prompt = "a photograph of"
"##
}
