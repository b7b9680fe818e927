//! Output path construction and overwrite policy.
//!
//! Every driver names its outputs the same way: the input's stem, wrapped in
//! an optional prefix and surfix, with the target format's extension, under
//! the output root:
//!
//! - `photo.png` → `out/photo.webp` (convert to webp)
//! - `photo.png` → `out/thumb-photo-small.webp` (prefix `thumb-`, surfix `-small`)
//! - `photo.png` → `out/photo.png` (resize, no target format)

use crate::formats::{self, FormatSpec};
use std::path::{Path, PathBuf};

/// Build the output path for `input` under `output_root`.
///
/// The extension is the target format's name, or the input's own extension
/// as written when no target is given. Creates `output_root` and its parents
/// if they don't exist yet.
pub fn resolve_output_path(
    input: &Path,
    output_root: &Path,
    target: Option<FormatSpec>,
    prefix: &str,
    surfix: &str,
) -> std::io::Result<PathBuf> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let mut name = format!("{prefix}{stem}{surfix}");
    let extension = match target {
        Some(format) => Some(format.name().to_string()),
        None => input
            .extension()
            .map(|e| e.to_string_lossy().into_owned()),
    };
    if let Some(extension) = extension {
        name.push('.');
        name.push_str(&extension);
    }

    std::fs::create_dir_all(output_root)?;
    Ok(output_root.join(name))
}

/// True if `path` may be written: either overwriting is allowed or nothing
/// is there yet.
pub fn should_write(path: &Path, overwrite: bool) -> bool {
    overwrite || !path.exists()
}

/// True if `input` is already encoded in `target`, judged by extension.
pub fn is_already_target(input: &Path, target: FormatSpec) -> bool {
    FormatSpec::classify(input) == Some(target)
}

/// True if a single-file output path names the output file itself rather
/// than a directory to write into.
pub fn explicit_file_target(output: &Path) -> bool {
    formats::is_supported(output) && !output.is_dir()
}

/// Where a single-file operation writes.
///
/// An explicit file target keeps its own name and format (the prefix and
/// surfix still decorate its stem). Anything else is treated as the output
/// directory, and the input's name is used.
pub fn single_file_output(
    input: &Path,
    output: &Path,
    target: Option<FormatSpec>,
    prefix: &str,
    surfix: &str,
) -> std::io::Result<PathBuf> {
    if explicit_file_target(output) {
        let root = output.parent().unwrap_or(Path::new(""));
        resolve_output_path(output, root, None, prefix, surfix)
    } else {
        resolve_output_path(input, output, target, prefix, surfix)
    }
}
