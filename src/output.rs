//! CLI output formatting for every command.
//!
//! Each formatter is a pure function returning display lines, so output can
//! be tested without capturing stdout. The `print_*` wrappers write them.
//!
//! # Output Format
//!
//! One line per visited file, led by the source path. Writes show the
//! destination after an arrow; everything else states what happened:
//!
//! ```text
//! convert: 4 files in photos/
//! photos/a.png → out/a.webp (webp)
//! photos/b.jpg → out/b.jpg (copied)
//! photos/c.png: skipped, out/c.webp exists (use --overwrite to replace)
//! photos/d.png: failed: Failed to decode photos/d.png: ...
//! convert: 1 converted, 1 copied, 1 skipped, 1 failed
//! ```

use crate::batch::{BatchEvent, BatchReport, FileOutcome, Outcome, SkipReason};

/// Format one file's outcome as a display line.
pub fn format_outcome(entry: &FileOutcome) -> String {
    let source = entry.source.display();
    match &entry.outcome {
        Outcome::Converted { output, format } => {
            format!("{} \u{2192} {} ({})", source, output.display(), format)
        }
        Outcome::Copied { output } => {
            format!("{} \u{2192} {} (copied)", source, output.display())
        }
        Outcome::Resized { output, dimensions } => {
            format!("{} \u{2192} {} ({})", source, output.display(), dimensions)
        }
        Outcome::Cropped { output, crop } => {
            format!("{} \u{2192} {} (box {})", source, output.display(), crop)
        }
        Outcome::Skipped {
            output,
            reason: SkipReason::Exists,
        } => format!(
            "{}: skipped, {} exists (use --overwrite to replace)",
            source,
            output.display()
        ),
        Outcome::Skipped {
            reason: SkipReason::InPlace,
            ..
        } => format!("{}: skipped, already in place", source),
        Outcome::Pruned { dimensions } => format!("{}: removed ({})", source, dimensions),
        Outcome::WouldPrune { dimensions } => {
            format!("{}: would remove ({})", source, dimensions)
        }
        Outcome::Kept { dimensions } => format!("{}: kept ({})", source, dimensions),
        Outcome::Failed { reason } => format!("{}: failed: {}", source, reason),
    }
}

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started {
            operation,
            input,
            file_count,
        } => {
            let noun = if *file_count == 1 { "file" } else { "files" };
            vec![format!(
                "{}: {} {} in {}",
                operation,
                file_count,
                noun,
                input.display()
            )]
        }
        BatchEvent::File(entry) => vec![format_outcome(entry)],
    }
}

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Converted { .. } => "converted",
        Outcome::Copied { .. } => "copied",
        Outcome::Resized { .. } => "resized",
        Outcome::Cropped { .. } => "cropped",
        Outcome::Skipped { .. } => "skipped",
        Outcome::Pruned { .. } => "removed",
        Outcome::WouldPrune { .. } => "would remove",
        Outcome::Kept { .. } => "kept",
        Outcome::Failed { .. } => "failed",
    }
}

const SUMMARY_ORDER: [&str; 9] = [
    "converted",
    "copied",
    "resized",
    "cropped",
    "removed",
    "would remove",
    "kept",
    "skipped",
    "failed",
];

/// Format the closing tally for a finished batch.
pub fn format_summary(report: &BatchReport) -> Vec<String> {
    if report.outcomes.is_empty() {
        return vec![format!("{}: no files", report.operation)];
    }
    let parts: Vec<String> = SUMMARY_ORDER
        .iter()
        .filter_map(|label| {
            let count = report
                .outcomes
                .iter()
                .filter(|o| outcome_label(&o.outcome) == *label)
                .count();
            (count > 0).then(|| format!("{} {}", count, label))
        })
        .collect();
    vec![format!("{}: {}", report.operation, parts.join(", "))]
}

/// Print a batch event, sending failures to stderr.
pub fn print_batch_event(event: &BatchEvent) {
    let is_failure = matches!(event, BatchEvent::File(entry) if entry.outcome.is_failure());
    for line in format_batch_event(event) {
        if is_failure {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

/// Print the summary to stdout.
pub fn print_summary(report: &BatchReport) {
    for line in format_summary(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Operation;
    use crate::formats::FormatSpec;
    use crate::imaging::CropBox;
    use crate::types::Dimensions;
    use std::path::PathBuf;

    fn entry(source: &str, outcome: Outcome) -> FileOutcome {
        FileOutcome {
            source: PathBuf::from(source),
            outcome,
        }
    }

    // =========================================================================
    // Per-file lines
    // =========================================================================

    #[test]
    fn converted_shows_destination_and_format() {
        let line = format_outcome(&entry(
            "in/a.png",
            Outcome::Converted {
                output: PathBuf::from("out/a.webp"),
                format: FormatSpec::Webp,
            },
        ));
        assert_eq!(line, "in/a.png \u{2192} out/a.webp (webp)");
    }

    #[test]
    fn resized_and_cropped_show_geometry() {
        let line = format_outcome(&entry(
            "in/a.png",
            Outcome::Resized {
                output: PathBuf::from("out/a.png"),
                dimensions: Dimensions::new(640, 480),
            },
        ));
        assert_eq!(line, "in/a.png \u{2192} out/a.png (640x480)");

        let line = format_outcome(&entry(
            "in/a.png",
            Outcome::Cropped {
                output: PathBuf::from("out/a.png"),
                crop: CropBox {
                    x0: 100,
                    y0: 150,
                    x1: 900,
                    y1: 750,
                },
            },
        ));
        assert_eq!(line, "in/a.png \u{2192} out/a.png (box (100, 150, 900, 750))");
    }

    #[test]
    fn skipped_explains_overwrite() {
        let line = format_outcome(&entry(
            "in/a.png",
            Outcome::Skipped {
                output: PathBuf::from("out/a.webp"),
                reason: SkipReason::Exists,
            },
        ));
        assert!(line.contains("out/a.webp exists"));
        assert!(line.contains("--overwrite"));
    }

    #[test]
    fn prune_lines_distinguish_dry_run() {
        let dims = Dimensions::new(640, 480);
        assert_eq!(
            format_outcome(&entry("a.png", Outcome::Pruned { dimensions: dims })),
            "a.png: removed (640x480)"
        );
        assert_eq!(
            format_outcome(&entry("a.png", Outcome::WouldPrune { dimensions: dims })),
            "a.png: would remove (640x480)"
        );
        assert_eq!(
            format_outcome(&entry("a.png", Outcome::Kept { dimensions: dims })),
            "a.png: kept (640x480)"
        );
    }

    #[test]
    fn failed_includes_reason() {
        let line = format_outcome(&entry(
            "a.png",
            Outcome::Failed {
                reason: "corrupt".into(),
            },
        ));
        assert_eq!(line, "a.png: failed: corrupt");
    }

    // =========================================================================
    // Events and summary
    // =========================================================================

    #[test]
    fn started_event_counts_files() {
        let lines = format_batch_event(&BatchEvent::Started {
            operation: Operation::Resize,
            input: PathBuf::from("photos"),
            file_count: 1,
        });
        assert_eq!(lines, vec!["resize: 1 file in photos"]);
    }

    #[test]
    fn summary_counts_each_outcome_kind() {
        let report = BatchReport {
            operation: Operation::Convert,
            input: PathBuf::from("in"),
            outcomes: vec![
                entry(
                    "a.png",
                    Outcome::Converted {
                        output: PathBuf::from("a.webp"),
                        format: FormatSpec::Webp,
                    },
                ),
                entry(
                    "b.png",
                    Outcome::Converted {
                        output: PathBuf::from("b.webp"),
                        format: FormatSpec::Webp,
                    },
                ),
                entry(
                    "c.png",
                    Outcome::Failed {
                        reason: "x".into(),
                    },
                ),
                entry(
                    "d.webp",
                    Outcome::Copied {
                        output: PathBuf::from("out/d.webp"),
                    },
                ),
            ],
        };
        assert_eq!(
            format_summary(&report),
            vec!["convert: 2 converted, 1 copied, 1 failed"]
        );
    }

    #[test]
    fn summary_of_empty_batch() {
        let report = BatchReport {
            operation: Operation::Prune,
            input: PathBuf::from("in"),
            outcomes: Vec::new(),
        };
        assert_eq!(format_summary(&report), vec!["prune: no files"]);
    }
}
