use clap::{Parser, Subcommand};
use pix::batch::{
    self, BatchError, BatchEvent, BatchOptions, BatchReport, ConvertOptions, CropOptions,
    PruneOptions, ResizeOptions,
};
use pix::config::{self, PixConfig};
use pix::formats::{FormatSpec, supported_formats_list};
use pix::imaging::{Quality, ResizeFilter, RustBackend};
use pix::output;
use pix::prune::PruneRule;
use pix::types::{Alignment, CropSpec, Dimensions, ResizeSpec};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// Flags shared by every command that writes images.
#[derive(clap::Args, Clone)]
struct WriteArgs {
    /// Input image or directory
    input: PathBuf,

    /// Output image or directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    overwrite: bool,

    /// Output quality (0-100) [config default: 95]
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=100))]
    quality: Option<u32>,
}

#[derive(Parser)]
#[command(name = "pix")]
#[command(about = "Convert, resize, crop, and prune images in bulk")]
#[command(long_about = "\
Convert, resize, crop, and prune images in bulk

Every command takes a single image or a directory. Directories are processed
one level deep, in file-name order. Only files with a supported extension are
picked up (prune considers every file):

  png, jpeg (jpg), webp, avif, heif, tiff, bmp, ico

Existing outputs are never replaced unless --overwrite is given. A file that
fails to decode or encode is reported and the rest of the batch continues.

Defaults come from pix.toml (--config, or ./pix.toml). Run 'pix gen-config'
to print a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file [default: ./pix.toml if present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write a JSON report of every file's outcome
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert images to a different format
    Convert {
        #[command(flatten)]
        io: WriteArgs,

        #[arg(
            short,
            long,
            help = format!("Output format, required for directories [{}]", supported_formats_list())
        )]
        format: Option<FormatSpec>,

        /// Disable encoder optimization
        #[arg(long)]
        no_optimize: bool,

        /// Prefix for the output file name
        #[arg(long)]
        prefix: Option<String>,

        /// Surfix for the output file name
        #[arg(long)]
        surfix: Option<String>,
    },
    /// Resize images
    Resize {
        #[command(flatten)]
        io: WriteArgs,

        /// Output size (WxH)
        #[arg(long, conflicts_with = "scale")]
        size: Option<String>,

        /// Output scale factor (e.g. 0.5)
        #[arg(long)]
        scale: Option<f64>,

        /// Resampling filter [config default: nearest]
        #[arg(long, value_enum)]
        filter: Option<FilterArg>,
    },
    /// Crop images
    Crop {
        #[command(flatten)]
        io: WriteArgs,

        /// Aspect ratio (W:H). Combine with --align
        #[arg(long, conflicts_with = "size")]
        ratio: Option<String>,

        /// Exact size and position as WxH+X+Y (e.g. 800x600+100+150)
        #[arg(long)]
        size: Option<String>,

        /// Alignment for ratio crops (top, bottom, left, right, center)
        #[arg(long)]
        align: Option<Alignment>,
    },
    /// Remove images smaller than a minimum resolution
    Prune {
        /// Input image or directory
        input: PathBuf,

        /// Minimum resolution as WxH
        #[arg(short, long)]
        resolution: Dimensions,

        /// Report what would be removed without deleting anything
        #[arg(long)]
        dry_run: bool,

        /// Comparison rule [config default: both]
        #[arg(long, value_enum)]
        rule: Option<RuleArg>,
    },
    /// Print a stock pix.toml with all options documented
    GenConfig,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum FilterArg {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<FilterArg> for ResizeFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Nearest => ResizeFilter::Nearest,
            FilterArg::Triangle => ResizeFilter::Triangle,
            FilterArg::CatmullRom => ResizeFilter::CatmullRom,
            FilterArg::Gaussian => ResizeFilter::Gaussian,
            FilterArg::Lanczos3 => ResizeFilter::Lanczos3,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum RuleArg {
    Both,
    Lexicographic,
}

impl From<RuleArg> for PruneRule {
    fn from(arg: RuleArg) -> Self {
        match arg {
            RuleArg::Both => PruneRule::Both,
            RuleArg::Lexicographic => PruneRule::Lexicographic,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let cfg = config::load_config(cli.config.as_deref(), Path::new("."))?;
    let backend = RustBackend::new();

    let report = match cli.command {
        Command::Convert {
            io,
            format,
            no_optimize,
            prefix,
            surfix,
        } => {
            let opts = ConvertOptions {
                format,
                prefix: prefix.unwrap_or_else(|| cfg.convert.prefix.clone()),
                surfix: surfix.unwrap_or_else(|| cfg.convert.surfix.clone()),
                quality: Quality::new(io.quality.unwrap_or(cfg.convert.quality)),
                optimize: cfg.convert.optimize && !no_optimize,
            };
            let batch_opts = batch_options(&io, &cfg);
            run_with_printer(|tx| {
                batch::convert(&backend, &io.input, &batch_opts, &opts, Some(tx))
            })?
        }
        Command::Resize {
            io,
            size,
            scale,
            filter,
        } => {
            let opts = ResizeOptions {
                spec: ResizeSpec::from_options(size.as_deref(), scale).map_err(BatchError::from)?,
                filter: filter.map(ResizeFilter::from).unwrap_or(cfg.resize.filter),
                quality: Quality::new(io.quality.unwrap_or(cfg.resize.quality)),
            };
            let batch_opts = batch_options(&io, &cfg);
            run_with_printer(|tx| {
                batch::resize(&backend, &io.input, &batch_opts, &opts, Some(tx))
            })?
        }
        Command::Crop {
            io,
            ratio,
            size,
            align,
        } => {
            let opts = CropOptions {
                spec: CropSpec::from_options(ratio.as_deref(), size.as_deref(), align)
                    .map_err(BatchError::from)?,
                quality: Quality::new(io.quality.unwrap_or(cfg.crop.quality)),
            };
            let batch_opts = batch_options(&io, &cfg);
            run_with_printer(|tx| {
                batch::crop(&backend, &io.input, &batch_opts, &opts, Some(tx))
            })?
        }
        Command::Prune {
            input,
            resolution,
            dry_run,
            rule,
        } => {
            let opts = PruneOptions {
                min_resolution: resolution,
                rule: rule.map(PruneRule::from).unwrap_or(cfg.prune.rule),
                dry_run,
            };
            run_with_printer(|tx| batch::prune(&backend, &input, &opts, Some(tx)))?
        }
        Command::GenConfig => return Ok(()),
    };

    output::print_summary(&report);
    if let Some(path) = &cli.report {
        std::fs::write(path, report.to_json()?)?;
    }
    Ok(())
}

fn batch_options(io: &WriteArgs, cfg: &PixConfig) -> BatchOptions {
    BatchOptions {
        output_dir: io.output.clone(),
        overwrite: io.overwrite || cfg.output.overwrite,
    }
}

/// Run a driver while a printer thread streams its events.
fn run_with_printer<F>(run: F) -> Result<BatchReport, Box<dyn std::error::Error>>
where
    F: FnOnce(Sender<BatchEvent>) -> Result<BatchReport, BatchError>,
{
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_batch_event(&event);
        }
    });
    let result = run(tx);
    printer
        .join()
        .map_err(|_| "output thread panicked".to_string())?;
    Ok(result?)
}
