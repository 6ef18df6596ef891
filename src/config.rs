use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

/// Batch utilities for CGP image-optimization experiments.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a Label Studio time-series config from a CSV header
    LabelConfig(LabelConfigArgs),
    /// Build an HTML report from a results directory
    ReportHtml(ReportArgs),
    /// Build a LaTeX report from a results directory
    ReportTex(ReportArgs),
    /// Interactive request/reply client
    Connect(ConnectArgs),
    /// Convert every spreadsheet in a directory to CSV
    XlsToCsv(XlsToCsvArgs),
    /// Replace the first column of a CSV file by 10^x
    Exp10(Exp10Args),
    /// Plot percent-error series over frequency
    Plot(PlotArgs),
    /// Point Halcon references of all C# projects at the Halcon root
    FixRefs(FixRefsArgs),
    /// Split a region-marker dataset into one dataset per class
    SortClasses(SortClassesArgs),
    /// Split an images/labels dataset into train, val and test sets
    Split(SplitArgs),
    /// Crop, resize or tile images/labels pairs
    Transform(TransformArgs),
    /// Compare best-fitness logs of two result versions
    Compare(CompareArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LabelConfigArgs {
    /// CSV file whose header names the time column and the channels
    pub csv_file: PathBuf,

    /// Destination of the generated config
    #[arg(short, long, default_value = "label_studio_config.xml")]
    pub output: PathBuf,

    /// Seed for the channel colours; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Directory holding one sub-directory per test batch
    #[arg(default_value = "results")]
    pub results_dir: PathBuf,

    /// Directory the report is written to
    #[arg(default_value = "report")]
    pub report_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Server endpoint, `host:port` with optional `tcp://` prefix
    #[arg(long, default_value = "tcp://localhost:5555")]
    pub endpoint: String,

    /// Data sent along with every job
    #[arg(long, default_value = "")]
    pub data: String,
}

#[derive(Args, Debug, Clone)]
pub struct XlsToCsvArgs {
    /// Directory to scan for .xls/.xlsx files
    #[arg(default_value = ".")]
    pub input_dir: PathBuf,

    /// Output directory, `<input_dir>/csv` by default
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Extension of the written files
    #[arg(long, default_value = "csv")]
    pub extension: String,
}

#[derive(Args, Debug, Clone)]
pub struct Exp10Args {
    /// CSV file whose first column holds decimal exponents
    pub input: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "10.txt")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct PlotArgs {
    /// File whose first row holds the frequencies
    #[arg(long, default_value = "frequency.txt")]
    pub frequency: PathBuf,

    /// File with one error series per row
    #[arg(long, default_value = "pipelinePercentError.txt")]
    pub errors: PathBuf,

    /// Directory the charts are written to
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Chart kinds to render
    #[arg(long, value_enum, use_value_delimiter = true, default_values_t = [PlotMode::SemilogX, PlotMode::LogLog])]
    pub modes: Vec<PlotMode>,
}

// Axis scaling of the error plots
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum PlotMode {
    /// Logarithmic frequency, linear error
    SemilogX,
    /// Logarithmic frequency, symmetric-log error
    LogLog,
    /// Logarithmic frequency with decade ticks, symmetric-log error
    SemilogY,
}

impl PlotMode {
    pub fn file_stem(&self) -> &'static str {
        match self {
            PlotMode::SemilogX => "semilogX",
            PlotMode::LogLog => "loglog",
            PlotMode::SemilogY => "semilogY",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct FixRefsArgs {
    /// Solution directory whose sub-directories hold the projects
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Replacement root of the Halcon installation
    #[arg(long, default_value = "$(HALCONROOT)")]
    pub halcon_root: String,
}

#[derive(Args, Debug, Clone)]
pub struct SortClassesArgs {
    /// Dataset in region-marker format (`images/`, `regions/`)
    pub input_dir: PathBuf,

    /// Output directory, `<input>_split_and_sorted` next to the input by default
    pub output_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    /// Dataset in images/labels format
    pub input_dir: PathBuf,

    /// Directory receiving train/val/test and the N-shot experiments
    pub output_dir: PathBuf,

    /// Proportion of the dataset to use for validation
    #[arg(long = "val_size", default_value_t = 0.2, value_parser = validate_size)]
    pub val_size: f32,

    /// Proportion of the dataset to use for testing
    #[arg(long = "test_size", default_value_t = 0.2, value_parser = validate_size)]
    pub test_size: f32,

    /// Seed for random shuffling
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,

    /// Sizes of the small training subsets
    #[arg(long, use_value_delimiter = true, default_values_t = [1, 3, 5, 10, 25, 50])]
    pub shot_sizes: Vec<usize>,

    /// Independent runs drawn per subset size
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub runs: u32,
}

#[derive(Args, Debug, Clone)]
pub struct TransformArgs {
    /// Dataset in images/labels format
    pub data_directory: PathBuf,

    /// Directory receiving the transformed images/labels
    pub transform_results_directory: PathBuf,

    /// Cut every image into this many vertical tiles (0 disables)
    #[arg(long, default_value_t = 0)]
    pub split: u32,

    /// Crop around the regions of interest: 0 or 1
    #[arg(long = "crop-regions", visible_alias = "cropRegions", default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub crop_regions: u8,

    /// Resize every image by this factor (0 disables)
    #[arg(long, default_value_t = 0.0, value_parser = validate_factor)]
    pub resize: f32,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Directory holding one sub-directory per version
    pub data_dir: PathBuf,

    /// Directory receiving `CompareResults`
    pub results_dir: PathBuf,

    /// First version (e.g. a commit hash)
    pub version_a: String,

    /// Second version
    pub version_b: String,

    /// Runs recorded per image in `overview.txt`
    #[arg(long, default_value_t = 5)]
    pub iterations: usize,
}

// Validate that the size is between 0.0 and 1.0
pub fn validate_size(s: &str) -> Result<f32, String> {
    match f32::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("SIZE must be between 0.0 and 1.0".to_string()),
    }
}

// Zero disables resizing, anything else must be a positive factor
pub fn validate_factor(s: &str) -> Result<f32, String> {
    match f32::from_str(s) {
        Ok(val) if val >= 0.0 && val.is_finite() => Ok(val),
        _ => Err("FACTOR must be a non-negative number".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_validate_size() {
        assert!(validate_size("0.5").is_ok());
        assert!(validate_size("1.0").is_ok());
        assert!(validate_size("0.0").is_ok());
        assert!(validate_size("-0.1").is_err());
        assert!(validate_size("1.1").is_err());
        assert!(validate_size("abc").is_err());
    }

    #[test]
    fn test_validate_factor() {
        assert_eq!(validate_factor("0.8"), Ok(0.8));
        assert!(validate_factor("-1").is_err());
        assert!(validate_factor("inf").is_err());
    }

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_transform_flags() {
        let cli = Cli::parse_from([
            "cgpkit", "transform", "in", "out", "--split", "4", "--cropRegions", "1",
        ]);
        match cli.command {
            Command::Transform(args) => {
                assert_eq!(args.split, 4);
                assert_eq!(args.crop_regions, 1);
                assert_eq!(args.resize, 0.0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
