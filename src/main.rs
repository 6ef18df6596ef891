use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use cgpkit::config::{Cli, Command};
use cgpkit::types::Transform;
use cgpkit::{
    compare, connector, dataset, label_config, plot, project_refs, report, sort_classes, spreadsheet, transform,
};

fn run(cli: Cli) -> cgpkit::Result<()> {
    match cli.command {
        Command::LabelConfig(args) => label_config::write_config(&args.csv_file, &args.output, args.seed)?,
        Command::ReportHtml(args) => {
            report::generate_html(&args.results_dir, &args.report_dir)?;
        }
        Command::ReportTex(args) => {
            report::generate_tex(&args.results_dir, &args.report_dir)?;
        }
        Command::Connect(args) => connector::run_console(&args.endpoint, &args.data)?,
        Command::XlsToCsv(args) => {
            let out_dir = args.output_dir.unwrap_or_else(|| args.input_dir.join("csv"));
            let converted = spreadsheet::convert_directory(&args.input_dir, &out_dir, &args.extension)?;
            info!("Converted {} spreadsheets.", converted);
        }
        Command::Exp10(args) => {
            let rows = spreadsheet::exp10(&args.input, &args.output)?;
            info!("Wrote {} rows to {}", rows, args.output.display());
        }
        Command::Plot(args) => {
            plot::plot_errors(&args.frequency, &args.errors, &args.output_dir, &args.modes)?;
        }
        Command::FixRefs(args) => {
            let replaced = project_refs::fix_references(&args.root, &args.halcon_root)?;
            info!("Replaced {} Halcon hint paths.", replaced);
        }
        Command::SortClasses(args) => {
            let output = args
                .output_dir
                .unwrap_or_else(|| sort_classes::default_output_dir(&args.input_dir));
            sort_classes::sort_by_class(&args.input_dir, &output)?;
        }
        Command::Split(args) => {
            dataset::process_split(&args)?;
        }
        Command::Transform(args) => {
            let requested = Transform {
                crop_regions: args.crop_regions != 0,
                resize: (args.resize != 0.0).then_some(args.resize),
                split: (args.split != 0).then_some(args.split),
            };
            let written =
                transform::process_transform(&args.data_directory, &args.transform_results_directory, &requested)?;
            info!("Wrote {} image/label pairs.", written);
        }
        Command::Compare(args) => {
            compare::process_compare(&args)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
