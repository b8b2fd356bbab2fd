use clap::Parser;

use log::{error, info};
use std::process::ExitCode;
use std::time::Duration;

use yolo_label_tools::config::{build_keep_set, build_value_mapping};
use yolo_label_tools::{
    convert_names_to_yaml, read_urls, Args, Command, HttpFetcher, ImageDownloader,
    LabelFolderProcessor, Result,
};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run the selected tool; `Ok(false)` means the batch finished with failures
fn run(args: Args) -> Result<bool> {
    match args.command {
        Command::Remap {
            label_dir,
            map,
            mapping_file,
        } => {
            let mapping = build_value_mapping(&map, mapping_file.as_deref())?;
            let processor = LabelFolderProcessor::scan(&label_dir)?;
            info!("Remapping {} class indices...", mapping.len());
            let report = processor.remap_values(&mapping);
            report.print_summary();
            Ok(!report.has_failures())
        }
        Command::Filter { label_dir, keep } => {
            let keep = build_keep_set(&keep);
            let processor = LabelFolderProcessor::scan(&label_dir)?;
            info!("Keeping {} class indices...", keep.len());
            let report = processor.filter_by_index(&keep);
            report.print_summary();
            Ok(!report.has_failures())
        }
        Command::Download {
            input,
            output_dir,
            prefix,
            timeout_secs,
        } => {
            let urls = read_urls(&input)?;
            let fetcher = HttpFetcher::new(Duration::from_secs(timeout_secs))?;
            let report = ImageDownloader::new(urls, &output_dir, &prefix, fetcher).download_all()?;
            report.print_summary();
            Ok(report.failed.is_empty())
        }
        Command::NamesToYaml { input, output } => {
            convert_names_to_yaml(&input, &output)?;
            Ok(true)
        }
    }
}
