use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use pdf_batch_rs::prelude::*;
use pdf_batch_rs::reporting::init_logging;
use pdf_batch_rs::reporting::logging::DEFAULT_LOG_FILE;

#[derive(Parser)]
#[command(name = "pdf_batch_rs")]
#[command(about = "Batch PDF tools: first-image blur scoring and per-directory merging", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score the first image of every PDF under DIRECTORY (recursively) and
    /// export the scores to DIRECTORY/export_*.csv
    Scan {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Merge the PDFs of every subdirectory of DIRECTORY into
    /// DIRECTORY/exports/<subdirectory>.pdf, in file name order
    Merge {
        #[command(flatten)]
        common: CommonArgs,

        /// Skip files whose name contains this text (case-insensitive)
        #[arg(long, default_value = MergeConfig::DEFAULT_EXCLUSION_MARKER)]
        exclude: String,

        /// Name of the output directory created under DIRECTORY
        #[arg(long, default_value = MergeConfig::DEFAULT_OUTPUT_DIR_NAME)]
        output_dir_name: String,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Directory containing the PDF files
    directory: PathBuf,

    /// Print debug messages on the console
    #[arg(short, long)]
    verbose: bool,

    /// Run in batch mode (no progress bar)
    #[arg(long)]
    batch: bool,

    /// Log file (appended to)
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let common = match &cli.command {
        Command::Scan { common } | Command::Merge { common, .. } => common,
    };
    let mut observer = ConsoleObserver::new(common.batch);
    let console = observer.log_writer(std::io::stderr);
    if let Err(e) = init_logging(&common.log_file, common.verbose, console) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    // Printed once, by the console log layer
    match run(cli.command, &mut observer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, observer: &mut ConsoleObserver) -> Result<()> {
    let interrupt = Interrupt::install()?;

    match command {
        Command::Scan { common } => {
            let config = ScanConfig::new(common.directory);
            run_scan(&config, observer, &interrupt).map(|_| ())
        }
        Command::Merge {
            common,
            exclude,
            output_dir_name,
        } => {
            let config = MergeConfig::new(common.directory)
                .with_exclusion_marker(exclude)
                .with_output_dir_name(output_dir_name);
            run_merge(&config, observer, &interrupt).map(|_| ())
        }
    }
}
