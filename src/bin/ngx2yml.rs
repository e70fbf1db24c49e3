//! Converts a directory of Nginx `conf.d` files into per-site YAML documents

use anyhow::Context;
use clap::Parser;
use ngx2yml::{BatchConfig, BatchReport, DirectorySink, StreamSink, convert_dir, logging};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "ngx2yml")]
#[command(about = "Convert Nginx conf.d files into one YAML document per site")]
struct Cli {
    /// Directory holding the *.conf files
    input_dir: PathBuf,

    /// Directory for the site files; stdout when omitted
    output_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init();

    let config = BatchConfig::default();
    let report = match &cli.output_dir {
        Some(dir) => {
            let mut sink = DirectorySink::new(dir, &config.output_extension)
                .context("cannot prepare output directory")?;
            convert_dir(&cli.input_dir, &config, &mut sink)?
        }
        None => {
            let mut sink = StreamSink::new(io::stdout().lock());
            convert_dir(&cli.input_dir, &config, &mut sink)?
        }
    };

    Ok(finish(&report))
}

fn finish(report: &BatchReport) -> ExitCode {
    info!(
        "{} files converted, {} sites written, {} failures",
        report.converted,
        report.sites,
        report.failures.len()
    );
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
