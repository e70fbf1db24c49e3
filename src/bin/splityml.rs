//! Splits a multi-document YAML stream into per-site files

use anyhow::Context;
use clap::Parser;
use ngx2yml::{BatchConfig, DirectorySink, logging, split_stream};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "splityml")]
#[command(about = "Split a merged YAML stream into one file per site")]
struct Cli {
    /// Stream to read, `-` for stdin
    stream: PathBuf,

    /// Directory for the site files
    output_dir: PathBuf,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init();

    let config = BatchConfig::default();
    let mut sink = DirectorySink::new(&cli.output_dir, &config.output_extension)
        .context("cannot prepare output directory")?;

    let report = if cli.stream.as_os_str() == "-" {
        split_stream(io::stdin().lock(), &cli.stream, &mut sink)?
    } else {
        let file = File::open(&cli.stream)
            .with_context(|| format!("cannot open {}", cli.stream.display()))?;
        split_stream(file, &cli.stream, &mut sink)?
    };

    info!(
        "{} documents split, {} sites written to {}",
        report.converted,
        report.sites,
        cli.output_dir.display()
    );
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
