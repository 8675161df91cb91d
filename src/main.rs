use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use pixconv::{format_file_size, Cli, RunMode};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let request = cli.into_options().validate()?;

    log::debug!("Conversion request: {:?}", request);

    let report = pixconv::run(&request)?;

    if report.mode == RunMode::Directory || report.succeeded() > 0 {
        log::info!(
            "Done: {} converted, {} failed, {} written to {}",
            report.succeeded(),
            report.failed(),
            format_file_size(report.bytes_written()),
            request.output.display()
        );
    }

    if report.is_failure() {
        if let Some((name, e)) = report
            .items
            .into_iter()
            .find_map(|item| item.result.err().map(|e| (item.name, e)))
        {
            return Err(e).with_context(|| format!("Could not convert {}", name));
        }
    }

    Ok(ExitCode::SUCCESS)
}
