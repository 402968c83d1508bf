use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bgstrip::{BatchImageProcessor, Config};

fn main() -> Result<ExitCode> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let jobs = config.plan().context("Failed to plan jobs")?;

    if config.dry_run {
        for job in &jobs {
            let status = if job.source.exists() {
                "ok"
            } else {
                "missing"
            };
            println!(
                "[{}] {} -> {}",
                status,
                job.source.display(),
                job.destination.display()
            );
        }
        println!("Planned {} job(s)", jobs.len());
        return Ok(ExitCode::SUCCESS);
    }

    let processor =
        BatchImageProcessor::with_onnx_model(&config).context("Failed to load model")?;
    let summary = processor.run(&jobs);

    println!("{}", summary.summary_line());
    for result in summary.failures() {
        if let Some(err) = result.outcome.error() {
            eprintln!("  {} ({})", err, err.kind());
        }
    }

    if let Some(path) = &config.report {
        summary
            .write_report(path)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    if config.strict && !summary.is_clean() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
