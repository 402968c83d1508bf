use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::errors::JobError;
use crate::imageops::normalize_to_rgba_png;
use crate::job::ImageJob;
use crate::summary::{format_size, BatchSummary, JobOutcome};
use crate::traits::BackgroundRemover;

/// How progress is shown on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// Progress bar plus per-job lines.
    #[default]
    Bar,
    /// Per-job lines only.
    Lines,
    /// Nothing but what the caller prints.
    Quiet,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
    /// Re-encode remover output as RGBA8 PNG before writing.
    pub normalize_rgba: bool,
    /// Permit jobs whose destination is their own source.
    pub allow_overwrite: bool,
    pub progress: ProgressMode,
}

/// Sequential read -> remove background -> write driver.
///
/// Each job gets exactly one attempt. A failing job is recorded and the batch
/// moves on.
pub struct BatchImageProcessor<R: BackgroundRemover> {
    remover: R,
    options: ProcessorOptions,
}

impl<R: BackgroundRemover> BatchImageProcessor<R> {
    pub const fn new(remover: R, options: ProcessorOptions) -> Self {
        Self { remover, options }
    }

    pub fn remover(&self) -> &R {
        &self.remover
    }

    pub fn run(&self, jobs: &[ImageJob]) -> BatchSummary {
        info!(
            jobs = jobs.len(),
            remover = self.remover.name(),
            normalize_rgba = self.options.normalize_rgba,
            "batch started"
        );

        let console = Console::new(self.options.progress, jobs.len());
        let mut summary = BatchSummary::default();

        for job in jobs {
            console.line(format!("Processing: {}", job.source.display()));
            let outcome = self.process_job(job);

            match &outcome {
                JobOutcome::Success {
                    original_bytes,
                    output_bytes,
                } => console.line(format!(
                    "  Saved: {} (original {} -> transparent {})",
                    job.destination.display(),
                    format_size(*original_bytes),
                    format_size(*output_bytes)
                )),
                JobOutcome::Skipped(err) => {
                    warn!(source = %job.source.display(), "job skipped");
                    console.line(format!("  Skipped: {}", err));
                }
                JobOutcome::Failed(err) => {
                    warn!(source = %job.source.display(), kind = err.kind(), error = %err, "job failed");
                    console.line(format!(
                        "  Error processing {}: {}",
                        job.source.display(),
                        err
                    ));
                }
            }

            console.advance();
            summary.push(job.clone(), outcome);
        }

        console.finish();
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            "batch finished"
        );
        summary
    }

    /// One attempt at one job.
    pub fn process_job(&self, job: &ImageJob) -> JobOutcome {
        if job.is_in_place() && !self.options.allow_overwrite {
            return JobOutcome::Failed(JobError::OverwriteRefused {
                path: job.source.clone(),
            });
        }

        if !job.source.exists() {
            return JobOutcome::Skipped(JobError::SourceNotFound {
                path: job.source.clone(),
            });
        }

        match self.transform_and_write(job) {
            Ok((original_bytes, output_bytes)) => JobOutcome::Success {
                original_bytes,
                output_bytes,
            },
            Err(err) => JobOutcome::Failed(err),
        }
    }

    fn transform_and_write(&self, job: &ImageJob) -> Result<(u64, u64), JobError> {
        let input = fs::read(&job.source).map_err(|e| JobError::Read {
            path: job.source.clone(),
            source: e,
        })?;
        debug!(source = %job.source.display(), bytes = input.len(), "source read");

        let mut output =
            self.remover
                .remove_background(&input)
                .map_err(|e| JobError::Transform {
                    path: job.source.clone(),
                    source: e,
                })?;

        if self.options.normalize_rgba {
            output = normalize_to_rgba_png(&output).map_err(|e| JobError::Transform {
                path: job.source.clone(),
                source: e,
            })?;
        }
        debug!(bytes = output.len(), "background removed");

        write_output(&job.destination, &output)?;

        Ok((input.len() as u64, output.len() as u64))
    }
}

fn write_output(destination: &Path, bytes: &[u8]) -> Result<(), JobError> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| JobError::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(destination, bytes).map_err(|e| JobError::Write {
        path: destination.to_path_buf(),
        source: e,
    })?;
    debug!(destination = %destination.display(), "output written");
    Ok(())
}

/// Per-job lines and an optional progress bar that does not tear them.
struct Console {
    mode: ProgressMode,
    bar: Option<ProgressBar>,
}

impl Console {
    fn new(mode: ProgressMode, len: usize) -> Self {
        let bar = (mode == ProgressMode::Bar).then(|| {
            let bar = ProgressBar::new(len as u64);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });
        Self { mode, bar }
    }

    fn line(&self, message: String) {
        match (&self.bar, self.mode) {
            (_, ProgressMode::Quiet) => {}
            (Some(bar), _) if !bar.is_hidden() => bar.println(message),
            _ => println!("{}", message),
        }
    }

    fn advance(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockBackgroundRemover;
    use tempfile::TempDir;

    fn quiet() -> ProcessorOptions {
        ProcessorOptions {
            progress: ProgressMode::Quiet,
            ..ProcessorOptions::default()
        }
    }

    #[test]
    fn test_missing_source_is_skipped() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let job = ImageJob::new(
            temp_dir.path().join("missing.png"),
            temp_dir.path().join("out/missing.png"),
        );

        let processor = BatchImageProcessor::new(MockBackgroundRemover::new(), quiet());
        let outcome = processor.process_job(&job);

        assert!(matches!(
            outcome,
            JobOutcome::Skipped(JobError::SourceNotFound { .. })
        ));
        assert!(!job.destination.exists());
        assert_eq!(processor.remover().calls(), 0);
        Ok(())
    }

    #[test]
    fn test_success_reports_sizes() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.png");
        fs::write(&source, b"0123456789")?;
        let job = ImageJob::new(&source, temp_dir.path().join("deep/nested/a_clean.png"));

        let processor = BatchImageProcessor::new(MockBackgroundRemover::new(), quiet());
        match processor.process_job(&job) {
            JobOutcome::Success {
                original_bytes,
                output_bytes,
            } => {
                assert_eq!(original_bytes, 10);
                assert_eq!(output_bytes, 10);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(fs::read(&job.destination)?, b"0123456789");
        Ok(())
    }

    #[test]
    fn test_transform_failure_writes_nothing() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("bad.png");
        fs::write(&source, b"BAD bytes")?;
        let job = ImageJob::new(&source, temp_dir.path().join("out/bad.png"));

        let processor =
            BatchImageProcessor::new(MockBackgroundRemover::failing_on(&b"BAD"[..]), quiet());
        let outcome = processor.process_job(&job);

        assert!(matches!(
            outcome,
            JobOutcome::Failed(JobError::Transform { .. })
        ));
        assert!(!job.destination.exists());
        Ok(())
    }

    #[test]
    fn test_directory_source_is_read_failure() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("not_a_file.png");
        fs::create_dir_all(&source)?;
        let job = ImageJob::new(&source, temp_dir.path().join("out.png"));

        let processor = BatchImageProcessor::new(MockBackgroundRemover::new(), quiet());
        assert!(matches!(
            processor.process_job(&job),
            JobOutcome::Failed(JobError::Read { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_unwritable_destination_is_write_failure() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.png");
        fs::write(&source, b"data")?;
        // a file where the output directory should be
        let blocker = temp_dir.path().join("blocked");
        fs::write(&blocker, b"")?;
        let job = ImageJob::new(&source, blocker.join("a.png"));

        let processor = BatchImageProcessor::new(MockBackgroundRemover::new(), quiet());
        assert!(matches!(
            processor.process_job(&job),
            JobOutcome::Failed(JobError::Write { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_in_place_requires_opt_in() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("logo.png");
        fs::write(&source, b"original")?;
        let job = ImageJob::new(&source, &source);

        let refusing = BatchImageProcessor::new(MockBackgroundRemover::new(), quiet());
        assert!(matches!(
            refusing.process_job(&job),
            JobOutcome::Failed(JobError::OverwriteRefused { .. })
        ));
        assert_eq!(refusing.remover().calls(), 0);

        let allowing = BatchImageProcessor::new(
            MockBackgroundRemover::new(),
            ProcessorOptions {
                allow_overwrite: true,
                ..quiet()
            },
        );
        assert!(allowing.process_job(&job).is_success());
        assert_eq!(fs::read(&source)?, b"original");
        Ok(())
    }

    #[test]
    fn test_in_place_refused_when_spelled_differently() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let assets = temp_dir.path().join("assets");
        fs::create_dir_all(&assets)?;
        let source = assets.join("logo.png");
        fs::write(&source, b"original")?;
        let job = ImageJob::new(&source, temp_dir.path().join("assets/../assets/logo.png"));

        let processor = BatchImageProcessor::new(MockBackgroundRemover::new(), quiet());
        assert!(matches!(
            processor.process_job(&job),
            JobOutcome::Failed(JobError::OverwriteRefused { .. })
        ));
        assert_eq!(processor.remover().calls(), 0);
        assert_eq!(fs::read(&source)?, b"original");
        Ok(())
    }

    #[test]
    fn test_normalize_rejects_non_image_output() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("a.png");
        fs::write(&source, b"not really a png")?;
        let job = ImageJob::new(&source, temp_dir.path().join("a_clean.png"));

        let processor = BatchImageProcessor::new(
            MockBackgroundRemover::new(),
            ProcessorOptions {
                normalize_rgba: true,
                ..quiet()
            },
        );
        assert!(matches!(
            processor.process_job(&job),
            JobOutcome::Failed(JobError::Transform { .. })
        ));
        Ok(())
    }
}
