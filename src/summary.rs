use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::errors::{BgStripError, JobError, Result};
use crate::job::ImageJob;

/// Terminal state of one job.
#[derive(Debug)]
pub enum JobOutcome {
    Success { original_bytes: u64, output_bytes: u64 },
    Skipped(JobError),
    Failed(JobError),
}

impl JobOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "failed",
        }
    }

    pub const fn error(&self) -> Option<&JobError> {
        match self {
            Self::Success { .. } => None,
            Self::Skipped(err) | Self::Failed(err) => Some(err),
        }
    }
}

#[derive(Debug)]
pub struct ProcessingResult {
    pub job: ImageJob,
    pub outcome: JobOutcome,
}

/// Outcomes of one batch run, in job order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub results: Vec<ProcessingResult>,
}

impl BatchSummary {
    pub fn push(&mut self, job: ImageJob, outcome: JobOutcome) {
        self.results.push(ProcessingResult { job, outcome });
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Success { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&JobOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn is_clean(&self) -> bool {
        self.succeeded() == self.total()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Processed: {} | Failed: {} | Skipped: {}",
            self.succeeded(),
            self.failed(),
            self.skipped()
        )
    }

    /// Every job that did not succeed, in job order.
    pub fn failures(&self) -> impl Iterator<Item = &ProcessingResult> {
        self.results.iter().filter(|r| !r.outcome.is_success())
    }

    pub fn to_report(&self) -> BatchReport<'_> {
        BatchReport {
            total: self.total(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            skipped: self.skipped(),
            jobs: self
                .results
                .iter()
                .map(|r| JobReport {
                    source: &r.job.source,
                    destination: &r.job.destination,
                    outcome: r.outcome.label(),
                    error_kind: r.outcome.error().map(JobError::kind),
                    error: r.outcome.error().map(ToString::to_string),
                    original_bytes: match r.outcome {
                        JobOutcome::Success { original_bytes, .. } => Some(original_bytes),
                        _ => None,
                    },
                    output_bytes: match r.outcome {
                        JobOutcome::Success { output_bytes, .. } => Some(output_bytes),
                        _ => None,
                    },
                })
                .collect(),
        }
    }

    /// Write the full per-job log as pretty JSON.
    pub fn write_report(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_report()).map_err(|e| {
            BgStripError::Configuration {
                message: format!("failed to serialize report: {}", e),
            }
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| BgStripError::FileSystem {
                path: parent.to_path_buf(),
                operation: "create report directory".to_string(),
                source: e,
            })?;
        }

        fs::write(path, json).map_err(|e| BgStripError::FileSystem {
            path: path.to_path_buf(),
            operation: "write report".to_string(),
            source: e,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct BatchReport<'a> {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub jobs: Vec<JobReport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JobReport<'a> {
    pub source: &'a Path,
    pub destination: &'a Path,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_bytes: Option<u64>,
}

/// `12.3KB` style size for progress lines.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= MB {
        format!("{:.1}MB", bytes / MB)
    } else {
        format!("{:.1}KB", bytes / KB)
    }
}
