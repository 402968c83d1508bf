use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{BgStripError, JobError, Result};

/// Default suffix appended to the file stem of generated outputs.
pub const DEFAULT_SUFFIX: &str = "_transparent";

/// Extension of every generated output. Removers emit PNG so alpha survives.
pub const OUTPUT_EXTENSION: &str = "png";

/// One source-to-destination unit of work.
///
/// Built once before the batch starts and consumed by exactly one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl ImageJob {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Derive the destination from `source` using `rule`.
    pub fn with_rule(source: impl Into<PathBuf>, rule: &DestinationRule) -> Result<Self> {
        let source = source.into();
        let destination = rule.destination_for(&source)?;
        Ok(Self {
            source,
            destination,
        })
    }

    /// True when the job would overwrite its own source file, however the two
    /// paths are spelled.
    pub fn is_in_place(&self) -> bool {
        self.source == self.destination
            || normalized_path(&self.source) == normalized_path(&self.destination)
    }
}

/// Resolve `path` to the file it will actually touch.
///
/// Existing files are canonicalized. A file that does not exist yet is placed
/// under its canonicalized parent. When the parent is missing too, `.` and `..`
/// are folded lexically.
pub fn normalized_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => lexically_normalized(path),
    }
}

fn lexically_normalized(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir
                if matches!(out.components().next_back(), Some(Component::Normal(_))) =>
            {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// How a destination path is derived from a source path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DestinationRule {
    /// `<output_dir or source parent>/<stem><suffix>.png`
    Suffix {
        #[serde(default)]
        output_dir: Option<PathBuf>,
        #[serde(default = "default_suffix")]
        suffix: String,
    },
    /// Overwrite the source. Only allowed when overwriting is opted into.
    InPlace,
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

impl Default for DestinationRule {
    fn default() -> Self {
        Self::Suffix {
            output_dir: None,
            suffix: default_suffix(),
        }
    }
}

impl DestinationRule {
    pub fn suffix_into(output_dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self::Suffix {
            output_dir: Some(output_dir.into()),
            suffix: suffix.into(),
        }
    }

    pub fn destination_for(&self, source: &Path) -> Result<PathBuf> {
        match self {
            Self::InPlace => Ok(source.to_path_buf()),
            Self::Suffix { output_dir, suffix } => {
                let stem = source
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| BgStripError::Validation {
                        field: format!("source {:?}", source),
                        reason: "has no usable file name".to_string(),
                    })?;

                let dir = match output_dir {
                    Some(dir) => dir.clone(),
                    None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
                };

                Ok(dir.join(format!("{}{}.{}", stem, suffix, OUTPUT_EXTENSION)))
            }
        }
    }
}

/// Build one job per source, in the given order.
pub fn plan_jobs<I, P>(sources: I, rule: &DestinationRule) -> Result<Vec<ImageJob>>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    sources
        .into_iter()
        .map(|source| ImageJob::with_rule(source, rule))
        .collect()
}

/// Check a job list before anything touches the disk.
///
/// Paths are compared after [`normalized_path`]. In-place jobs are refused unless
/// `allow_overwrite` is set. A destination that is another job's source is always
/// refused, and no two jobs may write the same destination.
pub fn validate_jobs(jobs: &[ImageJob], allow_overwrite: bool) -> Result<()> {
    let sources: Vec<PathBuf> = jobs.iter().map(|job| normalized_path(&job.source)).collect();

    let mut seen: HashMap<PathBuf, &Path> = HashMap::with_capacity(jobs.len());
    for (job, own_source) in jobs.iter().zip(&sources) {
        let destination = normalized_path(&job.destination);

        if destination == *own_source {
            if !allow_overwrite {
                return Err(BgStripError::Configuration {
                    message: JobError::OverwriteRefused {
                        path: job.source.clone(),
                    }
                    .to_string(),
                });
            }
        } else if let Some(other) = sources.iter().position(|source| *source == destination) {
            return Err(BgStripError::Validation {
                field: format!("destination {:?}", job.destination),
                reason: format!(
                    "of {:?} would overwrite the source of {:?}",
                    job.source, jobs[other].source
                ),
            });
        }

        if let Some(first) = seen.insert(destination, job.source.as_path()) {
            return Err(BgStripError::Validation {
                field: format!("destination {:?}", job.destination),
                reason: format!("is shared by {:?} and {:?}", first, job.source),
            });
        }
    }

    Ok(())
}
