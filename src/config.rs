use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::errors::{BgStripError, Result};
use crate::job::{plan_jobs, validate_jobs, DestinationRule, ImageJob, DEFAULT_SUFFIX};
use crate::manifest::{known_files, scan_source_dir, JobManifest};
use crate::model::ModelOptions;
use crate::processor::{ProcessorOptions, ProgressMode};

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
#[command(group(
    ArgGroup::new("sources")
        .required(true)
        .args(["manifest", "input_dir"]),
))]
pub struct Config {
    /// JSON manifest listing the jobs
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Directory holding the source images
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Specific file names inside --input-dir; scans the directory when omitted
    #[arg(long, num_args = 1.., requires = "input_dir")]
    pub files: Vec<String>,

    /// How deep to scan --input-dir when no --files are given
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub depth: u16,

    /// Where outputs go; defaults to next to each source
    #[arg(short, long, conflicts_with = "in_place")]
    pub output_dir: Option<PathBuf>,

    /// Appended to the file stem of each output [default: _transparent]
    #[arg(short, long, conflicts_with = "in_place", value_parser = check_suffix)]
    pub suffix: Option<String>,

    /// Overwrite each source with its result
    #[arg(long)]
    pub in_place: bool,

    /// Required for any job that writes over its own source
    #[arg(long)]
    pub allow_overwrite: bool,

    /// ONNX background removal model
    #[arg(short, long, required_unless_present = "dry_run")]
    pub model_path: Option<PathBuf>,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// ONNX Runtime intra-op threads
    #[arg(long)]
    pub threads: Option<usize>,

    /// Re-encode every output as 8-bit RGBA PNG
    #[arg(long)]
    pub normalize_rgba: bool,

    /// Write a JSON log of every job outcome
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Exit with status 1 if any job failed or was skipped
    #[arg(long)]
    pub strict: bool,

    /// Print the planned jobs without loading a model or writing files
    #[arg(long)]
    pub dry_run: bool,

    /// No progress bar and no per-job lines
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// More diagnostic logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    pub fn destination_rule(&self) -> DestinationRule {
        if self.in_place {
            DestinationRule::InPlace
        } else {
            DestinationRule::Suffix {
                output_dir: self.output_dir.clone(),
                suffix: self
                    .suffix
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SUFFIX.to_string()),
            }
        }
    }

    /// Apply the command-line destination flags on top of a manifest's rule.
    /// Flags that were not given leave the manifest's values alone.
    fn override_rule(&self, rule: DestinationRule) -> DestinationRule {
        if self.in_place {
            return DestinationRule::InPlace;
        }
        match rule {
            DestinationRule::Suffix { output_dir, suffix } => DestinationRule::Suffix {
                output_dir: self.output_dir.clone().or(output_dir),
                suffix: self.suffix.clone().unwrap_or(suffix),
            },
            DestinationRule::InPlace if self.output_dir.is_some() || self.suffix.is_some() => {
                self.destination_rule()
            }
            DestinationRule::InPlace => DestinationRule::InPlace,
        }
    }

    /// Build and validate the job list from whichever source was given.
    pub fn plan(&self) -> Result<Vec<ImageJob>> {
        let jobs = match (&self.manifest, &self.input_dir) {
            (Some(path), _) => {
                let mut manifest = JobManifest::load(path)?;
                manifest.destination = self.override_rule(manifest.destination);
                manifest.into_jobs()?
            }
            (None, Some(dir)) if !self.files.is_empty() => {
                plan_jobs(known_files(dir, &self.files), &self.destination_rule())?
            }
            (None, Some(dir)) => plan_jobs(
                scan_source_dir(dir, usize::from(self.depth))?,
                &self.destination_rule(),
            )?,
            (None, None) => {
                return Err(BgStripError::Configuration {
                    message: "either --manifest or --input-dir is required".to_string(),
                })
            }
        };

        validate_jobs(&jobs, self.allow_overwrite)?;
        Ok(jobs)
    }

    pub fn processor_options(&self) -> ProcessorOptions {
        let progress = if self.quiet {
            ProgressMode::Quiet
        } else {
            ProgressMode::Bar
        };
        ProcessorOptions {
            normalize_rgba: self.normalize_rgba,
            allow_overwrite: self.allow_overwrite,
            progress,
        }
    }

    pub fn model_options(&self) -> Result<ModelOptions> {
        let model_path = self
            .model_path
            .clone()
            .ok_or_else(|| BgStripError::Configuration {
                message: "--model-path is required unless --dry-run is set".to_string(),
            })?;
        Ok(ModelOptions {
            model_path,
            device_id: self.device_id,
            intra_threads: self.threads,
        })
    }

    /// Default tracing filter for the `-v` count. `RUST_LOG` wins when set.
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn check_suffix(s: &str) -> std::result::Result<String, String> {
    if s.contains(['/', '\\']) {
        return Err(format!("{} must not contain path separators", s));
    }
    Ok(s.to_string())
}
