pub mod config;
pub mod errors;
pub mod imageops;
pub mod job;
pub mod manifest;
pub mod model;
pub mod processor;
pub mod summary;
pub mod traits;

pub mod mocks;

pub use config::Config;
pub use errors::{BgStripError, JobError, Result, TransformError};
pub use job::{plan_jobs, validate_jobs, DestinationRule, ImageJob};
pub use manifest::{is_supported_image, scan_source_dir, JobManifest, ManifestEntry};
pub use model::{ModelOptions, OnnxBackgroundRemover};
pub use processor::{BatchImageProcessor, ProcessorOptions, ProgressMode};
pub use summary::{BatchSummary, JobOutcome, ProcessingResult};
pub use traits::*;

impl BatchImageProcessor<OnnxBackgroundRemover> {
    /// Load the ONNX model described by `config` and wrap it in a processor.
    pub fn with_onnx_model(config: &Config) -> Result<Self> {
        let remover = OnnxBackgroundRemover::new(&config.model_options()?)?;
        Ok(Self::new(remover, config.processor_options()))
    }
}
