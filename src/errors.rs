use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for planning and driving a batch.
///
/// # Why two layers
///
/// `BgStripError` covers everything that stops the tool before the batch starts
/// (bad manifest, refused overwrite, model that will not load). Once jobs run,
/// failures are captured per job as [`JobError`] and never abort the batch, so the
/// two are kept apart instead of sharing one enum that callers would have to
/// re-classify.
#[derive(Error, Debug)]
pub enum BgStripError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest error: {path:?}: {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, BgStripError>;

/// Failure reported by a [`crate::BackgroundRemover`].
///
/// The remover is a black box; these variants only say which side of the box
/// the failure came from.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("failed to decode input image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("failed to encode output image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("{0}")]
    Other(String),
}

/// Per-job failure. None of these are fatal to the batch.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("source not found: {path:?}")]
    SourceNotFound { path: PathBuf },

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("background removal failed for {path:?}: {source}")]
    Transform {
        path: PathBuf,
        #[source]
        source: TransformError,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to overwrite source {path:?} without --allow-overwrite")]
    OverwriteRefused { path: PathBuf },
}

impl JobError {
    /// Short machine-friendly tag used in reports.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } => "source_not_found",
            Self::Read { .. } => "read_failure",
            Self::Transform { .. } => "transform_failure",
            Self::Write { .. } => "write_failure",
            Self::OverwriteRefused { .. } => "overwrite_refused",
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Fallback for call sites without path context. Code that knows the path and
/// operation should build `BgStripError::FileSystem` directly.
impl From<std::io::Error> for BgStripError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<ort::Error> for TransformError {
    fn from(err: ort::Error) -> Self {
        Self::Inference(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TransformError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Inference(err.to_string())
    }
}
