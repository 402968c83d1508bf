use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::TransformError;
use crate::traits::BackgroundRemover;

/// Deterministic stand-in for a real remover.
///
/// Returns its input unchanged, or fails when the input starts with the
/// configured marker. Counts calls so tests can check which jobs were attempted.
#[derive(Debug, Default)]
pub struct MockBackgroundRemover {
    fail_marker: Option<Vec<u8>>,
    calls: AtomicUsize,
}

impl MockBackgroundRemover {
    pub const fn new() -> Self {
        Self {
            fail_marker: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail on every input whose bytes start with `marker`.
    pub fn failing_on(marker: impl Into<Vec<u8>>) -> Self {
        Self {
            fail_marker: Some(marker.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl BackgroundRemover for MockBackgroundRemover {
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        match &self.fail_marker {
            Some(marker) if input.starts_with(marker) => Err(TransformError::Other(
                "mock remover rejected marked input".to_string(),
            )),
            _ => Ok(input.to_vec()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Factory for tests.
pub const fn create_mock_remover() -> MockBackgroundRemover {
    MockBackgroundRemover::new()
}
