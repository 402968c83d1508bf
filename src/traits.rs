use crate::errors::TransformError;

/// Background removal abstraction.
///
/// Encoded image bytes go in, encoded image bytes come out. The batch driver
/// depends on this trait instead of a concrete model so tests can plug in a
/// deterministic fake.
pub trait BackgroundRemover: Send + Sync {
    /// Remove the background from an encoded image.
    ///
    /// Blocks until the result is ready. There is no timeout.
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>, TransformError>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

impl<R: BackgroundRemover + ?Sized> BackgroundRemover for &R {
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        (**self).remove_background(input)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<R: BackgroundRemover + ?Sized> BackgroundRemover for Box<R> {
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        (**self).remove_background(input)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
