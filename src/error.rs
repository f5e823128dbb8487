//! Error types for the pipeline engine.

use std::sync::Arc;

/// The main error type for the pipeline engine.
///
/// Errors are cheap to clone so that a fault recorded in one stage can be
/// observed by every downstream stage and by repeated terminal reads.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A transformation function failed for one element
    #[error("Transform error: {0}")]
    Transform(Arc<dyn std::error::Error + Send + Sync>),

    /// A source adapter failed to produce an element
    #[error("Source error: {0}")]
    Source(Arc<dyn std::error::Error + Send + Sync>),

    /// A monad expectation rejected the held value
    #[error("Check failed: {0}")]
    Check(String),

    /// A custom error with a message
    #[error("{0}")]
    Custom(String),
}

// Convenience constructors
impl Error {
    /// Create a transform error from any error type
    pub fn transform<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Transform(Arc::new(error))
    }

    /// Create a source error from any error type
    pub fn source<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Error::Source(Arc::new(error))
    }

    /// Create a check error with a message
    pub fn check<S: Into<String>>(message: S) -> Self {
        Error::Check(message.into())
    }

    /// Create a custom error with a message
    pub fn custom<S: Into<String>>(message: S) -> Self {
        Error::Custom(message.into())
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::source(e)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Error {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Error::Custom(e.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Custom(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Custom(s.to_string())
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Helper trait for converting foreign errors into our Error type
pub trait IntoError<T> {
    fn into_transform_error(self) -> Result<T>;
    fn into_source_error(self) -> Result<T>;
}

impl<T, E> IntoError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_transform_error(self) -> Result<T> {
        self.map_err(Error::transform)
    }

    fn into_source_error(self) -> Result<T> {
        self.map_err(Error::source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::custom("boom").to_string(), "boom");
        assert_eq!(Error::check("too small").to_string(), "Check failed: too small");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(Error::from(io).to_string(), "Source error: disk");
    }

    #[test]
    fn test_into_error() {
        let parsed: Result<i32> = "x1".parse::<i32>().into_transform_error();
        assert!(matches!(parsed, Err(Error::Transform(_))));
    }

    #[test]
    fn test_eq_by_message() {
        assert_eq!(Error::from("c"), Error::custom("c"));
        assert_ne!(Error::from("c"), Error::custom("d"));
    }
}
