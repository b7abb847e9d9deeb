//! Error types for the page-assembly pipeline.
//!
//! Every failure a job can hit is funneled into [`Error`] and delivered once
//! through the job listener. [`Error::kind`] gives the coarse class.

/// Result type alias for pagepress operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A source failed to produce a pixel buffer
    Render,
    /// A pixel buffer could not be compressed
    Encoding,
    /// Image decode or page-draw failure inside the PDF sink
    Composition,
    /// Sink open/write/flush failure
    Io,
    /// The API was used in a state that does not allow the call
    Usage,
    /// The background worker died before reporting
    Worker,
}

/// Error types that can occur while assembling a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Source failed to render
    #[error("Render error: {0}")]
    Render(String),

    /// Pixel buffer could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Page composition failed
    #[error("Composition error: {0}")]
    Composition(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid job configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Pages cannot be added while a job is running
    #[error("A document job is already in progress")]
    JobInProgress,

    /// The assembly worker panicked
    #[error("Assembly worker panicked: {0}")]
    WorkerPanicked(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Render(_) => ErrorKind::Render,
            Error::Encoding(_) => ErrorKind::Encoding,
            Error::Composition(_) => ErrorKind::Composition,
            Error::Io(_) => ErrorKind::Io,
            Error::InvalidConfig(_) | Error::JobInProgress => ErrorKind::Usage,
            Error::WorkerPanicked(_) => ErrorKind::Worker,
        }
    }
}

impl From<crate::writer::ImageError> for Error {
    fn from(err: crate::writer::ImageError) -> Self {
        match err {
            crate::writer::ImageError::Io(e) => Error::Io(e),
            other => Error::Composition(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error() {
        let err = Error::Render("view has no size".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Render error"));
        assert!(msg.contains("view has no size"));
        assert_eq!(err.kind(), ErrorKind::Render);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_image_error_conversion() {
        let err: Error = crate::writer::ImageError::DecodeError("bad chunk".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Composition);
        assert!(err.to_string().contains("bad chunk"));
    }

    #[test]
    fn test_usage_errors() {
        assert_eq!(Error::JobInProgress.kind(), ErrorKind::Usage);
        assert_eq!(Error::InvalidConfig("x".into()).kind(), ErrorKind::Usage);
    }
}
