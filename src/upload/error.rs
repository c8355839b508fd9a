//! Upload error taxonomy
//!
//! Each failure of the upload path gets its own variant so that logs can tell
//! them apart even where several share a status code.

use hyper::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("missing Content-Length header")]
    MissingContentLength,

    #[error("invalid Content-Length value '{0}'")]
    InvalidContentLength(String),

    #[error("request body too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("request body length mismatch: expected {expected} bytes, got {actual}")]
    BodyLengthMismatch { expected: u64, actual: u64 },

    #[error("unaccepted mime type: {0}")]
    UnsupportedContentType(String),

    #[error("payload does not start with '{expected}'")]
    MissingDataUrlPrefix { expected: &'static str },

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("failed to create output directory '{}': {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

impl UploadError {
    /// HTTP status reported to the client for this failure
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::CreateDir { .. } | Self::Write { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingContentLength
            | Self::InvalidContentLength(_)
            | Self::BodyRead(_)
            | Self::BodyLengthMismatch { .. }
            | Self::UnsupportedContentType(_)
            | Self::MissingDataUrlPrefix { .. }
            | Self::InvalidBase64(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Failures detected after the request itself was accepted
    pub const fn is_payload_error(&self) -> bool {
        matches!(
            self,
            Self::MissingDataUrlPrefix { .. }
                | Self::InvalidBase64(_)
                | Self::CreateDir { .. }
                | Self::Write { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_errors_are_bad_request() {
        assert_eq!(UploadError::MissingContentLength.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            UploadError::InvalidContentLength("abc".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UploadError::BodyRead("connection reset".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UploadError::UnsupportedContentType("text/plain".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_storage_errors_are_server_errors() {
        let err = UploadError::Write {
            path: PathBuf::from("outputs/x.jpg"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_payload_error());
        assert!(err.to_string().contains("outputs/x.jpg"));
    }

    #[test]
    fn test_payload_classification() {
        assert!(UploadError::MissingDataUrlPrefix { expected: "data:" }.is_payload_error());
        assert!(!UploadError::MissingContentLength.is_payload_error());
        assert_eq!(
            UploadError::PayloadTooLarge { size: 10, max: 5 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
