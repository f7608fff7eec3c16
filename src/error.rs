//! Error types for media-dl
//!
//! Two kinds of failure flow through this crate:
//! - Synchronous usage errors (`NotFound`, `AlreadyStarted`, `Duplicate`,
//!   `ShuttingDown`) returned directly to the caller of the offending
//!   operation.
//! - Asynchronous capability failures (`ResolutionError`, `TransferError`)
//!   which are never thrown to a synchronous caller; the lifecycle manager
//!   captures their rendered description into the job's `failure` field.

use crate::types::DownloadId;
use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Job id was never created
    #[error("download not found: {0}")]
    NotFound(DownloadId),

    /// Duplicate `start` on a job already past `Initial`
    #[error("download {id} already started (status {status})")]
    AlreadyStarted {
        /// The job that was already started
        id: DownloadId,
        /// The status the job was observed in
        status: String,
    },

    /// URL already submitted as another job
    #[error("URL already added: {0}")]
    Duplicate(String),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g. "max_concurrent_downloads")
        key: Option<String>,
    },

    /// Resolver capability failed
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Transfer capability failed
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures produced by a [`Resolver`](crate::resolver::Resolver)
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// Source URL could not be parsed
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The URL that failed to parse
        url: String,
        /// Why parsing failed
        reason: String,
    },

    /// Host is not one the resolver knows how to handle
    #[error("URL contains invalid or unsupported host: {0}")]
    UnsupportedHost(String),

    /// Page fetched but required metadata was missing
    #[error("page at {url} is missing {what}")]
    MissingMetadata {
        /// The page that was scraped
        url: String,
        /// What was expected and not found (e.g. "a valid audio url")
        what: String,
    },

    /// Network failure while fetching the source page
    #[error("failed to fetch page {url}: {reason}")]
    Network {
        /// The page being fetched
        url: String,
        /// The underlying network error
        reason: String,
    },

    /// Resolution exceeded its deadline
    #[error("resolution timed out after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// Resolution was cancelled before it finished
    #[error("resolution cancelled")]
    Cancelled,

    /// Free-form resolution failure (used by external resolver implementations)
    #[error("{0}")]
    Other(String),
}

/// Failures produced by a [`Transfer`](crate::transfer::Transfer)
#[derive(Debug, Error)]
pub enum TransferError {
    /// Network failure while fetching media bytes
    #[error("failed to download {url}: {reason}")]
    Network {
        /// The media URL being fetched
        url: String,
        /// The underlying network error
        reason: String,
    },

    /// Media server answered with a non-success status
    #[error("unexpected HTTP status {status} for {url}")]
    HttpStatus {
        /// The HTTP status code received
        status: u16,
        /// The media URL being fetched
        url: String,
    },

    /// Destination file already exists
    #[error("file already exists: {0}")]
    FileExists(String),

    /// Transfer exceeded its deadline
    #[error("transfer timed out after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// Transfer was cancelled before it finished
    #[error("transfer cancelled")]
    Cancelled,

    /// I/O failure while writing to the sink
    #[error("failed to write media to disk: {0}")]
    Io(String),

    /// Free-form transfer failure (used by external transfer implementations)
    #[error("{0}")]
    Other(String),
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_variants_render_bare_descriptions() {
        // The lifecycle manager stores these Display strings verbatim in the
        // job's failure field, so stubs and external capabilities can control
        // the user-visible description exactly.
        assert_eq!(
            ResolutionError::Other("unsupported sub".into()).to_string(),
            "unsupported sub"
        );
        assert_eq!(TransferError::Other("timeout".into()).to_string(), "timeout");
    }

    #[test]
    fn not_found_mentions_the_id() {
        let err = Error::NotFound(DownloadId::new(99));
        assert_eq!(err.to_string(), "download not found: 99");
    }

    #[test]
    fn already_started_mentions_id_and_status() {
        let err = Error::AlreadyStarted {
            id: DownloadId::new(3),
            status: "downloading".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains('3'), "message should mention the id: {msg}");
        assert!(
            msg.contains("downloading"),
            "message should mention the observed status: {msg}"
        );
    }

    #[test]
    fn capability_errors_convert_into_error() {
        let err: Error = ResolutionError::UnsupportedHost("https://x/a".into()).into();
        assert!(matches!(err, Error::Resolution(_)));

        let err: Error = TransferError::Cancelled.into();
        assert!(matches!(err, Error::Transfer(_)));
    }

    #[test]
    fn cancelled_capabilities_have_stable_descriptions() {
        assert_eq!(ResolutionError::Cancelled.to_string(), "resolution cancelled");
        assert_eq!(TransferError::Cancelled.to_string(), "transfer cancelled");
    }
}
