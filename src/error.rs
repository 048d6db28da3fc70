//! Centralized error types for mailreader.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailreader library.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// Required settings are missing or invalid (e.g. no credentials).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The settings file could not be read or parsed.
    #[error("Could not load settings from '{path}': {reason}")]
    Settings { path: PathBuf, reason: String },

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The server could not be reached or the TLS handshake failed.
    #[error("Could not connect to {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    /// The server rejected the credentials.
    #[error("Authentication failed for '{user}': {reason}")]
    Auth { user: String, reason: String },

    /// The server answered a command with `NO` or `BAD`.
    #[error("Server rejected {command}: {reason}")]
    Rejected { command: String, reason: String },

    /// Any other IMAP protocol or transport failure.
    #[error("IMAP error: {0}")]
    Imap(String),

    /// The raw message could not be parsed as MIME.
    #[error("MIME decoding error: {0}")]
    Mime(String),
}

/// Convenience alias for `Result<T, ReaderError>`.
pub type Result<T> = std::result::Result<T, ReaderError>;

impl ReaderError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a `NO`/`BAD` status rather than a broken connection.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_carries_path() {
        let err = ReaderError::io(
            "attachments/report.pdf",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("attachments/report.pdf"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_rejection_detection() {
        let rejected = ReaderError::Rejected {
            command: "SEARCH".into(),
            reason: "mailbox busy".into(),
        };
        assert!(rejected.is_rejection());
        assert!(!ReaderError::Config("x".into()).is_rejection());
    }
}
