//! Failure taxonomy for a single package check.

use thiserror::Error;

/// Errors produced while resolving or retrieving a package.
///
/// Every variant is local to one package's run; none of them aborts a batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The package configuration lacks the field the selected source keys on.
    #[error("'{field}' field is required for source '{source_name}'")]
    Configuration {
        field: &'static str,
        source_name: String,
    },

    /// The catalog has no matching package or release.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network failure, unexpected HTTP status, or an unreadable body.
    #[error("{}", transport_message(*status, message))]
    Transport { status: Option<u16>, message: String },

    /// An expected page element or response field was absent.
    #[error("Resolution mismatch at {stage}: {detail}")]
    ResolutionMismatch { stage: &'static str, detail: String },

    /// The transfer failed after the output file was opened; its contents
    /// must not be trusted.
    #[error("Download interrupted after {bytes_written} bytes: {reason}")]
    PartialDownload { bytes_written: u64, reason: String },

    /// Local filesystem failure around the version file or output file.
    #[error("Storage error: {0}")]
    Storage(String),
}

fn transport_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(403) => format!(
            "HTTP 403: {}. The catalog is likely blocking or rate limiting requests.",
            message
        ),
        Some(code) => format!("HTTP {}: {}", code, message),
        None => format!("Transport error: {}", message),
    }
}

impl FetchError {
    pub fn transport(message: impl Into<String>) -> Self {
        FetchError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(code: u16, url: &str) -> Self {
        FetchError::Transport {
            status: Some(code),
            message: format!("unexpected status from {}", url),
        }
    }

    pub fn mismatch(stage: &'static str, detail: impl Into<String>) -> Self {
        FetchError::ResolutionMismatch {
            stage,
            detail: detail.into(),
        }
    }

    pub fn storage(err: anyhow::Error) -> Self {
        FetchError::Storage(format!("{:#}", err))
    }

    /// HTTP status attached to a transport failure, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// True for 403/429 responses, which usually mean the catalog is
    /// throttling or blocking this client. Never retried automatically.
    pub fn is_blocked(&self) -> bool {
        matches!(self.http_status(), Some(403) | Some(429))
    }

    /// `NotFound` means "no update", not a hard failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, FetchError::Configuration { .. })
    }

    /// True when the output file may hold a truncated artifact.
    pub fn output_untrusted(&self) -> bool {
        matches!(self, FetchError::PartialDownload { .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
