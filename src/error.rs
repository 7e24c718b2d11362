use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Coarse classification of an install failure, stable enough for callers to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    NotFound,
    Permission,
    Filesystem,
    Busy,
    Unknown,
}

impl ErrorKind {
    /// Whether retrying the same request without changing the input may succeed.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Busy)
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("network error: {message}{}", timeout_note(.timed_out))]
    Network { message: String, timed_out: bool },
    #[error("{what} not found")]
    NotFound { what: String },
    #[error("insufficient privileges to write {}", .path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("another installation is already running for {}", .path.display())]
    Busy { path: PathBuf },
    #[error("{0}")]
    Unknown(String),
}

fn timeout_note(timed_out: &bool) -> &'static str {
    if *timed_out {
        " (timed out; the host may be slow, try again)"
    } else {
        ""
    }
}

impl InstallError {
    /// Attach the failing path to an I/O error, keeping permission failures distinct.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == io::ErrorKind::PermissionDenied {
            InstallError::Permission { path, source }
        } else {
            InstallError::Filesystem { path, source }
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        InstallError::NotFound { what: what.into() }
    }

    /// Classify a reqwest failure; a 404 from the host means the release or asset is absent.
    pub fn from_http(context: &str, err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            return InstallError::not_found(context.to_owned());
        }
        InstallError::Network {
            message: format!("{context}: {err}"),
            timed_out: err.is_timeout(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            InstallError::Network { .. } => ErrorKind::Network,
            InstallError::NotFound { .. } => ErrorKind::NotFound,
            InstallError::Permission { .. } => ErrorKind::Permission,
            InstallError::Filesystem { .. } => ErrorKind::Filesystem,
            InstallError::Busy { .. } => ErrorKind::Busy,
            InstallError::Unknown(_) => ErrorKind::Unknown,
        }
    }
}
