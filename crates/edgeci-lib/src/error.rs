//! Error taxonomy for synchronization operations

use std::path::Path;
use thiserror::Error;

/// Result alias used throughout the library
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by the gateway client, the resolver and the local collaborators
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or connection failure, including request timeouts
    #[error("{operation}: transport failure: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// The management API answered with a non-success status
    #[error("{operation}: remote returned HTTP {status}: {body}")]
    Remote {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// A success response whose payload could not be decoded
    #[error("{operation}: malformed response: {message}")]
    Malformed {
        operation: &'static str,
        message: String,
    },

    /// A revision list was empty where at least one revision is required
    #[error("revision set is empty")]
    InvalidRevisionSet,

    /// The next revision after `revision` does not fit the revision range
    #[error("revision {revision} has no successor")]
    RevisionOverflow { revision: u32 },

    /// The requested remote object does not exist
    #[error("{operation}: {resource} not found")]
    NotFound {
        operation: &'static str,
        resource: String,
    },

    /// Packaging, extraction or command spawn failure
    #[error("{context}: {source}")]
    LocalIo {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    pub(crate) fn transport(operation: &'static str, error: impl std::fmt::Display) -> Self {
        SyncError::Transport {
            operation,
            message: error.to_string(),
        }
    }

    pub(crate) fn malformed(operation: &'static str, error: impl std::fmt::Display) -> Self {
        SyncError::Malformed {
            operation,
            message: error.to_string(),
        }
    }

    pub(crate) fn local_io(context: impl Into<String>, source: std::io::Error) -> Self {
        SyncError::LocalIo {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn path_io(action: &str, path: &Path, source: std::io::Error) -> Self {
        Self::local_io(format!("failed to {} {}", action, path.display()), source)
    }

    /// Name of the remote operation that failed, if any
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            SyncError::Transport { operation, .. }
            | SyncError::Remote { operation, .. }
            | SyncError::Malformed { operation, .. }
            | SyncError::NotFound { operation, .. } => Some(operation),
            SyncError::InvalidRevisionSet
            | SyncError::RevisionOverflow { .. }
            | SyncError::LocalIo { .. } => None,
        }
    }

    /// HTTP status for remote failures
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for the expected "does not exist" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_exposes_context() {
        let err = SyncError::Remote {
            operation: "deploy",
            status: 409,
            body: "conflict".to_string(),
        };

        assert_eq!(err.operation(), Some("deploy"));
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "deploy: remote returned HTTP 409: conflict");
    }

    #[test]
    fn test_local_io_has_no_operation() {
        let err = SyncError::path_io(
            "read",
            Path::new("/tmp/missing"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );

        assert!(err.operation().is_none());
        assert!(err.status().is_none());
        assert!(err.to_string().starts_with("failed to read /tmp/missing"));
    }

    #[test]
    fn test_not_found_predicate() {
        let err = SyncError::NotFound {
            operation: "fetch_kvm_entry",
            resource: "entry db-url".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!SyncError::InvalidRevisionSet.is_not_found());
    }
}
