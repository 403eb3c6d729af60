//! Session-level errors.

use thiserror::Error;

use gitscape_core::{AcquisitionError, DigestError};

use crate::state::SessionState;

/// Failure that ends a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The repository could not be made available locally.
    #[error(transparent)]
    Acquisition(AcquisitionError),

    /// Fatal failure while scanning or assembling.
    #[error(transparent)]
    Digest(DigestError),

    /// The consumer went away or the service is shutting down.
    #[error("Session cancelled")]
    Cancelled,

    /// A state change was attempted that the lifecycle does not allow.
    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    /// The worker task panicked or was aborted.
    #[error("Digest worker failed: {message}")]
    Worker { message: String },
}

impl SessionError {
    pub(crate) fn from_join(err: tokio::task::JoinError) -> Self {
        Self::Worker {
            message: err.to_string(),
        }
    }

    /// Whether this error means cancellation rather than failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<AcquisitionError> for SessionError {
    fn from(err: AcquisitionError) -> Self {
        match err {
            AcquisitionError::Cancelled => Self::Cancelled,
            other => Self::Acquisition(other),
        }
    }
}

impl From<DigestError> for SessionError {
    fn from(err: DigestError) -> Self {
        match err {
            DigestError::Cancelled => Self::Cancelled,
            other => Self::Digest(other),
        }
    }
}
