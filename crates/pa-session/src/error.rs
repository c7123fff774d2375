//! Session error types.

use std::fmt;

use thiserror::Error;

use crate::backend::BackendError;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Missing prerequisite for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    NotConnected,
    NoProject,
    NoActiveFlowsheet,
}

impl Precondition {
    /// What the caller should do to satisfy the precondition.
    pub fn hint(self) -> &'static str {
        match self {
            Self::NotConnected => "Call connect_promax first.",
            Self::NoProject => "Create or open a project first.",
            Self::NoActiveFlowsheet => "Create or open a project first.",
        }
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::NoProject => write!(f, "no project open"),
            Self::NoActiveFlowsheet => write!(f, "no active flowsheet"),
        }
    }
}

/// Errors raised by session transitions and registry bookkeeping.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Operation attempted from the wrong lifecycle phase.
    #[error("Precondition failed: {0}")]
    Precondition(Precondition),

    /// The vendor connection could not be established.
    #[error("Failed to connect to ProMax: {0}")]
    Connection(BackendError),

    /// Any other vendor call failed.
    #[error("{0}")]
    VendorCall(BackendError),

    /// A shape with this name already exists in the session.
    #[error("Shape '{name}' already exists")]
    DuplicateShape { name: String },

    /// The registry is at capacity.
    #[error("Maximum sessions ({max}) reached. Please wait for an existing session to end.")]
    RegistryFull { max: usize },

    /// The registry has no session with this id.
    #[error("Session not found: {id}")]
    SessionNotFound { id: String },
}

impl From<Precondition> for SessionError {
    fn from(p: Precondition) -> Self {
        SessionError::Precondition(p)
    }
}
