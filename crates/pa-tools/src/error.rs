//! Error types for the tool layer.

use std::path::PathBuf;

use pa_core::CoreError;
use pa_session::{Precondition, SessionError};
use pa_thermo::{CompositionError, UnitError};

/// Everything a tool call can fail with. The dispatcher renders these into
/// failure outcomes; nothing above it sees them as `Err`.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("{0}")]
    UnknownBlockType(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No project to save.")]
    NoProjectToSave,

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Numeric(#[from] CoreError),

    #[error("{}", describe_session(.0))]
    Session(#[from] SessionError),

    /// A vendor call failed while performing `action`.
    #[error("Failed to {action}: {source}")]
    Vendor {
        action: &'static str,
        source: SessionError,
    },

    /// A multi-property write stopped part way; `applied` already reached
    /// the simulator.
    #[error("Failed to {action} after {applied}: {source}")]
    PartialWrite {
        action: &'static str,
        applied: String,
        source: SessionError,
    },

    #[error("Failed to read settings file: {path}")]
    SettingsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    SettingsParse(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

impl ToolError {
    /// Wrap a session error raised while doing `action`.
    ///
    /// Precondition and connection failures keep their own wording; anything
    /// else is reported as a failed action.
    pub fn during(action: &'static str) -> impl FnOnce(SessionError) -> ToolError {
        move |err| match err {
            SessionError::Precondition(_) | SessionError::Connection(_) => {
                ToolError::Session(err)
            }
            source => ToolError::Vendor { action, source },
        }
    }
}

fn describe_session(err: &SessionError) -> String {
    match err {
        SessionError::Precondition(Precondition::NotConnected) => {
            "Not connected to ProMax. Call connect_promax first.".to_string()
        }
        SessionError::Precondition(Precondition::NoActiveFlowsheet) => {
            "No flowsheet. Create a project first.".to_string()
        }
        SessionError::Precondition(p) => format!("{}: {}", capitalize(&p.to_string()), p.hint()),
        other => other.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
