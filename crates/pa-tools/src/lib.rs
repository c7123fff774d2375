//! Agent-facing tool surface for procagent.
//!
//! Tool calls are parsed into the closed [`ToolCall`] enum and executed by a
//! [`ToolDispatcher`] against one session. Every call yields a
//! [`ToolOutcome`]; errors never escape the dispatcher.
//!
//! # Example
//!
//! ```
//! use pa_session::{MemorySimulator, SessionState};
//! use pa_tools::{OutcomeStatus, ToolCall, ToolDispatcher};
//! use serde_json::json;
//!
//! let dispatcher = ToolDispatcher::new().with_gui_default(false);
//! let mut state = SessionState::new();
//! let mut sim = MemorySimulator::new();
//!
//! let call = ToolCall::from_parts("connect_promax", json!({})).unwrap();
//! let outcome = dispatcher.dispatch_on(&mut state, &mut sim, call);
//! assert_eq!(outcome.status, OutcomeStatus::Success);
//! ```

pub mod call;
pub mod config;
pub mod definitions;
pub mod dispatch;
pub mod error;
pub mod outcome;

pub use call::{ComponentList, CompositionInput, ToolCall};
pub use config::{
    AgentSettings, LOG_LEVEL_VAR, LoggingSettings, PromaxSettings, ServerSettings,
    SessionSettings, Settings,
};
pub use definitions::{SERVER_NAME, TOOL_NAMES, ToolDefinition, allowed_tools, tool_definitions};
pub use dispatch::ToolDispatcher;
pub use error::{ToolError, ToolResult};
pub use outcome::{OutcomeStatus, ToolOutcome};
