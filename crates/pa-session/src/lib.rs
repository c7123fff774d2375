//! Simulator session lifecycle for procagent.
//!
//! A session owns one [`SessionState`] and one [`SimulatorBackend`]. The state
//! tracks which simulator objects exist (connection, project, flowsheet, named
//! shapes) and refuses operations whose prerequisites are missing; the backend
//! is the opaque vendor automation handle.
//!
//! # Architecture
//!
//! - `backend`: the vendor surface as a trait, plus its value types
//! - `blocks`: unit-operation kinds and the stencil shapes that draw them
//! - `state`: the lifecycle state machine with atomic transitions
//! - `memory`: an in-process simulator implementing the backend, used by
//!   tests and the CLI's offline replay
//! - `registry`: per-conversation sessions with idle expiry
//!
//! There is no global state: every session is created by the registry (or by
//! hand) and passed by `&mut` into whatever drives it.

pub mod backend;
pub mod blocks;
pub mod error;
pub mod memory;
pub mod registry;
pub mod state;

pub use backend::{
    BackendError, BackendResult, ConnectionInfo, PhaseProperty, PortSide, ShapePosition,
    SimulatorBackend, SolverStatus,
};
pub use blocks::BlockKind;
pub use error::{Precondition, SessionError, SessionResult};
pub use memory::{FailPoint, MemorySimulator};
pub use registry::{Session, SessionId, SessionRegistry};
pub use state::{
    BLOCK_DEFAULT_POSITION, CloseOutcome, Placement, ProjectSource, SessionPhase, SessionState,
    ShapePlacement,
};
