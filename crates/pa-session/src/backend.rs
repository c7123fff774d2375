//! The vendor automation surface.
//!
//! Every call that reaches the simulator goes through [`SimulatorBackend`].
//! Handles are opaque: the backend hands them out and the session only stores
//! and returns them. Streams and blocks are addressed by name, as the vendor's
//! collections are indexable by name.

use std::fmt;
use std::path::Path;

use pa_core::handle::{ConnectionHandle, FlowsheetHandle, ProjectHandle, ShapeHandle};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blocks::BlockKind;

/// Result type for vendor calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Failure surfaced by the vendor handle.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Total-phase property of a stream. All values are SI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseProperty {
    /// K
    Temperature,
    /// Pa
    Pressure,
    /// mol/s
    MolarFlow,
    /// kg/s
    MassFlow,
}

impl PhaseProperty {
    pub const ALL: [PhaseProperty; 4] = [
        Self::Temperature,
        Self::Pressure,
        Self::MolarFlow,
        Self::MassFlow,
    ];

    /// Index into the vendor's phase property collection (total phase).
    pub fn vendor_index(self) -> i32 {
        match self {
            Self::Temperature => 0,
            Self::Pressure => 1,
            Self::MolarFlow => 16,
            Self::MassFlow => 17,
        }
    }
}

impl fmt::Display for PhaseProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => write!(f, "temperature"),
            Self::Pressure => write!(f, "pressure"),
            Self::MolarFlow => write!(f, "molar flow"),
            Self::MassFlow => write!(f, "mass flow"),
        }
    }
}

/// Which side of a block a stream attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortSide {
    Inlet,
    Outlet,
}

impl fmt::Display for PortSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inlet => write!(f, "inlet"),
            Self::Outlet => write!(f, "outlet"),
        }
    }
}

/// Position on the drawing page, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapePosition {
    pub x: f64,
    pub y: f64,
}

/// Raw solver status code; `>= 1` means converged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStatus(pub i32);

impl SolverStatus {
    pub fn converged(self) -> bool {
        self.0 >= 1
    }
}

/// Outcome of a successful connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    pub handle: ConnectionHandle,
    /// `major.minor`
    pub version: String,
}

/// Opaque vendor automation handle.
///
/// Implementations are expected to be single-threaded-affine: a session calls
/// them strictly sequentially through `&mut self`.
pub trait SimulatorBackend: Send {
    /// Start (or attach to) the simulator. `with_gui` selects the drawing
    /// front-end, which is what makes shape operations available.
    fn connect(&mut self, with_gui: bool) -> BackendResult<ConnectionInfo>;

    fn new_project(&mut self, conn: ConnectionHandle) -> BackendResult<ProjectHandle>;

    fn open_project(&mut self, conn: ConnectionHandle, path: &Path)
    -> BackendResult<ProjectHandle>;

    fn save_project(&mut self, project: ProjectHandle, path: &Path) -> BackendResult<()>;

    fn close_project(&mut self, project: ProjectHandle) -> BackendResult<()>;

    /// Return the flowsheet with this name, adding it if it does not exist.
    fn add_or_select_flowsheet(
        &mut self,
        project: ProjectHandle,
        name: &str,
    ) -> BackendResult<FlowsheetHandle>;

    /// First flowsheet of the project, if it has any.
    fn first_flowsheet(&mut self, project: ProjectHandle) -> BackendResult<Option<FlowsheetHandle>>;

    fn add_component(&mut self, fs: FlowsheetHandle, name: &str) -> BackendResult<()>;

    /// Canonical component names in environment order.
    fn component_names(&self, fs: FlowsheetHandle) -> BackendResult<Vec<String>>;

    /// Molecular weight (kg/kmol) of a registered component.
    fn component_molar_mass(&self, fs: FlowsheetHandle, name: &str) -> BackendResult<Option<f64>>;

    /// Create a data-only stream.
    fn create_stream(&mut self, fs: FlowsheetHandle, name: &str) -> BackendResult<()>;

    /// Drop a stream shape on the page; this also creates the stream.
    fn drop_stream_shape(
        &mut self,
        fs: FlowsheetHandle,
        name: &str,
        at: ShapePosition,
    ) -> BackendResult<ShapeHandle>;

    /// Create a data-only block.
    fn create_block(&mut self, fs: FlowsheetHandle, kind: BlockKind, name: &str)
    -> BackendResult<()>;

    /// Drop a block shape on the page; this also creates the block.
    fn drop_block_shape(
        &mut self,
        fs: FlowsheetHandle,
        kind: BlockKind,
        name: &str,
        at: ShapePosition,
    ) -> BackendResult<ShapeHandle>;

    fn connect_stream(
        &mut self,
        fs: FlowsheetHandle,
        stream: &str,
        block: &str,
        side: PortSide,
    ) -> BackendResult<()>;

    fn stream_names(&self, fs: FlowsheetHandle) -> BackendResult<Vec<String>>;

    fn set_stream_property(
        &mut self,
        fs: FlowsheetHandle,
        stream: &str,
        property: PhaseProperty,
        si_value: f64,
    ) -> BackendResult<()>;

    /// Current SI value, `None` when unspecified.
    fn stream_property(
        &self,
        fs: FlowsheetHandle,
        stream: &str,
        property: PhaseProperty,
    ) -> BackendResult<Option<f64>>;

    /// Write a molar-fraction vector aligned to [`Self::component_names`].
    fn set_stream_composition(
        &mut self,
        fs: FlowsheetHandle,
        stream: &str,
        mole_fractions: &[f64],
    ) -> BackendResult<()>;

    fn flash_stream(&mut self, fs: FlowsheetHandle, stream: &str) -> BackendResult<()>;

    fn solve(&mut self, fs: FlowsheetHandle) -> BackendResult<SolverStatus>;
}
