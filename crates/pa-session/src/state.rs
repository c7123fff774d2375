//! Session lifecycle state machine.
//!
//! `Disconnected -> Connected -> ProjectOpen -> FlowsheetActive`, with
//! [`SessionState::reset`] returning to `Disconnected` from anywhere.
//!
//! Every transition calls the backend first and assigns fields only after all
//! of its vendor calls succeeded, so a failed call leaves the state exactly as
//! it was.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use pa_core::handle::{ConnectionHandle, FlowsheetHandle, ProjectHandle, ShapeHandle};
use tracing::{debug, info, warn};

use crate::backend::{ConnectionInfo, ShapePosition, SimulatorBackend};
use crate::blocks::BlockKind;
use crate::error::{Precondition, SessionError, SessionResult};

/// Coarse lifecycle phase derived from which handles are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    Disconnected,
    Connected,
    ProjectOpen,
    FlowsheetActive,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
            Self::ProjectOpen => write!(f, "project open"),
            Self::FlowsheetActive => write!(f, "flowsheet active"),
        }
    }
}

/// Grid cursor for stream shapes dropped without explicit coordinates.
///
/// Starts at (2, 5) and steps 2 in x; past x = 10 it wraps to x = 2 one row
/// lower (y - 2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapePlacement {
    next: ShapePosition,
}

impl ShapePlacement {
    pub const START: ShapePosition = ShapePosition { x: 2.0, y: 5.0 };
    const STEP: f64 = 2.0;
    const WRAP_X: f64 = 10.0;

    /// Position the next auto-placed shape will use.
    pub fn peek(&self) -> ShapePosition {
        self.next
    }

    /// Cursor after one shape has been placed at [`Self::peek`].
    pub fn advanced(&self) -> Self {
        let mut next = ShapePosition {
            x: self.next.x + Self::STEP,
            y: self.next.y,
        };
        if next.x > Self::WRAP_X {
            next.x = Self::START.x;
            next.y -= Self::STEP;
        }
        Self { next }
    }
}

impl Default for ShapePlacement {
    fn default() -> Self {
        Self { next: Self::START }
    }
}

/// Default page position for blocks.
pub const BLOCK_DEFAULT_POSITION: ShapePosition = ShapePosition { x: 5.0, y: 7.0 };

/// Result of [`SessionState::close_project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    /// No project was open; nothing changed.
    NothingToClose,
}

/// What an open-or-create transition should do.
#[derive(Debug, Clone, Copy)]
pub enum ProjectSource<'a> {
    /// New empty project with one flowsheet of this name.
    New { flowsheet: &'a str },
    /// Existing project file; its first flowsheet becomes active.
    File(&'a Path),
}

/// Outcome of creating a stream or block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Created without a drawing (no GUI).
    DataOnly,
    /// Dropped on the page and registered under its name.
    Drawn { shape: ShapeHandle, at: ShapePosition },
}

/// State of one simulator session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    connection: Option<ConnectionHandle>,
    version: Option<String>,
    project: Option<ProjectHandle>,
    flowsheet: Option<FlowsheetHandle>,
    gui_mode: bool,
    named_shapes: HashMap<String, ShapeHandle>,
    placement: ShapePlacement,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn has_project(&self) -> bool {
        self.project.is_some()
    }

    pub fn has_flowsheet(&self) -> bool {
        self.flowsheet.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.flowsheet.is_some() {
            SessionPhase::FlowsheetActive
        } else if self.project.is_some() {
            SessionPhase::ProjectOpen
        } else if self.connection.is_some() {
            SessionPhase::Connected
        } else {
            SessionPhase::Disconnected
        }
    }

    pub fn gui_mode(&self) -> bool {
        self.gui_mode
    }

    /// Simulator version reported at connect time.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn shape(&self, name: &str) -> Option<ShapeHandle> {
        self.named_shapes.get(name).copied()
    }

    pub fn shape_count(&self) -> usize {
        self.named_shapes.len()
    }

    pub fn placement(&self) -> ShapePlacement {
        self.placement
    }

    pub fn require_connected(&self) -> SessionResult<ConnectionHandle> {
        self.connection
            .ok_or(SessionError::Precondition(Precondition::NotConnected))
    }

    pub fn require_project(&self) -> SessionResult<ProjectHandle> {
        self.project
            .ok_or(SessionError::Precondition(Precondition::NoProject))
    }

    pub fn require_flowsheet_active(&self) -> SessionResult<FlowsheetHandle> {
        self.flowsheet
            .ok_or(SessionError::Precondition(Precondition::NoActiveFlowsheet))
    }

    /// Connect to the simulator.
    ///
    /// On failure the current state (including an existing connection) is
    /// untouched. On success an open project is closed and any previous state
    /// is discarded.
    pub fn connect<B>(&mut self, backend: &mut B, with_gui: bool) -> SessionResult<ConnectionInfo>
    where
        B: SimulatorBackend + ?Sized,
    {
        let info = backend.connect(with_gui).map_err(SessionError::Connection)?;

        if let Some(previous) = self.project {
            warn!("reconnect closes the open project");
            release_project(backend, previous);
        }
        self.reset();
        self.connection = Some(info.handle);
        self.version = Some(info.version.clone());
        self.gui_mode = with_gui;

        info!(version = %info.version, with_gui, "connected to simulator");
        Ok(info)
    }

    /// Create a new project or open one from disk, then activate a flowsheet.
    ///
    /// Returns whether a flowsheet is active afterwards. A project already
    /// open is closed once the new one is ready; its shapes and placement
    /// cursor are dropped while the connection stays.
    pub fn open_or_create_project<B>(
        &mut self,
        backend: &mut B,
        source: ProjectSource<'_>,
    ) -> SessionResult<bool>
    where
        B: SimulatorBackend + ?Sized,
    {
        let conn = self.require_connected()?;

        let project = match source {
            ProjectSource::New { .. } => backend.new_project(conn),
            ProjectSource::File(path) => backend.open_project(conn, path),
        }
        .map_err(SessionError::VendorCall)?;

        let flowsheet = match source {
            ProjectSource::New { flowsheet } => {
                backend.add_or_select_flowsheet(project, flowsheet).map(Some)
            }
            ProjectSource::File(_) => backend.first_flowsheet(project),
        };
        let flowsheet = match flowsheet {
            Ok(fs) => fs,
            Err(err) => {
                // the half-made project is unreachable from the state, close it
                release_project(backend, project);
                return Err(SessionError::VendorCall(err));
            }
        };

        if let Some(previous) = self.project.replace(project) {
            release_project(backend, previous);
        }
        self.flowsheet = flowsheet;
        self.named_shapes.clear();
        self.placement = ShapePlacement::default();

        match source {
            ProjectSource::New { flowsheet } => info!(flowsheet, "project created"),
            ProjectSource::File(path) => info!(path = %path.display(), "project opened"),
        }
        Ok(flowsheet.is_some())
    }

    pub fn create_project<B>(&mut self, backend: &mut B, flowsheet: &str) -> SessionResult<()>
    where
        B: SimulatorBackend + ?Sized,
    {
        self.open_or_create_project(backend, ProjectSource::New { flowsheet })
            .map(|_| ())
    }

    pub fn open_project<B>(&mut self, backend: &mut B, path: &Path) -> SessionResult<bool>
    where
        B: SimulatorBackend + ?Sized,
    {
        self.open_or_create_project(backend, ProjectSource::File(path))
    }

    /// Activate (adding if needed) a flowsheet of the open project.
    pub fn select_flowsheet<B>(&mut self, backend: &mut B, name: &str) -> SessionResult<FlowsheetHandle>
    where
        B: SimulatorBackend + ?Sized,
    {
        let project = self.require_project()?;
        let fs = backend
            .add_or_select_flowsheet(project, name)
            .map_err(SessionError::VendorCall)?;
        self.flowsheet = Some(fs);
        debug!(flowsheet = name, "flowsheet selected");
        Ok(fs)
    }

    pub fn save_project<B>(&self, backend: &mut B, path: &Path) -> SessionResult<()>
    where
        B: SimulatorBackend + ?Sized,
    {
        let project = self.require_project()?;
        backend
            .save_project(project, path)
            .map_err(SessionError::VendorCall)?;
        info!(path = %path.display(), "project saved");
        Ok(())
    }

    /// Close the open project and reset the whole session.
    ///
    /// Without a project this is a no-op reported as
    /// [`CloseOutcome::NothingToClose`].
    pub fn close_project<B>(&mut self, backend: &mut B) -> SessionResult<CloseOutcome>
    where
        B: SimulatorBackend + ?Sized,
    {
        let Some(project) = self.project else {
            return Ok(CloseOutcome::NothingToClose);
        };
        backend
            .close_project(project)
            .map_err(SessionError::VendorCall)?;
        self.reset();
        info!("project closed");
        Ok(CloseOutcome::Closed)
    }

    /// Create a stream in the active flowsheet.
    ///
    /// In GUI mode a shape is dropped at `at`, or at the next auto-placement
    /// slot when `at` is `None`; the cursor only advances once the drop
    /// succeeded.
    pub fn create_stream<B>(
        &mut self,
        backend: &mut B,
        name: &str,
        at: Option<ShapePosition>,
    ) -> SessionResult<Placement>
    where
        B: SimulatorBackend + ?Sized,
    {
        let fs = self.require_flowsheet_active()?;
        if !self.gui_mode {
            backend
                .create_stream(fs, name)
                .map_err(SessionError::VendorCall)?;
            return Ok(Placement::DataOnly);
        }
        self.ensure_unused_shape_name(name)?;

        let position = at.unwrap_or_else(|| self.placement.peek());
        let shape = backend
            .drop_stream_shape(fs, name, position)
            .map_err(SessionError::VendorCall)?;
        if at.is_none() {
            self.placement = self.placement.advanced();
        }
        self.register_shape(name, shape);
        Ok(Placement::Drawn { shape, at: position })
    }

    /// Create a unit-operation block in the active flowsheet.
    pub fn create_block<B>(
        &mut self,
        backend: &mut B,
        kind: BlockKind,
        name: &str,
        at: Option<ShapePosition>,
    ) -> SessionResult<Placement>
    where
        B: SimulatorBackend + ?Sized,
    {
        let fs = self.require_flowsheet_active()?;
        if !self.gui_mode {
            backend
                .create_block(fs, kind, name)
                .map_err(SessionError::VendorCall)?;
            return Ok(Placement::DataOnly);
        }
        self.ensure_unused_shape_name(name)?;

        let position = at.unwrap_or(BLOCK_DEFAULT_POSITION);
        let shape = backend
            .drop_block_shape(fs, kind, name, position)
            .map_err(SessionError::VendorCall)?;
        self.register_shape(name, shape);
        Ok(Placement::Drawn { shape, at: position })
    }

    /// Record a named shape, returning the handle it replaced if any.
    pub fn register_shape(&mut self, name: &str, shape: ShapeHandle) -> Option<ShapeHandle> {
        debug!(name, %shape, "shape registered");
        self.named_shapes.insert(name.to_string(), shape)
    }

    /// Forget everything: back to `Disconnected`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn ensure_unused_shape_name(&self, name: &str) -> SessionResult<()> {
        if self.named_shapes.contains_key(name) {
            return Err(SessionError::DuplicateShape {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

/// Best-effort close of a project the state no longer tracks.
fn release_project<B>(backend: &mut B, project: ProjectHandle)
where
    B: SimulatorBackend + ?Sized,
{
    if let Err(err) = backend.close_project(project) {
        warn!(error = %err, "failed to close orphaned project");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FailPoint, MemorySimulator};

    fn ready(with_gui: bool) -> (SessionState, MemorySimulator) {
        let mut sim = MemorySimulator::new();
        let mut state = SessionState::new();
        state.connect(&mut sim, with_gui).unwrap();
        state.create_project(&mut sim, "Main").unwrap();
        (state, sim)
    }

    #[test]
    fn fresh_state_is_disconnected() {
        let state = SessionState::new();
        assert_eq!(state.phase(), SessionPhase::Disconnected);
        assert!(!state.is_connected());
        assert!(!state.has_flowsheet());
        assert_eq!(state.shape_count(), 0);
    }

    #[test]
    fn phases_progress() {
        let mut sim = MemorySimulator::new();
        let mut state = SessionState::new();

        let err = state.create_project(&mut sim, "Main").unwrap_err();
        assert_eq!(err, SessionError::Precondition(Precondition::NotConnected));

        state.connect(&mut sim, false).unwrap();
        assert_eq!(state.phase(), SessionPhase::Connected);
        assert_eq!(state.version(), Some("6.0"));

        state.create_project(&mut sim, "Main").unwrap();
        assert_eq!(state.phase(), SessionPhase::FlowsheetActive);
    }

    #[test]
    fn flowsheet_ops_need_active_flowsheet() {
        let mut sim = MemorySimulator::new();
        let mut state = SessionState::new();
        state.connect(&mut sim, true).unwrap();
        assert_eq!(
            state.create_stream(&mut sim, "S1", None).unwrap_err(),
            SessionError::Precondition(Precondition::NoActiveFlowsheet)
        );
        assert_eq!(
            state
                .select_flowsheet(&mut sim, "Main")
                .unwrap_err(),
            SessionError::Precondition(Precondition::NoProject)
        );
    }

    #[test]
    fn failed_connect_leaves_state_untouched() {
        let (mut state, mut sim) = ready(true);
        sim.fail_on(FailPoint::Connect, "server busy");
        let err = state.connect(&mut sim, false).unwrap_err();
        assert!(matches!(err, SessionError::Connection(_)));
        assert_eq!(state.phase(), SessionPhase::FlowsheetActive);
        assert!(state.gui_mode());
    }

    #[test]
    fn reconnect_resets_after_success() {
        let (mut state, mut sim) = ready(true);
        state.create_stream(&mut sim, "S1", None).unwrap();
        state.connect(&mut sim, false).unwrap();
        assert_eq!(state.phase(), SessionPhase::Connected);
        assert_eq!(state.shape_count(), 0);
        assert!(!state.gui_mode());
        assert_eq!(sim.open_project_count(), 0);
    }

    #[test]
    fn replacing_a_project_closes_the_previous_one() {
        let (mut state, mut sim) = ready(false);
        state.create_project(&mut sim, "B").unwrap();
        assert_eq!(sim.open_project_count(), 1);

        assert_eq!(state.close_project(&mut sim).unwrap(), CloseOutcome::Closed);
        assert_eq!(sim.open_project_count(), 0);
    }

    #[test]
    fn replacement_survives_a_failed_close_of_the_old_project() {
        let (mut state, mut sim) = ready(false);
        let first = state.require_project().unwrap();
        sim.fail_on(FailPoint::CloseProject, "busy");

        state.create_project(&mut sim, "B").unwrap();
        assert_ne!(state.require_project().unwrap(), first);
        assert_eq!(state.phase(), SessionPhase::FlowsheetActive);
    }

    #[test]
    fn failed_flowsheet_closes_orphan_project() {
        let mut sim = MemorySimulator::new();
        let mut state = SessionState::new();
        state.connect(&mut sim, false).unwrap();
        sim.fail_on(FailPoint::AddFlowsheet, "no license");

        let err = state.create_project(&mut sim, "Main").unwrap_err();
        assert_eq!(err.to_string(), "no license");
        assert_eq!(state.phase(), SessionPhase::Connected);
        assert_eq!(sim.open_project_count(), 0);
    }

    #[test]
    fn auto_placement_wraps_rows() {
        let mut cursor = ShapePlacement::default();
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push((cursor.peek().x, cursor.peek().y));
            cursor = cursor.advanced();
        }
        assert_eq!(
            seen,
            vec![(2.0, 5.0), (4.0, 5.0), (6.0, 5.0), (8.0, 5.0), (10.0, 5.0), (2.0, 3.0)]
        );
    }

    #[test]
    fn failed_drop_does_not_advance_cursor() {
        let (mut state, mut sim) = ready(true);
        sim.fail_on(FailPoint::CreateStream, "stencil missing");
        assert!(state.create_stream(&mut sim, "S1", None).is_err());
        assert_eq!(state.placement().peek(), ShapePlacement::START);
        assert_eq!(state.shape_count(), 0);

        sim.clear_failures();
        let placed = state.create_stream(&mut sim, "S1", None).unwrap();
        assert!(matches!(placed, Placement::Drawn { at, .. } if at == ShapePlacement::START));
        assert_eq!(state.placement().peek(), ShapePosition { x: 4.0, y: 5.0 });
    }

    #[test]
    fn explicit_position_keeps_cursor() {
        let (mut state, mut sim) = ready(true);
        let at = ShapePosition { x: 1.0, y: 1.0 };
        let placed = state.create_stream(&mut sim, "S1", Some(at)).unwrap();
        let Placement::Drawn { shape, .. } = placed else {
            panic!("expected a drawn shape");
        };
        assert_eq!(sim.shape_position(shape), Some(at));
        assert_eq!(state.placement().peek(), ShapePlacement::START);
        assert_eq!(state.shape("S1"), Some(shape));
    }

    #[test]
    fn duplicate_shape_name_rejected() {
        let (mut state, mut sim) = ready(true);
        state.create_block(&mut sim, BlockKind::Separator, "V-100", None).unwrap();
        assert_eq!(
            state
                .create_stream(&mut sim, "V-100", None)
                .unwrap_err(),
            SessionError::DuplicateShape {
                name: "V-100".to_string()
            }
        );
    }

    #[test]
    fn data_only_mode_registers_no_shapes() {
        let (mut state, mut sim) = ready(false);
        assert_eq!(
            state.create_stream(&mut sim, "S1", None).unwrap(),
            Placement::DataOnly
        );
        assert_eq!(state.shape_count(), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let (mut state, mut sim) = ready(true);
        assert_eq!(state.close_project(&mut sim).unwrap(), CloseOutcome::Closed);
        assert_eq!(state.phase(), SessionPhase::Disconnected);
        assert_eq!(
            state.close_project(&mut sim).unwrap(),
            CloseOutcome::NothingToClose
        );
        assert_eq!(
            state.close_project(&mut sim).unwrap(),
            CloseOutcome::NothingToClose
        );
    }

    #[test]
    fn reset_twice_is_empty() {
        let (mut state, mut sim) = ready(true);
        state.create_stream(&mut sim, "S1", None).unwrap();
        state.reset();
        state.reset();
        assert_eq!(state.phase(), SessionPhase::Disconnected);
        assert_eq!(state.shape_count(), 0);
        assert!(!state.gui_mode());
        assert_eq!(state.placement(), ShapePlacement::default());
    }

    #[test]
    fn failed_save_is_vendor_error() {
        let (state, mut sim) = ready(false);
        sim.fail_on(FailPoint::SaveProject, "disk full");
        let err = state
            .save_project(&mut sim, Path::new("case.pmx"))
            .unwrap_err();
        assert_eq!(err, SessionError::VendorCall(crate::BackendError::new("disk full")));
    }
}
