//! In-process simulator backend.
//!
//! Models just enough of the vendor's object model to exercise the session
//! and the tool dispatcher without the real application: an ordered
//! component environment, streams with total-phase properties and a
//! composition vector, blocks with port connections, shapes in GUI mode, and
//! project files persisted as JSON.
//!
//! Failures can be injected per operation with [`MemorySimulator::fail_on`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use pa_core::handle::{
    ConnectionHandle, FlowsheetHandle, Handle, HandleAllocator, ProjectHandle, ShapeHandle,
};
use pa_thermo::catalog::lookup_component;
use serde::{Deserialize, Serialize};

use crate::backend::{
    BackendError, BackendResult, ConnectionInfo, PhaseProperty, PortSide, ShapePosition,
    SimulatorBackend, SolverStatus,
};
use crate::blocks::BlockKind;

const STREAM_STENCIL: &str = "Streams.vss";

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Connect,
    NewProject,
    OpenProject,
    SaveProject,
    CloseProject,
    AddFlowsheet,
    AddComponent,
    CreateStream,
    CreateBlock,
    ConnectStream,
    SetProperty,
    SetComposition,
    Flash,
    Solve,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StreamRecord {
    /// Keyed by vendor property index.
    #[serde(default)]
    properties: BTreeMap<i32, f64>,
    #[serde(default)]
    composition: Option<Vec<f64>>,
    #[serde(default)]
    flashed: bool,
}

impl StreamRecord {
    fn get(&self, property: PhaseProperty) -> Option<f64> {
        self.properties.get(&property.vendor_index()).copied()
    }

    fn set(&mut self, property: PhaseProperty, value: f64) {
        self.properties.insert(property.vendor_index(), value);
    }

    fn missing_input(&self) -> Option<&'static str> {
        if self.get(PhaseProperty::Temperature).is_none() {
            Some("temperature")
        } else if self.get(PhaseProperty::Pressure).is_none() {
            Some("pressure")
        } else if self.composition.is_none() {
            Some("composition")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlockRecord {
    kind: BlockKind,
    #[serde(default)]
    inlets: Vec<String>,
    #[serde(default)]
    outlets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FlowsheetRecord {
    name: String,
    #[serde(default)]
    components: Vec<String>,
    #[serde(default)]
    streams: BTreeMap<String, StreamRecord>,
    #[serde(default)]
    blocks: BTreeMap<String, BlockRecord>,
}

impl FlowsheetRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            components: Vec::new(),
            streams: BTreeMap::new(),
            blocks: BTreeMap::new(),
        }
    }

    fn stream(&self, name: &str) -> BackendResult<&StreamRecord> {
        self.streams
            .get(name)
            .ok_or_else(|| BackendError::new(format!("Stream '{name}' not found")))
    }

    fn stream_mut(&mut self, name: &str) -> BackendResult<&mut StreamRecord> {
        self.streams
            .get_mut(name)
            .ok_or_else(|| BackendError::new(format!("Stream '{name}' not found")))
    }

    fn add_stream(&mut self, name: &str) -> BackendResult<()> {
        if self.streams.contains_key(name) {
            return Err(BackendError::new(format!("Stream '{name}' already exists")));
        }
        self.streams.insert(name.to_string(), StreamRecord::default());
        Ok(())
    }

    fn add_block(&mut self, kind: BlockKind, name: &str) -> BackendResult<()> {
        if self.blocks.contains_key(name) {
            return Err(BackendError::new(format!("Block '{name}' already exists")));
        }
        self.blocks.insert(
            name.to_string(),
            BlockRecord {
                kind,
                inlets: Vec::new(),
                outlets: Vec::new(),
            },
        );
        Ok(())
    }

    /// Mixture molecular weight (kg/kmol) from a molar composition.
    fn mixture_molar_mass(&self, composition: &[f64]) -> Option<f64> {
        let mut mw = 0.0;
        for (name, x) in self.components.iter().zip(composition) {
            mw += x * lookup_component(name)?.molar_mass;
        }
        (mw > 0.0).then_some(mw)
    }

    fn flash(&mut self, name: &str) -> BackendResult<()> {
        let stream = self.stream(name)?;
        if let Some(missing) = stream.missing_input() {
            return Err(BackendError::new(format!(
                "Stream '{name}' is underspecified: missing {missing}"
            )));
        }
        let mw = stream
            .composition
            .as_deref()
            .and_then(|x| self.mixture_molar_mass(x));

        let stream = self.stream_mut(name)?;
        // Fill whichever flow basis is missing from the other.
        if let Some(mw) = mw {
            match (
                stream.get(PhaseProperty::MolarFlow),
                stream.get(PhaseProperty::MassFlow),
            ) {
                (Some(mol_s), None) => stream.set(PhaseProperty::MassFlow, mol_s * mw / 1000.0),
                (None, Some(kg_s)) => stream.set(PhaseProperty::MolarFlow, kg_s * 1000.0 / mw),
                _ => {}
            }
        }
        stream.flashed = true;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProjectRecord {
    #[serde(default)]
    flowsheets: Vec<FlowsheetRecord>,
}

/// In-memory [`SimulatorBackend`].
#[derive(Debug, Default)]
pub struct MemorySimulator {
    handles: HandleAllocator,
    connection: Option<ConnectionHandle>,
    gui: bool,
    projects: HashMap<ProjectHandle, ProjectRecord>,
    flowsheets: HashMap<FlowsheetHandle, (ProjectHandle, usize)>,
    shapes: HashMap<ShapeHandle, (String, ShapePosition)>,
    failures: HashMap<FailPoint, String>,
}

impl MemorySimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `point` fail with `message`.
    pub fn fail_on(&mut self, point: FailPoint, message: impl Into<String>) {
        self.failures.insert(point, message.into());
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    pub fn open_project_count(&self) -> usize {
        self.projects.len()
    }

    /// Position of a dropped shape, for inspection.
    pub fn shape_position(&self, shape: ShapeHandle) -> Option<ShapePosition> {
        self.shapes.get(&shape).map(|(_, at)| *at)
    }

    /// Names of streams attached to a block side, for inspection.
    pub fn block_ports(&self, fs: FlowsheetHandle, block: &str, side: PortSide) -> Vec<String> {
        self.flowsheet(fs)
            .ok()
            .and_then(|sheet| sheet.blocks.get(block))
            .map(|b| match side {
                PortSide::Inlet => b.inlets.clone(),
                PortSide::Outlet => b.outlets.clone(),
            })
            .unwrap_or_default()
    }

    fn check(&self, point: FailPoint) -> BackendResult<()> {
        match self.failures.get(&point) {
            Some(message) => Err(BackendError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn allocate(&mut self) -> BackendResult<Handle> {
        self.handles
            .allocate()
            .ok_or_else(|| BackendError::new("handle space exhausted"))
    }

    fn check_connection(&self, conn: ConnectionHandle) -> BackendResult<()> {
        if self.connection == Some(conn) {
            Ok(())
        } else {
            Err(BackendError::new("stale or unknown connection"))
        }
    }

    fn register_project(&mut self, record: ProjectRecord) -> BackendResult<ProjectHandle> {
        let project = self.allocate()?;
        for index in 0..record.flowsheets.len() {
            let fs = self.allocate()?;
            self.flowsheets.insert(fs, (project, index));
        }
        self.projects.insert(project, record);
        Ok(project)
    }

    fn project(&self, project: ProjectHandle) -> BackendResult<&ProjectRecord> {
        self.projects
            .get(&project)
            .ok_or_else(|| BackendError::new("project is not open"))
    }

    fn flowsheet(&self, fs: FlowsheetHandle) -> BackendResult<&FlowsheetRecord> {
        let (project, index) = self
            .flowsheets
            .get(&fs)
            .copied()
            .ok_or_else(|| BackendError::new("unknown flowsheet"))?;
        self.project(project)?
            .flowsheets
            .get(index)
            .ok_or_else(|| BackendError::new("unknown flowsheet"))
    }

    fn flowsheet_mut(&mut self, fs: FlowsheetHandle) -> BackendResult<&mut FlowsheetRecord> {
        let (project, index) = self
            .flowsheets
            .get(&fs)
            .copied()
            .ok_or_else(|| BackendError::new("unknown flowsheet"))?;
        self.projects
            .get_mut(&project)
            .and_then(|p| p.flowsheets.get_mut(index))
            .ok_or_else(|| BackendError::new("unknown flowsheet"))
    }

    fn require_stencil(&self, stencil: &str) -> BackendResult<()> {
        if self.gui {
            Ok(())
        } else {
            Err(BackendError::new(format!("Stencil '{stencil}' not loaded.")))
        }
    }

    fn drop_shape(&mut self, name: &str, at: ShapePosition) -> BackendResult<ShapeHandle> {
        let shape = self.allocate()?;
        self.shapes.insert(shape, (name.to_string(), at));
        Ok(shape)
    }
}

impl SimulatorBackend for MemorySimulator {
    fn connect(&mut self, with_gui: bool) -> BackendResult<ConnectionInfo> {
        self.check(FailPoint::Connect)?;
        let handle = self.allocate()?;
        self.connection = Some(handle);
        self.gui = with_gui;
        Ok(ConnectionInfo {
            handle,
            version: "6.0".to_string(),
        })
    }

    fn new_project(&mut self, conn: ConnectionHandle) -> BackendResult<ProjectHandle> {
        self.check(FailPoint::NewProject)?;
        self.check_connection(conn)?;
        self.register_project(ProjectRecord::default())
    }

    fn open_project(&mut self, conn: ConnectionHandle, path: &Path) -> BackendResult<ProjectHandle> {
        self.check(FailPoint::OpenProject)?;
        self.check_connection(conn)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| BackendError::new(format!("Cannot open '{}': {e}", path.display())))?;
        let record: ProjectRecord = serde_json::from_str(&content)
            .map_err(|e| BackendError::new(format!("Corrupt project file: {e}")))?;
        self.register_project(record)
    }

    fn save_project(&mut self, project: ProjectHandle, path: &Path) -> BackendResult<()> {
        self.check(FailPoint::SaveProject)?;
        let content = serde_json::to_string_pretty(self.project(project)?)
            .map_err(|e| BackendError::new(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| BackendError::new(format!("Cannot write '{}': {e}", path.display())))
    }

    fn close_project(&mut self, project: ProjectHandle) -> BackendResult<()> {
        self.check(FailPoint::CloseProject)?;
        self.projects
            .remove(&project)
            .ok_or_else(|| BackendError::new("project is not open"))?;
        self.flowsheets.retain(|_, (owner, _)| *owner != project);
        Ok(())
    }

    fn add_or_select_flowsheet(
        &mut self,
        project: ProjectHandle,
        name: &str,
    ) -> BackendResult<FlowsheetHandle> {
        self.check(FailPoint::AddFlowsheet)?;
        let existing = self
            .project(project)?
            .flowsheets
            .iter()
            .position(|sheet| sheet.name == name);
        let index = match existing {
            Some(index) => index,
            None => {
                let record = self
                    .projects
                    .get_mut(&project)
                    .ok_or_else(|| BackendError::new("project is not open"))?;
                record.flowsheets.push(FlowsheetRecord::new(name));
                record.flowsheets.len() - 1
            }
        };
        if let Some((fs, _)) = self
            .flowsheets
            .iter()
            .find(|(_, entry)| **entry == (project, index))
        {
            return Ok(*fs);
        }
        let fs = self.allocate()?;
        self.flowsheets.insert(fs, (project, index));
        Ok(fs)
    }

    fn first_flowsheet(&mut self, project: ProjectHandle) -> BackendResult<Option<FlowsheetHandle>> {
        self.project(project)?;
        Ok(self
            .flowsheets
            .iter()
            .find(|(_, entry)| **entry == (project, 0))
            .map(|(fs, _)| *fs))
    }

    fn add_component(&mut self, fs: FlowsheetHandle, name: &str) -> BackendResult<()> {
        self.check(FailPoint::AddComponent)?;
        let entry = lookup_component(name).ok_or_else(|| {
            BackendError::new(format!("Component '{name}' not found in the species database"))
        })?;
        let sheet = self.flowsheet_mut(fs)?;
        if sheet.components.iter().any(|c| c == entry.canonical_name) {
            return Err(BackendError::new(format!(
                "Component '{}' is already in the environment",
                entry.canonical_name
            )));
        }
        sheet.components.push(entry.canonical_name.to_string());
        // Existing compositions gain a zero slot so vectors stay aligned.
        for stream in sheet.streams.values_mut() {
            if let Some(x) = stream.composition.as_mut() {
                x.push(0.0);
            }
        }
        Ok(())
    }

    fn component_names(&self, fs: FlowsheetHandle) -> BackendResult<Vec<String>> {
        Ok(self.flowsheet(fs)?.components.clone())
    }

    fn component_molar_mass(&self, fs: FlowsheetHandle, name: &str) -> BackendResult<Option<f64>> {
        let sheet = self.flowsheet(fs)?;
        Ok(lookup_component(name)
            .filter(|entry| sheet.components.iter().any(|c| c == entry.canonical_name))
            .map(|entry| entry.molar_mass))
    }

    fn create_stream(&mut self, fs: FlowsheetHandle, name: &str) -> BackendResult<()> {
        self.check(FailPoint::CreateStream)?;
        self.flowsheet_mut(fs)?.add_stream(name)
    }

    fn drop_stream_shape(
        &mut self,
        fs: FlowsheetHandle,
        name: &str,
        at: ShapePosition,
    ) -> BackendResult<ShapeHandle> {
        self.check(FailPoint::CreateStream)?;
        self.require_stencil(STREAM_STENCIL)?;
        self.flowsheet_mut(fs)?.add_stream(name)?;
        self.drop_shape(name, at)
    }

    fn create_block(&mut self, fs: FlowsheetHandle, kind: BlockKind, name: &str) -> BackendResult<()> {
        self.check(FailPoint::CreateBlock)?;
        self.flowsheet_mut(fs)?.add_block(kind, name)
    }

    fn drop_block_shape(
        &mut self,
        fs: FlowsheetHandle,
        kind: BlockKind,
        name: &str,
        at: ShapePosition,
    ) -> BackendResult<ShapeHandle> {
        self.check(FailPoint::CreateBlock)?;
        self.require_stencil(kind.stencil())?;
        self.flowsheet_mut(fs)?.add_block(kind, name)?;
        self.drop_shape(name, at)
    }

    fn connect_stream(
        &mut self,
        fs: FlowsheetHandle,
        stream: &str,
        block: &str,
        side: PortSide,
    ) -> BackendResult<()> {
        self.check(FailPoint::ConnectStream)?;
        let sheet = self.flowsheet_mut(fs)?;
        sheet.stream(stream)?;
        let record = sheet
            .blocks
            .get_mut(block)
            .ok_or_else(|| BackendError::new(format!("Block '{block}' not found")))?;
        let ports = match side {
            PortSide::Inlet => &mut record.inlets,
            PortSide::Outlet => &mut record.outlets,
        };
        if !ports.iter().any(|s| s == stream) {
            ports.push(stream.to_string());
        }
        Ok(())
    }

    fn stream_names(&self, fs: FlowsheetHandle) -> BackendResult<Vec<String>> {
        Ok(self.flowsheet(fs)?.streams.keys().cloned().collect())
    }

    fn set_stream_property(
        &mut self,
        fs: FlowsheetHandle,
        stream: &str,
        property: PhaseProperty,
        si_value: f64,
    ) -> BackendResult<()> {
        self.check(FailPoint::SetProperty)?;
        let absolute = matches!(property, PhaseProperty::Temperature | PhaseProperty::Pressure);
        if absolute && si_value <= 0.0 {
            return Err(BackendError::new(format!(
                "Absolute {property} must be positive, got {si_value}"
            )));
        }
        let record = self.flowsheet_mut(fs)?.stream_mut(stream)?;
        record.set(property, si_value);
        record.flashed = false;
        Ok(())
    }

    fn stream_property(
        &self,
        fs: FlowsheetHandle,
        stream: &str,
        property: PhaseProperty,
    ) -> BackendResult<Option<f64>> {
        Ok(self.flowsheet(fs)?.stream(stream)?.get(property))
    }

    fn set_stream_composition(
        &mut self,
        fs: FlowsheetHandle,
        stream: &str,
        mole_fractions: &[f64],
    ) -> BackendResult<()> {
        self.check(FailPoint::SetComposition)?;
        let sheet = self.flowsheet_mut(fs)?;
        if mole_fractions.len() != sheet.components.len() {
            return Err(BackendError::new(format!(
                "Composition has {} values but the environment has {} components",
                mole_fractions.len(),
                sheet.components.len()
            )));
        }
        let record = sheet.stream_mut(stream)?;
        record.composition = Some(mole_fractions.to_vec());
        record.flashed = false;
        Ok(())
    }

    fn flash_stream(&mut self, fs: FlowsheetHandle, stream: &str) -> BackendResult<()> {
        self.check(FailPoint::Flash)?;
        self.flowsheet_mut(fs)?.flash(stream)
    }

    fn solve(&mut self, fs: FlowsheetHandle) -> BackendResult<SolverStatus> {
        self.check(FailPoint::Solve)?;
        let sheet = self.flowsheet_mut(fs)?;
        let names: Vec<String> = sheet.streams.keys().cloned().collect();
        let mut converged = true;
        for name in names {
            if sheet.flash(&name).is_err() {
                converged = false;
            }
        }
        Ok(SolverStatus(if converged { 1 } else { 0 }))
    }
}
