//! Routing of tool calls onto a session.
//!
//! Flowsheet-scoped tools check the session precondition before touching
//! their arguments, so an agent that forgot to create a project is told so
//! even when its arguments are also wrong.

use std::path::{Path, PathBuf};

use pa_core::{ensure_finite, k, kgps, pa, report};
use pa_session::{
    BLOCK_DEFAULT_POSITION, BlockKind, CloseOutcome, PhaseProperty, Placement, Session,
    SessionState, ShapePosition, SimulatorBackend,
};
use pa_thermo::{
    CompositionBasis, FlowRate, convert_units, flow, mass_flows_to_mole_fractions,
    molar_mass, pressure, resolve_composition, temperature,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::call::{ComponentList, CompositionInput, ToolCall};
use crate::config::PromaxSettings;
use crate::error::{ToolError, ToolResult};
use crate::outcome::ToolOutcome;

/// Executes tool calls against a session.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    default_with_gui: bool,
    working_dir: Option<PathBuf>,
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self {
            default_with_gui: true,
            working_dir: None,
        }
    }
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &PromaxSettings) -> Self {
        Self {
            default_with_gui: settings.with_gui,
            working_dir: Some(settings.working_dir.clone()),
        }
    }

    pub fn with_gui_default(mut self, with_gui: bool) -> Self {
        self.default_with_gui = with_gui;
        self
    }

    /// Relative project paths are resolved against `dir`.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn dispatch(&self, session: &mut Session, call: ToolCall) -> ToolOutcome {
        self.dispatch_on(&mut session.state, session.backend.as_mut(), call)
    }

    /// Run one call. Never fails: errors come back as failure outcomes.
    pub fn dispatch_on(
        &self,
        state: &mut SessionState,
        backend: &mut dyn SimulatorBackend,
        call: ToolCall,
    ) -> ToolOutcome {
        let tool = call.name();
        debug!(tool, phase = %state.phase(), "dispatching tool call");

        match self.run(state, backend, call) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(tool, error = %err, "tool call failed");
                ToolOutcome::failure(&err)
            }
        }
    }

    fn run(
        &self,
        state: &mut SessionState,
        backend: &mut dyn SimulatorBackend,
        call: ToolCall,
    ) -> ToolResult<ToolOutcome> {
        match call {
            ToolCall::ConnectPromax { with_gui } => {
                let with_gui = with_gui.unwrap_or(self.default_with_gui);
                let info = state.connect(backend, with_gui)?;
                let mode = if with_gui { "GUI" } else { "background" };
                Ok(ToolOutcome::success(format!(
                    "Connected to ProMax {} ({mode} mode)",
                    info.version
                )))
            }
            ToolCall::CreateProject { flowsheet_name } => {
                state
                    .create_project(backend, &flowsheet_name)
                    .map_err(ToolError::during("create project"))?;
                Ok(ToolOutcome::success(format!(
                    "Created project with flowsheet '{flowsheet_name}'"
                )))
            }
            ToolCall::OpenProject { file_path } => {
                let path = self.resolve_path(&file_path);
                let has_flowsheet = state
                    .open_project(backend, &path)
                    .map_err(ToolError::during("open project"))?;
                let mut text = format!("Opened project: {}", path.display());
                if !has_flowsheet {
                    text.push_str("\nWarning: project has no flowsheet");
                }
                Ok(ToolOutcome::success(text))
            }
            ToolCall::AddComponents { components } => add_components(state, backend, &components),
            ToolCall::ListComponents => {
                let fs = state.require_flowsheet_active()?;
                let names = backend
                    .component_names(fs)
                    .map_err(|e| vendor("list components", e))?;
                Ok(ToolOutcome::success(serde_json::to_string(&names)?))
            }
            ToolCall::CreateStream { name, x, y } => {
                state.require_flowsheet_active()?;
                let at = explicit_position(x, y, state.placement().peek())?;
                let placed = state
                    .create_stream(backend, &name, at)
                    .map_err(ToolError::during("create stream"))?;
                Ok(ToolOutcome::success(match placed {
                    Placement::Drawn { at, .. } => {
                        format!("Created stream '{name}' at ({:.1}, {:.1})", at.x, at.y)
                    }
                    Placement::DataOnly => format!("Created stream '{name}' (data only)"),
                }))
            }
            ToolCall::ListStreams => {
                let fs = state.require_flowsheet_active()?;
                let names = backend
                    .stream_names(fs)
                    .map_err(|e| vendor("list streams", e))?;
                Ok(ToolOutcome::success(serde_json::to_string(&names)?))
            }
            ToolCall::CreateBlock {
                block_type,
                name,
                x,
                y,
            } => {
                state.require_flowsheet_active()?;
                let kind: BlockKind = block_type.parse().map_err(ToolError::UnknownBlockType)?;
                let at = explicit_position(x, y, BLOCK_DEFAULT_POSITION)?;
                let placed = state
                    .create_block(backend, kind, &name, at)
                    .map_err(ToolError::during("create block"))?;
                Ok(ToolOutcome::success(match placed {
                    Placement::Drawn { at, .. } => {
                        format!("Created {kind} '{name}' at ({:.1}, {:.1})", at.x, at.y)
                    }
                    Placement::DataOnly => format!("Created {kind} '{name}' (data only)"),
                }))
            }
            ToolCall::ConnectStream {
                stream_name,
                block_name,
                port,
            } => {
                let fs = state.require_flowsheet_active()?;
                backend
                    .connect_stream(fs, &stream_name, &block_name, port)
                    .map_err(|e| vendor("connect stream", e))?;
                info!(stream = %stream_name, block = %block_name, %port, "stream connected");
                Ok(ToolOutcome::success(format!(
                    "Connected '{stream_name}' to {port} of '{block_name}'"
                )))
            }
            ToolCall::SetStreamProperties {
                stream_name,
                temperature_c,
                pressure_kpa,
                molar_flow_kmol_hr,
            } => set_stream_properties(
                state,
                backend,
                &stream_name,
                temperature_c,
                pressure_kpa,
                molar_flow_kmol_hr,
            ),
            ToolCall::SetStreamTemperature {
                stream_name,
                value,
                units,
            } => {
                let fs = state.require_flowsheet_active()?;
                let value = ensure_finite(value, "temperature")?;
                let t = temperature(value, &units)?;
                backend
                    .set_stream_property(fs, &stream_name, PhaseProperty::Temperature, t.value)
                    .map_err(|e| vendor("set temperature", e))?;
                Ok(ToolOutcome::success(format!(
                    "Set {stream_name} temperature to {value} {units} ({:.2} K)",
                    t.value
                )))
            }
            ToolCall::SetStreamPressure {
                stream_name,
                value,
                units,
            } => {
                let fs = state.require_flowsheet_active()?;
                let value = ensure_finite(value, "pressure")?;
                let p = pressure(value, &units)?;
                backend
                    .set_stream_property(fs, &stream_name, PhaseProperty::Pressure, p.value)
                    .map_err(|e| vendor("set pressure", e))?;
                Ok(ToolOutcome::success(format!(
                    "Set {stream_name} pressure to {value} {units} ({:.2} kPa)",
                    report::kilopascal(p)
                )))
            }
            ToolCall::SetStreamFlow {
                stream_name,
                value,
                flow_type,
                units,
            } => {
                let fs = state.require_flowsheet_active()?;
                let value = ensure_finite(value, "flow")?;
                let rate = flow(value, &units)?;
                if let Some(declared) = flow_type
                    && declared != rate.basis()
                {
                    return Err(ToolError::InvalidArgument(format!(
                        "flow_type '{declared}' does not match {} unit '{units}'",
                        rate.basis()
                    )));
                }
                let property = match rate {
                    FlowRate::Molar(_) => PhaseProperty::MolarFlow,
                    FlowRate::Mass(_) => PhaseProperty::MassFlow,
                };
                backend
                    .set_stream_property(fs, &stream_name, property, rate.si_value())
                    .map_err(|e| vendor("set flow", e))?;
                Ok(ToolOutcome::success(format!(
                    "Set {stream_name} {} flow to {value} {units} ({:.4} {})",
                    rate.basis(),
                    rate.si_value(),
                    rate.basis().si_unit()
                )))
            }
            ToolCall::SetStreamComposition {
                stream_name,
                composition,
                basis,
            } => set_stream_composition(state, backend, &stream_name, &composition, basis),
            ToolCall::FlashStream { stream_name } => {
                let fs = state.require_flowsheet_active()?;
                backend
                    .flash_stream(fs, &stream_name)
                    .map_err(|e| vendor("flash stream", e))?;
                info!(stream = %stream_name, "flash completed");
                Ok(ToolOutcome::success(format!(
                    "Flash calculation completed for '{stream_name}'"
                )))
            }
            ToolCall::GetStreamResults { stream_name } => {
                let fs = state.require_flowsheet_active()?;
                let results = StreamResults::read(backend, fs, &stream_name)?;
                Ok(ToolOutcome::success(serde_json::to_string_pretty(&results)?))
            }
            ToolCall::RunSimulation => {
                let fs = state.require_flowsheet_active()?;
                let status = backend.solve(fs).map_err(|e| vendor("run simulation", e))?;
                if status.converged() {
                    info!(status = status.0, "simulation converged");
                    Ok(ToolOutcome::success("Simulation converged successfully"))
                } else {
                    warn!(status = status.0, "simulation did not converge");
                    Ok(ToolOutcome::info(format!(
                        "Simulation did not converge. Status code: {}",
                        status.0
                    )))
                }
            }
            ToolCall::SaveProject { filepath } => {
                if !state.has_project() {
                    return Err(ToolError::NoProjectToSave);
                }
                let path = self.resolve_path(&filepath);
                state
                    .save_project(backend, &path)
                    .map_err(ToolError::during("save project"))?;
                Ok(ToolOutcome::success(format!(
                    "Project saved to: {}",
                    path.display()
                )))
            }
            ToolCall::CloseProject => match state
                .close_project(backend)
                .map_err(ToolError::during("close project"))?
            {
                CloseOutcome::Closed => Ok(ToolOutcome::success("Project closed successfully")),
                CloseOutcome::NothingToClose => Ok(ToolOutcome::info("No project to close.")),
            },
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn vendor(action: &'static str, err: pa_session::BackendError) -> ToolError {
    ToolError::Vendor {
        action,
        source: pa_session::SessionError::VendorCall(err),
    }
}

/// Position from partial coordinates; a missing axis is taken from
/// `fallback`. `None` when neither axis was given.
fn explicit_position(
    x: Option<f64>,
    y: Option<f64>,
    fallback: ShapePosition,
) -> ToolResult<Option<ShapePosition>> {
    if x.is_none() && y.is_none() {
        return Ok(None);
    }
    Ok(Some(ShapePosition {
        x: ensure_finite(x.unwrap_or(fallback.x), "x position")?,
        y: ensure_finite(y.unwrap_or(fallback.y), "y position")?,
    }))
}

fn add_components(
    state: &SessionState,
    backend: &mut dyn SimulatorBackend,
    components: &ComponentList,
) -> ToolResult<ToolOutcome> {
    let fs = state.require_flowsheet_active()?;
    let names = components.names();
    if names.is_empty() {
        return Err(ToolError::InvalidArgument("no components given".to_string()));
    }

    let mut added = Vec::new();
    let mut failed = Vec::new();
    for name in names {
        match backend.add_component(fs, &name) {
            Ok(()) => added.push(name),
            Err(err) => failed.push(format!("{name}: {err}")),
        }
    }

    let mut text = format!("Added {} components: {}", added.len(), added.join(", "));
    if !failed.is_empty() {
        warn!(failed = failed.len(), "some components were not added");
        text.push_str(&format!("\nFailed: {}", failed.join("; ")));
    }
    info!(added = added.len(), "components added");
    Ok(ToolOutcome::success(text))
}

fn set_stream_properties(
    state: &SessionState,
    backend: &mut dyn SimulatorBackend,
    stream: &str,
    temperature_c: Option<f64>,
    pressure_kpa: Option<f64>,
    molar_flow_kmol_hr: Option<f64>,
) -> ToolResult<ToolOutcome> {
    let fs = state.require_flowsheet_active()?;

    // Convert everything before the first write.
    let mut writes = Vec::new();
    if let Some(t) = temperature_c {
        let t = ensure_finite(t, "temperature_c")?;
        let si = convert_units(t, "C", "temperature")?;
        writes.push((PhaseProperty::Temperature, si, format!("T={t}°C")));
    }
    if let Some(p) = pressure_kpa {
        let p = ensure_finite(p, "pressure_kpa")?;
        let si = convert_units(p, "kPa", "pressure")?;
        writes.push((PhaseProperty::Pressure, si, format!("P={p}kPa")));
    }
    if let Some(f) = molar_flow_kmol_hr {
        let f = ensure_finite(f, "molar_flow_kmol_hr")?;
        let si = convert_units(f, "kmol/hr", "flow")?;
        writes.push((PhaseProperty::MolarFlow, si, format!("F={f}kmol/hr")));
    }
    if writes.is_empty() {
        return Err(ToolError::InvalidArgument(
            "no properties given; pass temperature_c, pressure_kpa or molar_flow_kmol_hr"
                .to_string(),
        ));
    }

    let mut applied: Vec<String> = Vec::with_capacity(writes.len());
    for (property, si_value, label) in writes {
        if let Err(err) = backend.set_stream_property(fs, stream, property, si_value) {
            if applied.is_empty() {
                return Err(vendor("set stream properties", err));
            }
            warn!(stream, applied = %applied.join(", "), "stream properties partially written");
            return Err(ToolError::PartialWrite {
                action: "set stream properties",
                applied: applied.join(", "),
                source: pa_session::SessionError::VendorCall(err),
            });
        }
        applied.push(label);
    }
    let text = format!("Set {stream} properties: {}", applied.join(", "));
    info!("{text}");
    Ok(ToolOutcome::success(text))
}

fn set_stream_composition(
    state: &SessionState,
    backend: &mut dyn SimulatorBackend,
    stream: &str,
    composition: &CompositionInput,
    basis: CompositionBasis,
) -> ToolResult<ToolOutcome> {
    let fs = state.require_flowsheet_active()?;
    let input = composition.to_map()?;
    for value in input.values() {
        ensure_finite(*value, "composition value")?;
    }

    let fractions = match basis {
        CompositionBasis::MoleFraction => input,
        CompositionBasis::MassFlowKgHr => {
            let backend_ref: &dyn SimulatorBackend = backend;
            mass_flows_to_mole_fractions(&input, |name| {
                backend_ref
                    .component_molar_mass(fs, name)
                    .ok()
                    .flatten()
                    .or_else(|| molar_mass(name))
            })?
        }
    };

    let registry = backend
        .component_names(fs)
        .map_err(|e| vendor("set composition", e))?;
    let resolved = resolve_composition(&fractions, &registry)?;
    backend
        .set_stream_composition(fs, stream, &resolved.vector)
        .map_err(|e| vendor("set composition", e))?;

    let mut text = format!(
        "Set {stream} composition ({} components)",
        resolved.matched.len()
    );
    if !resolved.is_complete() {
        let unmatched: Vec<&str> = resolved.unmatched.iter().map(String::as_str).collect();
        warn!(stream, unmatched = ?unmatched, "composition names not in environment");
        text.push_str(&format!(
            "\nWarning: Unmatched components: {}",
            unmatched.join(", ")
        ));
    }
    info!(stream, basis = %basis, "composition set");
    Ok(ToolOutcome::success(text))
}

/// Stream results in the units the agent works in.
#[derive(Debug, Serialize)]
struct StreamResults {
    stream_name: String,
    temperature_c: Option<f64>,
    pressure_kpa: Option<f64>,
    molar_flow_kmol_hr: Option<f64>,
    mass_flow_kg_hr: Option<f64>,
}

impl StreamResults {
    fn read(
        backend: &dyn SimulatorBackend,
        fs: pa_core::FlowsheetHandle,
        stream: &str,
    ) -> ToolResult<Self> {
        let get = |property| {
            backend
                .stream_property(fs, stream, property)
                .map_err(|e| vendor("get stream results", e))
        };
        Ok(Self {
            stream_name: stream.to_string(),
            temperature_c: get(PhaseProperty::Temperature)?.map(|v| report::celsius(k(v))),
            pressure_kpa: get(PhaseProperty::Pressure)?.map(|v| report::kilopascal(pa(v))),
            molar_flow_kmol_hr: get(PhaseProperty::MolarFlow)?.map(report::kmol_per_hour),
            mass_flow_kg_hr: get(PhaseProperty::MassFlow)?
                .map(|v| report::kilogram_per_hour(kgps(v))),
        })
    }
}
