//! Typed tool calls.
//!
//! A call arrives as JSON, either as one object tagged with `"tool"` or as a
//! tool name plus an argument object. Agents are loose with argument shapes,
//! so a few fields accept more than one form (see [`ComponentList`] and
//! [`CompositionInput`]).

use std::collections::BTreeMap;
use std::path::PathBuf;

use pa_session::PortSide;
use pa_thermo::{CompositionBasis, FlowBasis};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definitions::TOOL_NAMES;
use crate::error::{ToolError, ToolResult};

/// Component names, as a JSON list or one comma-separated string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentList {
    List(Vec<String>),
    Text(String),
}

impl ComponentList {
    /// Trimmed, non-empty names in the order given.
    pub fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            Self::List(items) => items.iter().map(String::as_str).collect(),
            Self::Text(text) => text.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Composition as a JSON object or a JSON-encoded string of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompositionInput {
    Map(BTreeMap<String, f64>),
    Encoded(String),
}

impl CompositionInput {
    pub fn to_map(&self) -> ToolResult<BTreeMap<String, f64>> {
        match self {
            Self::Map(map) => Ok(map.clone()),
            Self::Encoded(text) => serde_json::from_str(text).map_err(|e| {
                ToolError::InvalidArgument(format!("composition is not a JSON object: {e}"))
            }),
        }
    }
}

fn default_flowsheet() -> String {
    "Main".to_string()
}

fn default_temperature_unit() -> String {
    "C".to_string()
}

fn default_pressure_unit() -> String {
    "kPa".to_string()
}

fn default_flow_unit() -> String {
    "kmol/hr".to_string()
}

/// One tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    ConnectPromax {
        /// Falls back to the configured default when absent.
        #[serde(default)]
        with_gui: Option<bool>,
    },
    CreateProject {
        #[serde(default = "default_flowsheet")]
        flowsheet_name: String,
    },
    OpenProject {
        #[serde(alias = "filepath")]
        file_path: PathBuf,
    },
    AddComponents {
        #[serde(alias = "component_names")]
        components: ComponentList,
    },
    ListComponents,
    CreateStream {
        #[serde(alias = "stream_name")]
        name: String,
        #[serde(default, alias = "x_position")]
        x: Option<f64>,
        #[serde(default, alias = "y_position")]
        y: Option<f64>,
    },
    ListStreams,
    CreateBlock {
        block_type: String,
        #[serde(alias = "block_name")]
        name: String,
        #[serde(default)]
        x: Option<f64>,
        #[serde(default)]
        y: Option<f64>,
    },
    ConnectStream {
        stream_name: String,
        block_name: String,
        port: PortSide,
    },
    SetStreamProperties {
        stream_name: String,
        #[serde(default)]
        temperature_c: Option<f64>,
        #[serde(default)]
        pressure_kpa: Option<f64>,
        #[serde(default)]
        molar_flow_kmol_hr: Option<f64>,
    },
    SetStreamTemperature {
        stream_name: String,
        value: f64,
        #[serde(default = "default_temperature_unit")]
        units: String,
    },
    SetStreamPressure {
        stream_name: String,
        value: f64,
        #[serde(default = "default_pressure_unit")]
        units: String,
    },
    SetStreamFlow {
        stream_name: String,
        value: f64,
        /// Inferred from `units` when absent.
        #[serde(default)]
        flow_type: Option<FlowBasis>,
        #[serde(default = "default_flow_unit")]
        units: String,
    },
    SetStreamComposition {
        stream_name: String,
        composition: CompositionInput,
        #[serde(default)]
        basis: CompositionBasis,
    },
    FlashStream {
        stream_name: String,
    },
    GetStreamResults {
        stream_name: String,
    },
    RunSimulation,
    SaveProject {
        #[serde(alias = "file_path")]
        filepath: PathBuf,
    },
    CloseProject,
}

impl ToolCall {
    /// Parse a `{"tool": ..., ...}` object.
    ///
    /// A name outside the tool surface is `UnknownTool`; a known tool with bad
    /// arguments is `InvalidArgument`.
    pub fn from_value(value: Value) -> ToolResult<Self> {
        let name = value
            .get("tool")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArgument("missing \"tool\" field".to_string()))?;
        if !TOOL_NAMES.contains(&name) {
            return Err(ToolError::UnknownTool {
                name: name.to_string(),
            });
        }
        let name = name.to_string();
        serde_json::from_value(value)
            .map_err(|e| ToolError::InvalidArgument(format!("{name}: {e}")))
    }

    /// Parse a tool name plus its argument object.
    pub fn from_parts(name: &str, arguments: Value) -> ToolResult<Self> {
        let mut object = match arguments {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(ToolError::InvalidArgument(format!(
                    "{name}: arguments must be an object, got {other}"
                )));
            }
        };
        object.insert("tool".to_string(), Value::String(name.to_string()));
        Self::from_value(Value::Object(object))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectPromax { .. } => "connect_promax",
            Self::CreateProject { .. } => "create_project",
            Self::OpenProject { .. } => "open_project",
            Self::AddComponents { .. } => "add_components",
            Self::ListComponents => "list_components",
            Self::CreateStream { .. } => "create_stream",
            Self::ListStreams => "list_streams",
            Self::CreateBlock { .. } => "create_block",
            Self::ConnectStream { .. } => "connect_stream",
            Self::SetStreamProperties { .. } => "set_stream_properties",
            Self::SetStreamTemperature { .. } => "set_stream_temperature",
            Self::SetStreamPressure { .. } => "set_stream_pressure",
            Self::SetStreamFlow { .. } => "set_stream_flow",
            Self::SetStreamComposition { .. } => "set_stream_composition",
            Self::FlashStream { .. } => "flash_stream",
            Self::GetStreamResults { .. } => "get_stream_results",
            Self::RunSimulation => "run_simulation",
            Self::SaveProject { .. } => "save_project",
            Self::CloseProject => "close_project",
        }
    }
}
