//! Tool names, descriptions and argument schemas as presented to the agent.

use serde::Serialize;
use serde_json::{Value, json};

use pa_session::BlockKind;

/// Name under which the tools are registered with the agent host.
pub const SERVER_NAME: &str = "promax";

pub const TOOL_NAMES: [&str; 19] = [
    "connect_promax",
    "create_project",
    "open_project",
    "add_components",
    "list_components",
    "create_stream",
    "list_streams",
    "create_block",
    "connect_stream",
    "set_stream_properties",
    "set_stream_temperature",
    "set_stream_pressure",
    "set_stream_flow",
    "set_stream_composition",
    "flash_stream",
    "get_stream_results",
    "run_simulation",
    "save_project",
    "close_project",
];

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

impl ToolDefinition {
    /// `mcp__<server>__<tool>`, the form agent hosts use in allow-lists.
    pub fn qualified_name(&self) -> String {
        qualified(self.name)
    }
}

fn qualified(name: &str) -> String {
    format!("mcp__{SERVER_NAME}__{name}")
}

fn string() -> Value {
    json!({"type": "string"})
}

fn number() -> Value {
    json!({"type": "number"})
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({"type": "object", "properties": properties, "required": required})
}

fn stream_only() -> Value {
    object(json!({"stream_name": string()}), &["stream_name"])
}

fn define(name: &'static str, description: &'static str, parameters: Value) -> ToolDefinition {
    ToolDefinition {
        name,
        description,
        parameters,
    }
}

/// All tool definitions, in [`TOOL_NAMES`] order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let block_types: Vec<&str> = BlockKind::ALL.iter().map(|k| k.as_str()).collect();

    vec![
        define(
            "connect_promax",
            "Initialize connection to ProMax. MUST be called first before any other ProMax operation.",
            object(json!({"with_gui": {"type": "boolean"}}), &[]),
        ),
        define(
            "create_project",
            "Create a new ProMax project with a flowsheet",
            object(json!({"flowsheet_name": string()}), &[]),
        ),
        define(
            "open_project",
            "Open an existing ProMax project file (.pmx)",
            object(json!({"file_path": string()}), &["file_path"]),
        ),
        define(
            "add_components",
            "Add chemical components to the flowsheet environment. Components must be added before setting stream compositions.",
            object(
                json!({"components": {"type": ["array", "string"], "items": string()}}),
                &["components"],
            ),
        ),
        define(
            "list_components",
            "List the components in the flowsheet environment, in environment order",
            object(json!({}), &[]),
        ),
        define(
            "create_stream",
            "Create a new process stream in the flowsheet. Auto-positioned on the page when x/y are omitted.",
            object(
                json!({"name": string(), "x": number(), "y": number()}),
                &["name"],
            ),
        ),
        define(
            "list_streams",
            "List all process streams in the flowsheet",
            object(json!({}), &[]),
        ),
        define(
            "create_block",
            "Create a unit operation block in the flowsheet",
            object(
                json!({
                    "block_type": {"type": "string", "enum": block_types},
                    "name": string(),
                    "x": number(),
                    "y": number(),
                }),
                &["block_type", "name"],
            ),
        ),
        define(
            "connect_stream",
            "Attach a stream to the inlet or outlet side of a block",
            object(
                json!({
                    "stream_name": string(),
                    "block_name": string(),
                    "port": {"type": "string", "enum": ["inlet", "outlet"]},
                }),
                &["stream_name", "block_name", "port"],
            ),
        ),
        define(
            "set_stream_properties",
            "Set physical properties of a process stream (temperature, pressure, flow rate)",
            object(
                json!({
                    "stream_name": string(),
                    "temperature_c": number(),
                    "pressure_kpa": number(),
                    "molar_flow_kmol_hr": number(),
                }),
                &["stream_name"],
            ),
        ),
        define(
            "set_stream_temperature",
            "Set the temperature of a process stream. Units: K, C, F, R.",
            object(
                json!({"stream_name": string(), "value": number(), "units": string()}),
                &["stream_name", "value"],
            ),
        ),
        define(
            "set_stream_pressure",
            "Set the pressure of a process stream. Units: Pa, kPa, bar, atm, psi, kg/cm2, kg/cm2(g) (gauge).",
            object(
                json!({"stream_name": string(), "value": number(), "units": string()}),
                &["stream_name", "value"],
            ),
        ),
        define(
            "set_stream_flow",
            "Set the molar or mass flow rate of a process stream. Units: mol/s, kmol/hr, kg/s, kg/hr.",
            object(
                json!({
                    "stream_name": string(),
                    "value": number(),
                    "flow_type": {"type": "string", "enum": ["molar", "mass"]},
                    "units": string(),
                }),
                &["stream_name", "value"],
            ),
        ),
        define(
            "set_stream_composition",
            "Set the composition of a stream. With basis mole_fraction (default) values must sum to 1.0; with mass_flow_kg_hr they are component mass flows.",
            object(
                json!({
                    "stream_name": string(),
                    "composition": {"type": ["object", "string"], "additionalProperties": number()},
                    "basis": {"type": "string", "enum": ["mole_fraction", "mass_flow_kg_hr"]},
                }),
                &["stream_name", "composition"],
            ),
        ),
        define(
            "flash_stream",
            "Flash a stream to establish thermodynamic equilibrium. Call after setting T, P, and composition.",
            stream_only(),
        ),
        define(
            "get_stream_results",
            "Get results for a stream (temperature, pressure, molar and mass flow)",
            stream_only(),
        ),
        define(
            "run_simulation",
            "Run the flowsheet solver to calculate all blocks and streams",
            object(json!({}), &[]),
        ),
        define(
            "save_project",
            "Save the current project to a .pmx file",
            object(json!({"filepath": string()}), &["filepath"]),
        ),
        define(
            "close_project",
            "Close the current ProMax project",
            object(json!({}), &[]),
        ),
    ]
}

/// Fully qualified names of every tool, for the agent's allow-list.
pub fn allowed_tools() -> Vec<String> {
    TOOL_NAMES.iter().map(|name| qualified(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_follow_name_table() {
        let names: Vec<&str> = tool_definitions().iter().map(|d| d.name).collect();
        assert_eq!(names, TOOL_NAMES);
    }

    #[test]
    fn allow_list_is_qualified() {
        let allowed = allowed_tools();
        assert_eq!(allowed.len(), TOOL_NAMES.len());
        assert!(allowed.contains(&"mcp__promax__connect_promax".to_string()));
        assert!(allowed.iter().all(|name| name.starts_with("mcp__promax__")));
    }

    #[test]
    fn schemas_are_objects() {
        for def in tool_definitions() {
            assert_eq!(def.parameters["type"], "object", "{}", def.name);
            assert!(!def.description.is_empty());
        }
    }
}
