//! Settings loaded from `config/settings.yaml` plus environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ToolError, ToolResult};

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.yaml";

/// Environment variable overriding `logging.level`.
pub const LOG_LEVEL_VAR: &str = "PROCAGENT_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub model: String,
    pub max_turns: u32,
    pub max_budget_usd: f64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250514".to_string(),
            max_turns: 50,
            max_budget_usd: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromaxSettings {
    /// Start the simulator with its drawing front-end.
    pub with_gui: bool,
    /// Base directory for relative project paths.
    pub working_dir: PathBuf,
}

impl Default for PromaxSettings {
    fn default() -> Self {
        Self {
            with_gui: true,
            working_dir: PathBuf::from("./projects"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub timeout_seconds: u64,
    pub max_sessions: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 3600,
            max_sessions: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `trace`, `debug`, `info`, `warn` or `error` (any case).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub agent: AgentSettings,
    pub promax: PromaxSettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit path must exist. Without one, `config/settings.yaml` is used
    /// when present and defaults otherwise. Environment overrides are applied
    /// last.
    pub fn load(path: Option<&Path>) -> ToolResult<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let candidate = Path::new(DEFAULT_SETTINGS_PATH);
                if candidate.exists() {
                    Self::from_file(candidate)?
                } else {
                    debug!("no settings file found, using defaults");
                    Self::default()
                }
            }
        };
        settings.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> ToolResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ToolError::SettingsRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(path = %path.display(), "loaded settings");
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> ToolResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ToolError::SettingsParse(e.to_string()))
    }

    /// Apply `PROCAGENT_*` overrides read through `var`.
    pub fn apply_overrides<F>(&mut self, var: F) -> ToolResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("PROCAGENT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PROCAGENT_PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                ToolError::SettingsParse(format!("PROCAGENT_PORT is not a port number: {port}"))
            })?;
        }
        if let Some(level) = var(LOG_LEVEL_VAR) {
            self.logging.level = level;
        }
        if let Some(flag) = var("PROCAGENT_WITH_GUI") {
            self.promax.with_gui = parse_flag(&flag).ok_or_else(|| {
                ToolError::SettingsParse(format!("PROCAGENT_WITH_GUI is not a boolean: {flag}"))
            })?;
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
