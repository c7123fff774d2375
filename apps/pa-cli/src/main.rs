use clap::{Parser, Subcommand, ValueEnum};
use pa_session::{MemorySimulator, SessionRegistry};
use pa_thermo::{
    CompositionBasis, FlowBasis, QuantityKind, catalog, convert_units,
    mass_flows_to_mole_fractions, molar_mass, resolve_composition,
};
use pa_tools::{
    LOG_LEVEL_VAR, OutcomeStatus, Settings, ToolCall, ToolDispatcher, ToolError, ToolOutcome,
    ToolResult, tool_definitions,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Registry, fmt, reload};

#[derive(Parser)]
#[command(name = "pa-cli")]
#[command(about = "procagent CLI - process simulation tools for agents", long_about = None)]
struct Cli {
    /// Settings file (defaults to config/settings.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BasisArg {
    MoleFraction,
    MassFlowKgHr,
}

impl From<BasisArg> for CompositionBasis {
    fn from(arg: BasisArg) -> Self {
        match arg {
            BasisArg::MoleFraction => CompositionBasis::MoleFraction,
            BasisArg::MassFlowKgHr => CompositionBasis::MassFlowKgHr,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a value to SI units
    Convert {
        #[arg(allow_hyphen_values = true)]
        value: f64,
        /// Unit symbol, e.g. C, psi, kmol/hr (case-sensitive)
        unit: String,
        /// temperature, pressure or flow
        kind: String,
    },
    /// Resolve a composition against an ordered component list
    Resolve {
        /// JSON object of component name to value
        #[arg(long)]
        composition: String,
        /// Registered component names, in environment order
        #[arg(long, value_delimiter = ',')]
        components: Vec<String>,
        #[arg(long, value_enum, default_value = "mole-fraction")]
        basis: BasisArg,
    },
    /// Search the component catalog
    Components {
        /// Substring of a name, formula or alias
        query: Option<String>,
    },
    /// List tool definitions
    Tools {
        /// Print fully qualified names only
        #[arg(long)]
        qualified: bool,
    },
    /// Run a YAML or JSON list of tool calls against the in-memory simulator
    Replay {
        script: PathBuf,
        /// Stop at the first failed call
        #[arg(long)]
        stop_on_error: bool,
    },
}

fn main() -> ToolResult<()> {
    let cli = Cli::parse();
    // the env override is the only level known before settings are read
    let bootstrap = std::env::var(LOG_LEVEL_VAR).unwrap_or_else(|_| "info".to_string());
    let log_level = init_tracing(&bootstrap);
    let settings = Settings::load(cli.config.as_deref())
        .inspect_err(|err| error!(error = %err, "failed to load settings"))?;
    apply_log_level(&log_level, &settings.logging.level);

    match cli.command {
        Commands::Convert { value, unit, kind } => cmd_convert(value, &unit, &kind),
        Commands::Resolve {
            composition,
            components,
            basis,
        } => cmd_resolve(&composition, &components, basis.into()),
        Commands::Components { query } => {
            cmd_components(query.as_deref().unwrap_or(""));
            Ok(())
        }
        Commands::Tools { qualified } => cmd_tools(qualified),
        Commands::Replay {
            script,
            stop_on_error,
        } => cmd_replay(&settings, &script, stop_on_error),
    }
}

type LogLevelHandle = reload::Handle<LevelFilter, Registry>;

fn parse_level(level: &str) -> Option<LevelFilter> {
    level.parse::<LevelFilter>().ok()
}

fn init_tracing(level: &str) -> LogLevelHandle {
    let (filter, handle) = reload::Layer::new(parse_level(level).unwrap_or(LevelFilter::INFO));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

fn apply_log_level(handle: &LogLevelHandle, level: &str) {
    let Some(filter) = parse_level(level) else {
        warn!(level, "unknown log level, using info");
        return;
    };
    if let Err(err) = handle.reload(filter) {
        warn!(error = %err, "failed to apply log level");
    }
}

fn cmd_convert(value: f64, unit: &str, kind: &str) -> ToolResult<()> {
    let si = convert_units(value, unit, kind)?;
    let si_unit = match kind.parse::<QuantityKind>()? {
        QuantityKind::Temperature => "K",
        QuantityKind::Pressure => "Pa",
        QuantityKind::Flow => FlowBasis::of_unit(unit)?.si_unit(),
    };
    println!("{value} {unit} = {si} {si_unit}");
    Ok(())
}

fn cmd_resolve(composition: &str, components: &[String], basis: CompositionBasis) -> ToolResult<()> {
    let input: BTreeMap<String, f64> = serde_json::from_str(composition)?;
    let fractions = match basis {
        CompositionBasis::MoleFraction => input,
        CompositionBasis::MassFlowKgHr => mass_flows_to_mole_fractions(&input, molar_mass)?,
    };
    let resolved = resolve_composition(&fractions, components)?;

    println!("Composition ({basis}):");
    for (name, x) in components.iter().zip(&resolved.vector) {
        println!("  {name:<20} {x:.6}");
    }
    if !resolved.is_complete() {
        let unmatched: Vec<&str> = resolved.unmatched.iter().map(String::as_str).collect();
        println!("Unmatched: {}", unmatched.join(", "));
    }
    Ok(())
}

fn cmd_components(query: &str) {
    let matches: Vec<_> = catalog().iter().filter(|e| e.matches_query(query)).collect();
    if matches.is_empty() {
        println!("No components match '{query}'");
        return;
    }
    for entry in matches {
        println!(
            "  {:<18} {:<10} {:>8.3} kg/kmol",
            entry.canonical_name, entry.formula, entry.molar_mass
        );
    }
}

fn cmd_tools(qualified: bool) -> ToolResult<()> {
    for def in tool_definitions() {
        if qualified {
            println!("{}", def.qualified_name());
        } else {
            println!("{:<24} {}", def.name, def.description);
        }
    }
    Ok(())
}

fn load_script(path: &Path) -> ToolResult<Vec<Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ToolError::InvalidArgument(format!("cannot read script {}: {e}", path.display()))
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| ToolError::InvalidArgument(format!("invalid script YAML: {e}")))
    }
}

fn cmd_replay(settings: &Settings, script: &Path, stop_on_error: bool) -> ToolResult<()> {
    let calls = load_script(script)?;
    info!(calls = calls.len(), script = %script.display(), "replaying");

    let dispatcher = ToolDispatcher::from_settings(&settings.promax);
    let mut registry =
        SessionRegistry::new(settings.session.max_sessions, settings.session.timeout_seconds);
    let id = registry.create(Box::new(MemorySimulator::new()))?;

    let mut failures = 0;
    for (index, value) in calls.into_iter().enumerate() {
        let outcome = match ToolCall::from_value(value) {
            Ok(call) => {
                let session = registry.get_mut(id)?;
                dispatcher.dispatch(session, call)
            }
            Err(err) => ToolOutcome::failure(&err),
        };
        let tag = match outcome.status {
            OutcomeStatus::Success => "ok",
            OutcomeStatus::Info => "info",
            OutcomeStatus::Failure => "FAIL",
        };
        println!("[{:>3}] {tag:<4} {}", index + 1, outcome.text.replace('\n', "\n           "));

        if outcome.is_failure() {
            failures += 1;
            if stop_on_error {
                break;
            }
        }
    }

    registry.destroy(id)?;
    if failures > 0 {
        println!("{failures} call(s) failed");
    }
    Ok(())
}
