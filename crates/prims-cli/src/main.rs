//! prims - inspect a declarative memory snapshot from the command line.
//!
//! Loads a JSON Lines memory snapshot plus optional buffer contents and
//! reports chunk activations, the outcome of a retrieval request, how every
//! operator matches the current state, or the operator the model would
//! choose next.
//!
//! # Configuration
//!
//! The model configuration comes from `--config`, else `~/.prims/config.toml`
//! when present, else defaults. `PRIMS_*` environment variables (also read
//! from a `.env` file) override either.
//!
//! # Buffers file
//!
//! A JSON object keyed by buffer name. A string value places a copy of that
//! memory chunk in the buffer; an object value builds a chunk from its slots:
//!
//! ```json
//! { "goal": { "slot1": "count-goal", "slot2": "3" }, "retrieval": "fact1" }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use prims_core::operator::build_state_snapshot;
use prims_core::{
    ActivationBreakdown, BufferName, Buffers, DeclarativeMemory, ModelConfig, OperatorSelector,
    OperatorStrategy, RetrievalOutcome, TracingSink,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt as log_fmt, prelude::*, EnvFilter};

/// Inspect activation, retrieval and operator selection over a memory snapshot
#[derive(Parser, Debug)]
#[command(name = "prims")]
#[command(about = "Inspect activation, retrieval and operator selection over a memory snapshot")]
struct Cli {
    /// Memory snapshot in JSON Lines
    #[arg(long, short = 'm')]
    memory: PathBuf,

    /// Buffer contents as JSON
    #[arg(long, short = 'b')]
    buffers: Option<PathBuf>,

    /// Model configuration file (.toml, .json or .yaml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Model time in seconds
    #[arg(long, short = 't', default_value_t = 0.0)]
    time: f64,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log debug output, including the model trace
    #[arg(long, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Activation of chunks, split into its components
    Activation {
        /// Chunks to report; every chunk when omitted
        names: Vec<String>,
    },
    /// Retrieve the most active chunk matching every requested slot
    Retrieve {
        /// Request slots as slot=value, e.g. isa=fact slot1=seven
        #[arg(required = true, value_parser = parse_slot)]
        slots: Vec<(String, String)>,
    },
    /// Score every operator's condition against the current buffers
    Rank,
    /// Choose the next operator for the current buffers
    Select {
        /// Override the configured strategy (match_score or activation)
        #[arg(long, value_parser = parse_strategy)]
        strategy: Option<OperatorStrategy>,
    },
}

fn parse_slot(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((slot, value)) if !slot.is_empty() && !value.is_empty() => {
            Ok((slot.to_string(), value.to_string()))
        }
        _ => Err(format!("expected slot=value, got '{}'", arg)),
    }
}

fn parse_strategy(arg: &str) -> Result<OperatorStrategy, String> {
    arg.parse()
        .map_err(|_| format!("unknown strategy '{}'", arg))
}

/// One buffer entry in the buffers file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BufferContents {
    Chunk(String),
    Slots(BTreeMap<String, String>),
}

fn load_config(path: Option<&Path>) -> Result<ModelConfig> {
    let config = match path {
        Some(path) => ModelConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ModelConfig::load_default().context("Failed to load default config")?,
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn load_memory(config: &ModelConfig, path: &Path) -> Result<DeclarativeMemory> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut memory = DeclarativeMemory::new(config.declarative.clone());
    let stats = memory.import_from(BufReader::new(file))?;
    for error in &stats.errors {
        warn!("{}", error);
    }
    info!(
        imported = stats.imported,
        total = stats.total,
        "Loaded memory snapshot"
    );
    Ok(memory)
}

fn load_buffers(memory: &DeclarativeMemory, path: &Path) -> Result<Buffers> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let entries: BTreeMap<String, BufferContents> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid buffers file {}", path.display()))?;

    let mut buffers = Buffers::new();
    for (name, contents) in entries {
        let buffer: BufferName = name
            .parse()
            .with_context(|| {
                format!("Unknown buffer '{}', expected one of: {}", name, BufferName::names().join(", "))
            })?;
        let chunk = match contents {
            BufferContents::Chunk(chunk) => memory.require(&chunk)?.clone(),
            BufferContents::Slots(slots) => slots.iter().fold(
                memory.new_chunk(format!("{}-contents", name)),
                |chunk, (slot, text)| chunk.with_slot(slot.as_str(), memory.resolve_value(text)),
            ),
        };
        buffers.set(buffer, chunk);
    }
    Ok(buffers)
}

#[derive(Debug, Serialize)]
struct ChunkActivation {
    name: String,
    #[serde(flatten)]
    breakdown: ActivationBreakdown,
}

#[derive(Debug, Serialize)]
struct ActivationReport {
    time: f64,
    chunks: Vec<ChunkActivation>,
}

impl fmt::Display for ActivationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Activation at t = {:.3}", self.time)?;
        for c in &self.chunks {
            let b = &c.breakdown;
            writeln!(
                f,
                "  {:<20} A = {:>8.3}  (B = {:.3}, S = {:.3}, noise = {:.3})",
                c.name, b.total, b.base_level, b.spreading, b.noise
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RetrievalReport {
    time: f64,
    chunk: Option<String>,
    activation: Option<f64>,
    latency: f64,
    conflict_set: Vec<(String, f64)>,
}

impl fmt::Display for RetrievalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.chunk, self.activation) {
            (Some(chunk), Some(activation)) => writeln!(
                f,
                "Retrieved {} with activation {:.3} after {:.3}s",
                chunk, activation, self.latency
            )?,
            _ => writeln!(f, "Retrieval failure after {:.3}s", self.latency)?,
        }
        write_conflict_set(f, &self.conflict_set)
    }
}

#[derive(Debug, Serialize)]
struct RankReport {
    best: Option<String>,
    latency: f64,
    ranked: Vec<(String, f64)>,
}

impl fmt::Display for RankReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.best {
            Some(best) => writeln!(f, "Best match {}", best)?,
            None => writeln!(f, "No operator matches, failure after {:.3}s", self.latency)?,
        }
        write_conflict_set(f, &self.ranked)
    }
}

#[derive(Debug, Serialize)]
struct SelectionReport {
    strategy: OperatorStrategy,
    operator: Option<String>,
    action: Option<String>,
    clock: f64,
    conflict_set: Vec<(String, f64)>,
}

impl fmt::Display for SelectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operator {
            Some(op) => writeln!(
                f,
                "Selected {} ({}) at t = {:.3}",
                op,
                self.action.as_deref().unwrap_or("no action"),
                self.clock
            )?,
            None => writeln!(f, "No matching operator found, t = {:.3}", self.clock)?,
        }
        write_conflict_set(f, &self.conflict_set)
    }
}

fn write_conflict_set(f: &mut fmt::Formatter<'_>, conflict_set: &[(String, f64)]) -> fmt::Result {
    if conflict_set.is_empty() {
        return Ok(());
    }
    writeln!(f, "Conflict Set")?;
    for (name, score) in conflict_set {
        writeln!(f, "  {} A = {:.3}", name, score)?;
    }
    Ok(())
}

fn activation(
    memory: &mut DeclarativeMemory,
    buffers: &Buffers,
    time: f64,
    names: Vec<String>,
) -> Result<ActivationReport> {
    let names = if names.is_empty() {
        memory.chunks().map(|c| c.name().to_string()).collect()
    } else {
        names
    };
    let mut chunks = Vec::with_capacity(names.len());
    for name in names {
        let breakdown = memory.activation_breakdown(&name, time, buffers)?;
        chunks.push(ChunkActivation { name, breakdown });
    }
    Ok(ActivationReport { time, chunks })
}

fn retrieve(
    memory: &mut DeclarativeMemory,
    buffers: &Buffers,
    time: f64,
    slots: &[(String, String)],
) -> RetrievalReport {
    let request = slots.iter().fold(memory.new_chunk("request"), |chunk, (slot, text)| {
        chunk.with_slot(slot.as_str(), memory.resolve_value(text))
    });
    let outcome = memory.retrieve(&request, time, buffers);
    RetrievalReport {
        time,
        chunk: outcome.chunk().map(str::to_string),
        activation: match outcome {
            RetrievalOutcome::Retrieved { activation, .. } => Some(activation),
            RetrievalOutcome::Failure { .. } => None,
        },
        latency: outcome.latency(),
        conflict_set: memory.conflict_set().to_vec(),
    }
}

/// Rank without selecting: no finsts, clock or buffer changes.
fn rank(config: &ModelConfig, memory: &mut DeclarativeMemory, buffers: &Buffers) -> RankReport {
    let selector = OperatorSelector::new(
        config.procedural.clone(),
        Box::new(TracingSink::new(config.trace.clone())),
    );
    let name = memory.generate_name("instance");
    let snapshot = build_state_snapshot(buffers, name);
    let conflict_set = selector.rank_conflict_set(memory, &snapshot);
    RankReport {
        best: conflict_set.outcome.operator().map(str::to_string),
        latency: conflict_set.outcome.latency(),
        ranked: conflict_set.ranked,
    }
}

fn select(
    config: &ModelConfig,
    memory: &mut DeclarativeMemory,
    buffers: &mut Buffers,
    time: f64,
    strategy: Option<OperatorStrategy>,
) -> Result<SelectionReport> {
    let mut procedural = config.procedural.clone();
    if let Some(strategy) = strategy {
        procedural = procedural.with_strategy(strategy);
    }
    let strategy = procedural.strategy;
    let mut selector = OperatorSelector::new(procedural, Box::new(TracingSink::new(config.trace.clone())));

    let mut clock = time;
    let found = selector.find_operator(memory, buffers, &mut clock)?;
    let current = buffers.former(BufferName::Operator).filter(|_| found);
    Ok(SelectionReport {
        strategy,
        operator: current.map(|op| op.name().to_string()),
        action: current
            .and_then(|op| op.slot("action"))
            .map(|action| action.description()),
        clock,
        conflict_set: memory.conflict_set().to_vec(),
    })
}

fn print_report<R: Serialize + fmt::Display>(report: &R, format: Format) -> Result<()> {
    match format {
        Format::Text => print!("{}", report),
        Format::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let mut memory = load_memory(&config, &cli.memory)?;
    let mut buffers = match &cli.buffers {
        Some(path) => load_buffers(&memory, path)?,
        None => Buffers::new(),
    };

    match cli.command {
        Command::Activation { names } => {
            let report = activation(&mut memory, &buffers, cli.time, names)?;
            print_report(&report, cli.format)
        }
        Command::Retrieve { slots } => {
            let report = retrieve(&mut memory, &buffers, cli.time, &slots);
            print_report(&report, cli.format)
        }
        Command::Rank => {
            let report = rank(&config, &mut memory, &buffers);
            print_report(&report, cli.format)
        }
        Command::Select { strategy } => {
            let report = select(&config, &mut memory, &mut buffers, cli.time, strategy)?;
            print_report(&report, cli.format)
        }
    }
}

fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the report
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(log_fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    run(cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prims_core::{DeclarativeConfig, Value};
    use std::io::Write;

    fn config() -> ModelConfig {
        ModelConfig::builder()
            .declarative(DeclarativeConfig::deterministic())
            .build()
    }

    fn snapshot(config: &ModelConfig) -> tempfile::NamedTempFile {
        let mut memory = DeclarativeMemory::new(config.declarative.clone());
        for (name, value) in [("seven", 7.0), ("three", 3.0)] {
            let chunk = memory
                .new_chunk(name)
                .with_slot("isa", Value::Text("number".into()))
                .with_slot("value", Value::Number(value));
            memory.add_to_memory(chunk, 0.0).unwrap();
        }
        let fact = memory
            .new_chunk("fact1")
            .with_slot("isa", Value::Text("fact".into()))
            .with_slot("slot1", Value::Symbol("seven".into()))
            .with_slot("slot2", Value::Symbol("three".into()));
        memory.add_to_memory(fact, 0.0).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        memory.export_to(file.as_file_mut()).unwrap();
        file
    }

    fn buffers_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_slot() {
        assert_eq!(parse_slot("isa=fact"), Ok(("isa".into(), "fact".into())));
        assert!(parse_slot("isa").is_err());
        assert!(parse_slot("=fact").is_err());
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!(parse_strategy("activation"), Ok(OperatorStrategy::Activation));
        assert!(parse_strategy("random").is_err());
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from([
            "prims", "--memory", "m.jsonl", "-t", "2.5", "retrieve", "isa=fact", "slot1=seven",
        ])
        .unwrap();
        assert_eq!(cli.time, 2.5);
        match cli.command {
            Command::Retrieve { slots } => assert_eq!(slots.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["prims", "retrieve", "isa=fact"]).is_err());
    }

    #[test]
    fn test_load_buffers_resolves_symbols() {
        let config = config();
        let file = snapshot(&config);
        let memory = load_memory(&config, file.path()).unwrap();
        let buffers = buffers_file(r#"{"goal": {"slot1": "seven", "slot2": "4"}, "retrieval": "fact1"}"#);

        let buffers = load_buffers(&memory, buffers.path()).unwrap();
        let goal = buffers.get(BufferName::Goal).unwrap();
        assert_eq!(goal.slot("slot1"), Some(&Value::Symbol("seven".into())));
        assert_eq!(goal.slot("slot2"), Some(&Value::Number(4.0)));
        assert_eq!(buffers.get(BufferName::Retrieval).unwrap().name(), "fact1");
    }

    #[test]
    fn test_load_buffers_rejects_unknown_names() {
        let config = config();
        let file = snapshot(&config);
        let memory = load_memory(&config, file.path()).unwrap();

        let unknown_buffer = buffers_file(r#"{"visual": "fact1"}"#);
        let err = load_buffers(&memory, unknown_buffer.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("expected one of: goal, retrieval, imaginal, input, operator"));
        let unknown_chunk = buffers_file(r#"{"goal": "nine"}"#);
        assert!(load_buffers(&memory, unknown_chunk.path()).is_err());
    }

    #[test]
    fn test_retrieve_report() {
        let config = config();
        let file = snapshot(&config);
        let mut memory = load_memory(&config, file.path()).unwrap();
        let slots = vec![("isa".to_string(), "number".to_string())];

        let report = retrieve(&mut memory, &Buffers::new(), 1.0, &slots);
        // Equal activations: name order decides.
        assert_eq!(report.chunk.as_deref(), Some("seven"));
        assert_eq!(report.conflict_set.len(), 2);
        assert!(report.to_string().starts_with("Retrieved seven"));
    }

    #[test]
    fn test_activation_report_spreading() {
        let config = config();
        let file = snapshot(&config);
        let mut memory = load_memory(&config, file.path()).unwrap();
        let buffers = Buffers::new().with(
            BufferName::Goal,
            memory.new_chunk("g").with_slot("slot1", Value::Symbol("seven".into())),
        );

        let report = activation(&mut memory, &buffers, 1.0, vec!["fact1".into(), "three".into()]).unwrap();
        assert_eq!(report.chunks.len(), 2);
        // seven has a fan of one, into fact1 only.
        assert!((report.chunks[0].breakdown.spreading - 3.0).abs() < 1e-9);
        assert_eq!(report.chunks[1].breakdown.spreading, 0.0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["chunks"][0]["name"], "fact1");
        assert!(json["chunks"][0]["base_level"].is_number());

        assert!(activation(&mut memory, &buffers, 1.0, vec!["nine".into()]).is_err());
    }

    #[test]
    fn test_rank_leaves_memory_untouched() {
        let config = config();
        let file = snapshot(&config);
        let mut memory = load_memory(&config, file.path()).unwrap();
        let condition = memory
            .new_chunk("cond1")
            .with_slot("G1", Value::Text("count".into()));
        memory.add_to_memory(condition, 0.0).unwrap();
        let op = memory
            .new_chunk("op1")
            .with_slot("isa", Value::Text("operator".into()))
            .with_slot("condition", Value::Symbol("cond1".into()));
        memory.add_to_memory(op, 0.0).unwrap();
        let buffers = Buffers::new().with(
            BufferName::Goal,
            memory.new_chunk("g").with_slot("slot1", Value::Text("count".into())),
        );

        let report = rank(&config, &mut memory, &buffers);
        assert_eq!(report.best.as_deref(), Some("op1"));
        assert_eq!(report.ranked, vec![("op1".to_string(), 1.0)]);
        assert!(!memory.is_inhibited("op1"));
        assert!(report.to_string().contains("op1 A = 1.000"));
    }

    #[test]
    fn test_select_without_operators() {
        let config = config();
        let file = snapshot(&config);
        let mut memory = load_memory(&config, file.path()).unwrap();
        let mut buffers = Buffers::new();

        let report = select(&config, &mut memory, &mut buffers, 0.0, None).unwrap();
        assert_eq!(report.operator, None);
        assert!(report.clock > 0.0);
        assert!(report.to_string().starts_with("No matching operator found"));
    }
}
