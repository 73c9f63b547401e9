//! crisisgraph — query the crisis knowledge graph and the decision memory
//!
//! Usage:
//!   crisisgraph search gdpr breach                  → keyword search
//!   crisisgraph path CASE_ACME_BREACH LAW_GDPR_ART33 → shortest path
//!   crisisgraph risk "we will wait two weeks"       → risk assessment
//!   crisisgraph chain delay notification            → causal chain trace
//!   crisisgraph record "..." --verdict reject       → store a decision
//!   crisisgraph call graph_search '{"keywords": "gdpr"}'

use clap::{Parser, Subcommand};
use crisisgraph_core::{Collection, CrisisConfig, Direction, MechanismFilter, RuleFilter};
use crisisgraph_kg::KnowledgeService;
use crisisgraph_memory::{FeedbackOutcome, MemoryStore, NewDecision, Verdict};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_MEMORY_FILE: &str = "decision_history.json";

#[derive(Parser)]
#[command(
    name = "crisisgraph",
    about = "Knowledge-graph reasoning over crisis cases, rules and precedents",
    version = env!("CARGO_PKG_VERSION"),
    long_about = "crisisgraph loads a typed knowledge graph of cases, precedents, rules,\n\
                  mechanisms and actions, and answers lookup, traversal, search and risk\n\
                  queries against it. Decisions are kept in a persistent history.\n\
                  All output is JSON on stdout; logs go to stderr."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Knowledge-base JSON (overrides [graph].path)
    #[arg(long, global = true)]
    kb: Option<PathBuf>,

    /// Decision history JSON (overrides [memory].path)
    #[arg(long, global = true)]
    memory: Option<PathBuf>,

    /// Config file (TOML). Default: <config dir>/crisisgraph/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one node
    Node { id: String },
    /// Show the edges touching a node
    Edges {
        id: String,
        /// out, in or both
        #[arg(short, long, default_value = "both")]
        direction: String,
    },
    /// Keyword search
    Search {
        #[arg(required = true)]
        keywords: Vec<String>,
        /// Collections to search, comma-separated
        #[arg(short, long, value_delimiter = ',')]
        collections: Vec<String>,
    },
    /// List rules, heaviest first
    Rules {
        /// hard, soft or all
        #[arg(default_value = "all")]
        rule_type: String,
    },
    /// List mechanisms
    Mechanisms {
        /// risk, financial or all
        #[arg(default_value = "all")]
        mechanism_type: String,
    },
    /// Shortest path between two nodes
    Path {
        start: String,
        end: String,
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Every simple path between two nodes
    AllPaths {
        start: String,
        end: String,
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Nodes reachable from a start node
    Reachable {
        start: String,
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Score a scenario's financial, ethical and legal risk
    Risk { description: String },
    /// Trace the causal chain of the first action matching the keywords
    Chain {
        #[arg(required = true)]
        keywords: Vec<String>,
    },
    /// Record a decision in the history
    Record {
        scenario: String,
        /// APPROVE, REJECT or UNKNOWN
        #[arg(long, default_value = "UNKNOWN")]
        verdict: String,
        /// Precedent the decision relied on
        #[arg(long)]
        precedent: Option<String>,
        /// Rules cited, comma-separated
        #[arg(long, value_delimiter = ',')]
        rules: Vec<String>,
        #[arg(long)]
        confidence: Option<f64>,
        /// Attach risk scores computed from the scenario text
        #[arg(long, default_value_t = false)]
        score: bool,
    },
    /// Past decisions on similar scenarios
    Similar {
        scenario: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Record whether a past decision held up
    Feedback {
        decision_id: String,
        /// correct, incorrect or partially_correct
        outcome: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Decision history aggregates and the most recent decisions
    Stats {
        #[arg(long)]
        recent: Option<usize>,
    },
    /// List the tool definitions exposed to the orchestration layer
    Tools,
    /// Run one tool with JSON arguments
    Call {
        name: String,
        #[arg(default_value = "{}")]
        args: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let config = resolve_config(&cli);

    let result = match cli.command {
        Commands::Node { ref id } => print_json(knowledge(&config)?.node(id)?),
        Commands::Edges { ref id, ref direction } => {
            let direction: Direction = direction.parse()?;
            let service = knowledge(&config)?;
            let edges = service.edges(id, direction)?;
            let neighbors = service.neighbors(id, direction)?;
            print_json(&json!({"id": id, "direction": direction, "edges": edges, "neighbors": neighbors}))
        }
        Commands::Search { ref keywords, ref collections } => {
            let collections = collections
                .iter()
                .map(|c| c.parse::<Collection>())
                .collect::<crisisgraph_core::Result<Vec<_>>>()?;
            let filter = (!collections.is_empty()).then_some(collections.as_slice());
            print_json(&knowledge(&config)?.search(keywords.as_slice(), filter)?)
        }
        Commands::Rules { ref rule_type } => {
            let filter: RuleFilter = rule_type.parse()?;
            print_json(&knowledge(&config)?.rules(filter))
        }
        Commands::Mechanisms { ref mechanism_type } => {
            let filter: MechanismFilter = mechanism_type.parse()?;
            print_json(&knowledge(&config)?.mechanisms(filter))
        }
        Commands::Path { ref start, ref end, max_depth } => {
            print_json(&knowledge(&config)?.shortest_path(start, end, max_depth)?)
        }
        Commands::AllPaths { ref start, ref end, max_depth } => {
            print_json(&knowledge(&config)?.all_paths(start, end, max_depth)?)
        }
        Commands::Reachable { ref start, max_depth } => {
            print_json(&knowledge(&config)?.reachable(start, max_depth)?)
        }
        Commands::Risk { ref description } => {
            print_json(&knowledge(&config)?.score_risk(description))
        }
        Commands::Chain { ref keywords } => {
            print_json(&knowledge(&config)?.trace_causal_chain(keywords.as_slice())?)
        }
        Commands::Record {
            ref scenario,
            ref verdict,
            ref precedent,
            ref rules,
            confidence,
            score,
        } => {
            let mut decision = NewDecision::new(scenario.as_str(), Verdict::from_label(verdict))
                .with_rules(rules.clone());
            if let Some(p) = precedent {
                decision = decision.with_precedent(p.as_str());
            }
            if let Some(c) = confidence {
                decision = decision.with_confidence(c);
            }
            if score {
                decision = decision.with_risk_scores(knowledge(&config)?.score_risk(scenario).score_map());
            }
            let id = memory(&config).record_decision(decision)?;
            print_json(&json!({"decision_id": id}))
        }
        Commands::Similar { ref scenario, limit } => {
            let memory = memory(&config);
            let limit = limit.unwrap_or(config.memory.similar_limit);
            print_json(&memory.similar_decisions(scenario, limit))
        }
        Commands::Feedback { ref decision_id, ref outcome, ref notes } => {
            let outcome: FeedbackOutcome = outcome.parse()?;
            memory(&config).add_feedback(decision_id, outcome, notes)?;
            print_json(&json!({"decision_id": decision_id, "outcome": outcome}))
        }
        Commands::Stats { recent } => {
            let memory = memory(&config);
            let recent = memory.recent_decisions(recent.unwrap_or(config.memory.recent_limit));
            print_json(&json!({"stats": memory.stats(), "recent": recent}))
        }
        Commands::Tools => {
            let registry = registry(&config)?;
            print_json(&json!({
                "tools": registry.get_definitions(),
                "prompts": registry.combined_prompts(),
            }))
        }
        Commands::Call { ref name, ref args } => {
            let args: serde_json::Value = serde_json::from_str(args)?;
            let result = registry(&config)?.execute(name, args).await;
            println!("{}", result.to_content_string());
            if result.is_error() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml());
            Ok(())
        }
    };
    result
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "crisisgraph=info".into())
    };
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("--log-file needs a file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::never(dir, name);
            tracing_subscriber::registry()
                .with(filter())
                .with(stderr)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(file_appender),
                )
                .init();
            tracing::info!("Logs are being written to: {}", path.display());
        }
        None => {
            tracing_subscriber::registry().with(filter()).with(stderr).init();
        }
    }
    Ok(())
}

/// Config file, then command-line overrides. The default history file lives
/// in the user data directory rather than the working directory.
fn resolve_config(cli: &Cli) -> CrisisConfig {
    let path = cli.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .map(|d| d.join("crisisgraph").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("crisisgraph.toml"))
    });
    let mut config = CrisisConfig::load(&path);

    if let Some(kb) = &cli.kb {
        config.graph.path = kb.clone();
    }
    match &cli.memory {
        Some(memory) => config.memory.path = memory.clone(),
        None if config.memory.path == Path::new(DEFAULT_MEMORY_FILE) => {
            if let Some(data) = dirs::data_dir() {
                config.memory.path = data.join("crisisgraph").join(DEFAULT_MEMORY_FILE);
            }
        }
        None => {}
    }
    config
}

fn knowledge(config: &CrisisConfig) -> anyhow::Result<Arc<KnowledgeService>> {
    Ok(KnowledgeService::shared(config)?)
}

fn memory(config: &CrisisConfig) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::load(config.memory.clone()))
}

fn registry(config: &CrisisConfig) -> anyhow::Result<crisisgraph_tools::ToolRegistry> {
    Ok(crisisgraph_tools::create_default_registry(
        knowledge(config)?,
        memory(config),
    ))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
