use clap::{Args, Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tm_core::TraceLimits;
use tm_graph::{ComponentClass, Direction, ElementKind, ThreatModel, Trace, Tracer, Transport};
use tm_project::{LoadedModel, ProjectResult, find_endpoint};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tm-cli")]
#[command(about = "Threat-model CLI - attack-path analysis over model files", long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a model file and check its integrity
    Validate {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
    },
    /// Print the elements and flows of a model
    Summary {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
    },
    /// List attack vectors leading into an element
    Vectors {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
        /// Name of the targeted component or actor
        target: String,
        #[command(flatten)]
        limits: LimitArgs,
    },
    /// List paths an attacker holding an element could follow
    Simulate {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
        /// Name of the compromised component or actor
        source: String,
        #[command(flatten)]
        limits: LimitArgs,
    },
}

#[derive(Args)]
struct LimitArgs {
    /// Maximum number of steps per path (default: unlimited or model setting)
    #[arg(long)]
    max_depth: Option<usize>,
    /// Maximum number of paths to collect, at least 1 (default: model setting)
    #[arg(long)]
    max_paths: Option<NonZeroUsize>,
}

impl LimitArgs {
    fn apply(&self, base: TraceLimits) -> TraceLimits {
        TraceLimits {
            max_depth: self.max_depth.or(base.max_depth),
            max_paths: self.max_paths.map(NonZeroUsize::get).or(base.max_paths),
        }
    }
}

fn main() -> ProjectResult<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate { model_path } => cmd_validate(&model_path),
        Commands::Summary { model_path } => cmd_summary(&model_path),
        Commands::Vectors {
            model_path,
            target,
            limits,
        } => cmd_trace(&model_path, &target, &limits, Direction::Backward),
        Commands::Simulate {
            model_path,
            source,
            limits,
        } => cmd_trace(&model_path, &source, &limits, Direction::Forward),
    }
}

fn load_model(model_path: &Path) -> ProjectResult<LoadedModel> {
    info!(path = %model_path.display(), "loading model");
    tm_project::load(model_path)
}

fn cmd_validate(model_path: &Path) -> ProjectResult<()> {
    println!("Validating model: {}", model_path.display());
    let loaded = load_model(model_path)?;
    loaded.model.validate()?;
    println!(
        "✓ Model '{}' is valid ({} elements)",
        loaded.model.name(),
        loaded.model.len()
    );
    Ok(())
}

fn cmd_summary(model_path: &Path) -> ProjectResult<()> {
    let loaded = load_model(model_path)?;
    let tm = &loaded.model;

    println!("Model: {}", tm.name());
    if let Some(description) = tm.description() {
        println!("  {}", description);
    }
    if !tm.assumptions().is_empty() {
        println!("Assumptions:");
        for assumption in tm.assumptions() {
            println!("  - {}", assumption);
        }
    }

    println!("Actors ({}):", tm.actors().count());
    for actor in tm.actors() {
        let kind = actor
            .as_actor()
            .and_then(|a| a.actor_type.as_deref())
            .unwrap_or("unspecified");
        println!("  {} [{}]", actor.name(), kind);
    }

    println!("Boundaries ({}):", tm.boundaries().count());
    for boundary in tm.boundaries() {
        let members: Vec<String> = boundary
            .children()
            .iter()
            .filter_map(|&c| tm.element(c).map(|e| e.name().to_string()))
            .collect();
        println!("  {} -> {}", boundary.name(), members.join(", "));
    }

    println!("Components ({}):", tm.assets().count());
    for element in tm.assets() {
        let kind = match element.kind() {
            ElementKind::Component(c) => component_label(c.class()),
            _ => "component".to_string(),
        };
        match element.parent().and_then(|p| tm.element(p)) {
            Some(parent) => println!("  {} [{}] in {}", element.name(), kind, parent.name()),
            None => println!("  {} [{}]", element.name(), kind),
        }
    }

    println!("Flows ({}):", tm.flows().count());
    for (element, flow) in tm.flows() {
        let transport = match &flow.transport {
            Transport::Data { protocol, port } => match (protocol, port) {
                (Some(p), Some(port)) => format!("{}:{}", p, port),
                (Some(p), None) => p.clone(),
                (None, Some(port)) => format!("port {}", port),
                (None, None) => "data".to_string(),
            },
            Transport::Work => "work".to_string(),
        };
        println!(
            "  {}: {} -> {} ({})",
            element.name(),
            tm.label(flow.src()),
            tm.label(flow.dst()),
            transport
        );
    }

    let findings: Vec<_> = tm.findings().collect();
    if !findings.is_empty() {
        println!("Findings ({}):", findings.len());
        for finding in findings {
            let affected: Vec<String> = finding
                .affected()
                .iter()
                .filter_map(|&id| tm.element(id).map(|e| e.name().to_string()))
                .collect();
            let risk = finding.assessment.risk.as_deref().unwrap_or("not evaluated");
            println!(
                "  {} on {} (risk: {})",
                finding.threats().join(", "),
                affected.join(", "),
                risk
            );
        }
    }
    Ok(())
}

fn component_label(class: &ComponentClass) -> String {
    match class {
        ComponentClass::Generic => "generic".to_string(),
        ComponentClass::Process => "process".to_string(),
        ComponentClass::ExternalEntity => "external entity".to_string(),
        ComponentClass::Datastore(store) => format!("datastore: {:?}", store),
    }
}

fn cmd_trace(
    model_path: &Path,
    name: &str,
    limits: &LimitArgs,
    direction: Direction,
) -> ProjectResult<()> {
    let loaded = load_model(model_path)?;
    let tm = &loaded.model;
    let start = find_endpoint(tm, name)?;

    let tracer = Tracer::new(tm)?.with_limits(limits.apply(loaded.limits));
    let trace = tracer.trace(start, direction)?;
    print_trace(tm, name, &trace);
    Ok(())
}

fn print_trace(tm: &ThreatModel, name: &str, trace: &Trace) {
    let heading = match trace.direction {
        Direction::Backward => "Attack vectors into",
        Direction::Forward => "Simulated attack from",
    };
    println!("{} '{}': {} paths", heading, name, trace.paths.len());
    for (i, path) in trace.paths.iter().enumerate() {
        let endpoint = tm
            .element(path.endpoint())
            .map(|e| e.name().to_string())
            .unwrap_or_else(|| path.endpoint().to_string());
        println!("  {:>4}. {}  [{}]", i + 1, path.describe(tm), endpoint);
    }

    let reached = trace.reached();
    if !reached.is_empty() {
        let names: Vec<String> = reached
            .iter()
            .filter_map(|&id| tm.element(id).map(|e| e.name().to_string()))
            .collect();
        println!("Reached ({}): {}", names.len(), names.join(", "));
    }
    if trace.truncated {
        println!("⚠ Output truncated by limits; raise --max-paths or --max-depth for more");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_model_limits() {
        let cli = Cli::parse_from([
            "tm-cli",
            "vectors",
            "model.yaml",
            "DB",
            "--max-paths",
            "5",
        ]);
        let Commands::Vectors { limits, target, .. } = cli.command else {
            panic!("expected vectors");
        };
        assert_eq!(target, "DB");
        let applied = limits.apply(TraceLimits::default().with_max_depth(3));
        assert_eq!(applied.max_paths, Some(5));
        assert_eq!(applied.max_depth, Some(3));
    }

    #[test]
    fn zero_path_cap_is_rejected() {
        let parsed = Cli::try_parse_from(["tm-cli", "simulate", "m.yaml", "LB", "--max-paths", "0"]);
        assert!(parsed.is_err());
        let parsed = Cli::try_parse_from(["tm-cli", "simulate", "m.yaml", "LB", "--max-paths", "1"]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::parse_from(["tm-cli", "simulate", "m.yaml", "LB", "-v"]);
        assert!(cli.verbose);
    }
}
