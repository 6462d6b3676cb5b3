//! Command-line runner for testflow manifests.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use testflow::config::EngineConfig;
use testflow::events::LoggingEventSink;
use testflow::lifecycle::LifecycleOrchestrator;
use testflow::manifest::Manifest;
use testflow::observability::{init_tracing, LogFormat};
use testflow::plugin::{HelpText, Plugin};
use tracing::{error, info};

/// Runs test plugins described by JSON manifests
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a manifest and report PASS/FAIL
    Run {
        /// Manifest file
        manifest: PathBuf,

        /// Engine configuration file (JSON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Emit logs as JSON lines
        #[arg(long)]
        json_logs: bool,
    },
    /// Print a manifest's help text and stage order
    Describe {
        /// Manifest file
        manifest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match dispatch(args).await {
        Ok(passed) if passed => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            error!("{e:#}");
            eprintln!("testflow: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn dispatch(args: Args) -> Result<bool> {
    match args.command {
        Command::Run {
            manifest,
            config,
            json,
            json_logs,
        } => run(&manifest, config.as_deref(), json, json_logs).await,
        Command::Describe { manifest } => {
            describe(&manifest)?;
            Ok(true)
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

async fn run(
    manifest_path: &std::path::Path,
    config_path: Option<&std::path::Path>,
    json: bool,
    json_logs: bool,
) -> Result<bool> {
    let mut config = load_config(config_path)?;
    if json_logs {
        config.log_format = LogFormat::Json;
    }
    init_tracing(config.log_format);

    let plugin = Manifest::load(manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?
        .into_plugin()?;
    info!(plugin = %plugin.name(), "loaded manifest");

    let orchestrator =
        LifecycleOrchestrator::new(config).with_event_sink(Arc::new(LoggingEventSink::debug()));
    let report = orchestrator.run(&plugin).await?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render());
    }
    Ok(report.passed())
}

fn describe(manifest_path: &std::path::Path) -> Result<()> {
    let manifest = Manifest::load(manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?;
    let order = manifest.stage_order();
    let plugin = manifest.into_plugin()?;

    let mut help = HelpText::new();
    plugin.help(&mut help);
    if !help.is_empty() {
        print!("{}", help.render());
    }
    println!("Stages of {}:", plugin.name());
    for (i, stage) in order.iter().enumerate() {
        println!("  {}. {stage}", i + 1);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_args() {
        let args = Args::try_parse_from(["testflow", "run", "m.json", "--json", "-c", "cfg.json"]).unwrap();
        match args.command {
            Command::Run {
                manifest,
                config,
                json,
                json_logs,
            } => {
                assert_eq!(manifest, PathBuf::from("m.json"));
                assert_eq!(config, Some(PathBuf::from("cfg.json")));
                assert!(json);
                assert!(!json_logs);
            }
            Command::Describe { .. } => panic!("parsed as describe"),
        }
    }

    #[test]
    fn test_parse_describe_args() {
        let args = Args::try_parse_from(["testflow", "describe", "m.json"]).unwrap();
        assert!(matches!(args.command, Command::Describe { .. }));
    }

    #[test]
    fn test_run_requires_manifest() {
        assert!(Args::try_parse_from(["testflow", "run"]).is_err());
    }
}
