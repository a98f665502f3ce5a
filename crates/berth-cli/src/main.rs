//! Berth - component deployer
//!
//! Usage:
//!   berth plan <descriptor>       # Show the tasks a descriptor produces
//!   berth deploy <descriptor>     # Apply them, rolling back on failure
//!   berth undeploy <descriptor>   # Revert them, last to first
//!   berth offers                  # List registered offers

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use berth_core::deployer::{Deployer, Deployment, UndeployReport};
use berth_core::descriptor::read_descriptor;
use berth_core::registry::FileRegistry;
use berth_core::settings::Settings;

#[derive(Parser)]
#[command(name = "berth")]
#[command(about = "Transactional component deployer", long_about = None)]
struct Cli {
    /// Settings file (default: <config dir>/berth/berth.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the offer registry file
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a descriptor and list its tasks without applying them
    Plan {
        descriptor: PathBuf,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Apply a descriptor's tasks; earlier tasks are reverted if one fails
    Deploy {
        descriptor: PathBuf,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Revert every task of a descriptor, tolerating individual failures
    Undeploy {
        descriptor: PathBuf,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List offers in the registry file
    Offers {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "berth=info,berth_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Plan { descriptor, format } => run_plan(&settings, &descriptor, format)?,
        Commands::Deploy { descriptor, format } => run_deploy(&settings, &descriptor, format)?,
        Commands::Undeploy { descriptor, format } => {
            let report = run_undeploy(&settings, &descriptor, format)?;
            if !report.is_clean() {
                return Ok(ExitCode::from(2));
            }
        }
        Commands::Offers { format } => run_offers(&settings, format)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let path = match cli.config {
        Some(ref path) => path.clone(),
        None => Settings::default_path()?,
    };
    tracing::debug!(path = %path.display(), "loading settings");
    let mut settings = Settings::load(&path)?;
    if let Some(ref dir) = cli.data_dir {
        settings.data_dir = Some(dir.clone());
    }
    if let Some(ref registry) = cli.registry {
        settings.registry = Some(registry.clone());
    }
    settings.validate()?;
    Ok(settings)
}

fn parse_descriptor(settings: &Settings, descriptor: &Path) -> Result<Deployment> {
    let events = read_descriptor(descriptor)?;
    let config = settings.deployer_config()?;
    tracing::debug!(data_dir = %config.data_dir().display(), "parsing {}", descriptor.display());
    let deployer = Deployer::new(config);
    deployer
        .parse(events)
        .with_context(|| format!("Failed to parse descriptor: {}", descriptor.display()))
}

fn run_plan(settings: &Settings, descriptor: &Path, format: OutputFormat) -> Result<()> {
    let deployment = parse_descriptor(settings, descriptor)?;
    let plan = deployment.plan();

    match format {
        OutputFormat::Table => {
            if plan.is_empty() {
                println!("Descriptor produces no tasks.");
                return Ok(());
            }
            println!("{:<4} {:<12} Target", "#", "Kind");
            println!("{}", "-".repeat(70));
            for (index, task) in plan.iter().enumerate() {
                println!("{:<4} {:<12} {}", index, task.kind(), task.target());
            }
            if !deployment.properties().is_empty() {
                println!();
                println!("Properties:");
                for line in deployment.properties().serialize() {
                    println!("  {line}");
                }
            }
        }
        OutputFormat::Json => {
            let tasks: Vec<_> = plan
                .iter()
                .enumerate()
                .map(|(index, task)| {
                    serde_json::json!({
                        "index": index,
                        "kind": task.kind(),
                        "target": task.target(),
                    })
                })
                .collect();
            let properties: serde_json::Map<_, _> = deployment
                .properties()
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
                .collect();
            let output = serde_json::json!({
                "tasks": tasks,
                "properties": properties,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn run_deploy(settings: &Settings, descriptor: &Path, format: OutputFormat) -> Result<()> {
    let deployment = parse_descriptor(settings, descriptor)?;
    let report = deployment
        .deploy()
        .with_context(|| format!("Failed to deploy {}", descriptor.display()))?;

    match format {
        OutputFormat::Table => {
            println!("✓ Deployed {} ({} task(s))", descriptor.display(), report.applied);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "descriptor": descriptor.display().to_string(),
                "applied": report.applied,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn run_undeploy(
    settings: &Settings,
    descriptor: &Path,
    format: OutputFormat,
) -> Result<UndeployReport> {
    let deployment = parse_descriptor(settings, descriptor)?;
    let report = deployment.undeploy();

    match format {
        OutputFormat::Table => {
            println!(
                "✓ Undeployed {} ({} reverted, {} already gone)",
                descriptor.display(),
                report.reverted,
                report.already_absent
            );
            for failure in &report.failures {
                println!("  ⚠ task {} ({}): {}", failure.index, failure.task, failure.error);
            }
            if report.abandoned > 0 {
                println!("  ⚠ {} offer(s) could not be removed", report.abandoned);
            }
        }
        OutputFormat::Json => {
            let failures: Vec<_> = report
                .failures
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "index": f.index,
                        "task": f.task,
                        "error": f.error.to_string(),
                    })
                })
                .collect();
            let output = serde_json::json!({
                "descriptor": descriptor.display().to_string(),
                "reverted": report.reverted,
                "already_absent": report.already_absent,
                "abandoned": report.abandoned,
                "failures": failures,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(report)
}

fn run_offers(settings: &Settings, format: OutputFormat) -> Result<()> {
    let Some(ref path) = settings.registry else {
        anyhow::bail!("No registry configured. Set 'registry' in berth.toml or pass --registry");
    };
    let registry = FileRegistry::new(path.clone());
    let offers = registry
        .list()
        .with_context(|| format!("Failed to read registry: {}", path.display()))?;

    match format {
        OutputFormat::Table => {
            if offers.is_empty() {
                println!("No offers registered.");
                return Ok(());
            }
            println!("{:<24} {:<26} Reference", "Offer", "Registered");
            println!("{}", "-".repeat(80));
            for (name, entries) in &offers {
                for entry in entries {
                    println!(
                        "{:<24} {:<26} {}",
                        name,
                        entry.registered_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        entry.reference
                    );
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&offers)?);
        }
    }
    Ok(())
}
