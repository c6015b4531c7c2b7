use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use edgesim::{LOADER_NAMES, Runner};
use edgesim_core::{HostSpec, SimConfig};
use edgesim_metrics::SINK_NAMES;
use edgesim_placement::policy_names;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "edgesim",
    about = "edgesim — scheduling simulator for heterogeneous edge clusters",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print a JSON summary.
    Run {
        /// Simulation config (TOML).
        #[arg(short, long)]
        config: PathBuf,
        /// Override the number of steps.
        #[arg(long)]
        steps: Option<u64>,
        /// Override the scheduling policy.
        #[arg(long)]
        scheduler: Option<String>,
    },
    /// List registered schedulers, data loaders and visualization sinks.
    Policies,
    /// Write a starter config with two edge devices.
    Init {
        #[arg(short, long, default_value = "edgesim.toml")]
        output: PathBuf,
    },
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,edgesim=info"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

fn run(config: PathBuf, steps: Option<u64>, scheduler: Option<String>) -> anyhow::Result<()> {
    let mut sim = SimConfig::from_file(&config)
        .with_context(|| format!("loading {}", config.display()))?;
    if let Some(steps) = steps {
        sim.steps = steps;
    }
    if let Some(scheduler) = scheduler {
        sim.scheduler = scheduler;
    }

    let mut runner = Runner::from_config(sim).context("building simulation")?;
    let summary = runner.run().context("simulation failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn policies() {
    println!("schedulers:     {}", policy_names().collect::<Vec<_>>().join(", "));
    println!("dataloaders:    {}", LOADER_NAMES.join(", "));
    println!("visualizations: {}", SINK_NAMES.join(", "));
}

fn init(output: PathBuf) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }
    let config = SimConfig::scaffold(
        "waggle",
        "job",
        vec![
            HostSpec::new("xavier-1", "xaviernx").with_label("waggle.io/resource.gpu", "true"),
            HostSpec::new("rpi-1", "rpi"),
        ],
    );
    std::fs::write(&output, config.to_toml_string()?)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(path = %output.display(), "config written");
    println!("✓ Generated {}", output.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Commands::Run {
            config,
            steps,
            scheduler,
        } => run(config, steps, scheduler),
        Commands::Policies => {
            policies();
            Ok(())
        }
        Commands::Init { output } => init(output),
    }
}
