//! glory-sim - run an automatic encounter from a roster file

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use glory_combat::combat::TracingListener;
use glory_combat::{Combatant, Encounter, EngineConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Heroes Glory encounter simulator
#[derive(Parser, Debug)]
#[command(
    name = "glory-sim",
    version,
    about = "Simulate a combat encounter from a roster file"
)]
struct Args {
    /// JSON file holding an array of combatants
    #[arg(short, long)]
    roster: PathBuf,

    /// Engine configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed the dice for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Give up after this many rounds
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "glory_combat=info,glory_sim=info".into());
    if args.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Some(path) = &args.config {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
    }
    let mut config =
        EngineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(max_rounds) = args.max_rounds {
        config.max_rounds = max_rounds;
    }

    let source = std::fs::read_to_string(&args.roster)
        .with_context(|| format!("Failed to read {}", args.roster.display()))?;
    let roster: Vec<Combatant> = serde_json::from_str(&source)
        .with_context(|| format!("Invalid roster in {}", args.roster.display()))?;

    let mut encounter = Encounter::new(&config);
    encounter.add_listener(TracingListener);
    encounter.start(roster)?;

    info!(seed = ?config.seed, max_rounds = config.max_rounds, "encounter started");

    while encounter.round() <= config.max_rounds {
        if encounter.take_auto_turn()?.is_none() {
            break;
        }
    }

    let summary = encounter.finish();
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
