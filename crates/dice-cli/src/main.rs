//! Steered Dice CLI
//!
//! Runs a headless session: searches for a throw that lands on the requested
//! total, replays it and prints the faces.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use dice_core::{DiceSession, EngineConfig, ThrowRequest, ThrowStatus};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Throw dice that land on a chosen total
#[derive(Parser, Debug)]
#[command(name = "steered-dice")]
#[command(about = "Find a physically simulated dice throw that sums to a target")]
struct Args {
    /// Engine configuration (JSON); defaults are used for missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of dice (1-5)
    #[arg(long, default_value_t = 2)]
    dice: usize,

    /// Desired total; clamped into the range the dice can reach
    #[arg(long, default_value_t = 7)]
    total: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum ticks before giving up
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            EngineConfig::from_json(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    if args.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    // Clamp the total the same way a die-count change does.
    let request = ThrowRequest::default()
        .with_die_count(args.dice)?
        .with_total_clamped(args.total);
    if request.desired_total() != args.total {
        tracing::warn!(
            "[cli] Total {} unreachable with {} dice, using {}",
            args.total,
            args.dice,
            request.desired_total()
        );
    }

    let mut session = DiceSession::new(config)?;
    session.start_attempt(request);
    let status = session.run(args.max_ticks);
    let stats = session.stats();

    match status {
        ThrowStatus::Idle => {
            let faces = session.result().unwrap_or_default();
            let listed: Vec<String> = faces.iter().map(ToString::to_string).collect();
            println!(
                "{} = {}",
                listed.join(" + "),
                session.total().unwrap_or_default()
            );
            println!(
                "seed {}, {} attempts, {} retries, {} fast steps{}",
                session.seed(),
                stats.attempts,
                stats.retries,
                stats.fast_steps,
                if stats.replay_diverged { ", replay diverged" } else { "" }
            );
            Ok(())
        }
        ThrowStatus::NoResolution => bail!(
            "no throw of {} dice reached {}: {} of {} attempts stalled",
            request.die_count(),
            request.desired_total(),
            stats.stalls,
            stats.attempts
        ),
        other => bail!("stopped after {} ticks while {:?}", args.max_ticks, other),
    }
}
