//! Stake-weighted consensus round simulator.
//!
//! Builds a validator roster, feeds the chain random transfer traffic, and
//! drives the consensus engine round by round, reporting what finalized and
//! what was discarded.

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stakecast_chain::Chain;
use stakecast_consensus::{total_stake, PoSConsensus};

mod config;
mod report;
mod txgen;

use crate::config::NodeConfig;
use crate::report::RunSummary;
use crate::txgen::TrafficGenerator;

#[derive(Parser)]
#[command(name = "stakecast-node")]
#[command(about = "Stake-weighted proof-of-stake round simulator", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of consensus rounds to run
    #[arg(long, value_name = "N")]
    rounds: Option<u64>,

    /// Number of validators in the roster
    #[arg(long, value_name = "N")]
    validators: Option<usize>,

    /// Seed for a reproducible run
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Share of stake attestation must strictly exceed, as a ratio like "2/3"
    #[arg(long, value_name = "RATIO")]
    finality_threshold: Option<String>,

    /// Probability that the selected proposer misses its round
    #[arg(long, value_name = "PROB")]
    proposer_offline: Option<f64>,

    /// Probability that each peer validator misses a round
    #[arg(long, value_name = "PROB")]
    validator_offline: Option<f64>,

    /// Pause between rounds in milliseconds
    #[arg(long, value_name = "MS")]
    round_interval_ms: Option<u64>,

    /// Override the log level
    #[arg(long, value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,

    /// Select log output format
    #[arg(long, value_name = "FORMAT", value_parser = ["pretty", "json"])]
    log_format: Option<String>,

    /// Print the final chain as JSON after the run
    #[arg(long)]
    dump_chain: bool,
}

fn apply_overrides(cli: &Cli, config: &mut NodeConfig) {
    if let Some(rounds) = cli.rounds {
        config.rounds = rounds;
    }
    if let Some(validators) = cli.validators {
        config.validator_count = validators;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(threshold) = &cli.finality_threshold {
        config.finality_threshold = threshold.clone();
    }
    if let Some(probability) = cli.proposer_offline {
        config.proposer_offline_probability = probability;
    }
    if let Some(probability) = cli.validator_offline {
        config.validator_offline_probability = probability;
    }
    if let Some(interval_ms) = cli.round_interval_ms {
        config.round_interval_ms = interval_ms;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
}

fn init_logging(config: &NodeConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = NodeConfig::load(cli.config.as_deref())?;
    apply_overrides(&cli, &mut config);
    config.validate()?;

    init_logging(&config)?;

    run(config, cli.dump_chain).await
}

async fn run(config: NodeConfig, dump_chain: bool) -> Result<()> {
    let seed = config.seed.unwrap_or_else(rand::random);
    info!(
        seed,
        rounds = config.rounds,
        validators = config.validator_count,
        "starting simulation"
    );
    if let Some(path) = &config.config_path {
        info!("config file: {}", path.display());
    }

    // The engine replays from the run seed alone; roster setup and traffic
    // draw from a sibling stream.
    let mut setup_rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let roster = txgen::build_roster(
        &mut setup_rng,
        config.validator_count,
        config.min_stake,
        config.max_stake,
    );
    for (index, validator) in roster.iter().enumerate() {
        debug!(
            index,
            validator = %hex::encode(validator.id),
            stake = validator.stake,
            "validator initialized"
        );
    }
    let roster_stake = total_stake(&roster);
    info!(
        validators = roster.len(),
        total_stake = roster_stake,
        "roster ready"
    );

    let chain = Arc::new(RwLock::new(Chain::new()));
    let mut traffic = TrafficGenerator::new(&roster, &config, setup_rng);
    let mut engine = PoSConsensus::new(config.consensus_config()?, roster, chain.clone(), seed)?;

    let mut ticker = interval(Duration::from_millis(config.round_interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut summary = RunSummary::default();
    for round in 1..=config.rounds {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = &mut shutdown => {
                if let Err(err) = signal {
                    warn!(error = %err, "ctrl-c handler failed, stopping");
                } else {
                    info!(completed = round - 1, "interrupt received, stopping at the round boundary");
                }
                break;
            }
        }

        let queued = {
            let mut chain = chain.write();
            traffic.submit_batch(&mut chain)
        };
        debug!(round, queued, "traffic queued");

        let outcome = engine.run_round().context("consensus round failed")?;
        summary.record(&outcome);
    }

    let chain = chain.read();
    report::log_summary(&summary, &chain, roster_stake);

    if !chain.verify() {
        anyhow::bail!("finished chain failed verification");
    }

    if dump_chain {
        println!("{}", report::render_chain(&chain)?);
    }

    Ok(())
}
