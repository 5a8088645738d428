//! # Ledger Benchmark Harness - Main Entry Point
//!
//! Runs a self-contained demonstration mission against an in-process
//! simulated peer ensemble:
//!
//! 1. **Initialize logging**: structured logging with tracing, colorized for
//!    the terminal
//! 2. **Build the topology**: core-sets sized from the command line, with a
//!    freshly generated run nonce
//! 3. **Run measurement rounds**: each round clears peer metrics, drives a
//!    simulated workload, snapshots every live peer, and appends one
//!    performance row per peer
//! 4. **Export artifacts**: one tab-delimited `.perf` table per known peer,
//!    plus a JSON run summary, written under the output directory
//!
//! Real missions replace the simulated transport and workload with a live
//! cluster; the addressing, round protocol, and export paths are identical.

use anyhow::{Context, Result};
use clap::Parser;
use ledger_benchmark::{
    aggregator::{LoadParams, PerformanceAggregator},
    cli::Args,
    logging::ColorizedFormatter,
    report::{self, FileSink, RunSummary, Sink},
    topology::{CoreSet, NetworkCfg},
    transport::sim::{SimLoadProfile, SimTransport},
    utils::{format_duration, format_rate},
};
use parking_lot::RwLock;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The log level can be controlled via RUST_LOG environment variable;
    // --verbose raises the default to debug.
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .event_format(ColorizedFormatter)
        .init();

    info!("Starting ledger benchmark harness");
    info!("Configuration: {:?}", args);

    let live_nodes = args.live_nodes.unwrap_or(args.max_nodes);
    let mut core_sets = Vec::with_capacity(args.core_sets);
    for i in 0..args.core_sets {
        let name = if args.core_sets == 1 {
            "core".to_string()
        } else {
            format!("core{}", i)
        };
        let mut core_set = CoreSet::new(name.as_str(), args.max_nodes, live_nodes, args.catchup)?;
        // every configured peer of the set is a quorum member
        core_set.quorum_set = (0..args.max_nodes).map(|o| format!("{}-{}", name, o)).collect();
        core_set.history_fetch_cmd = Some("curl -sf {0} -o {1}".to_string());
        core_sets.push(core_set);
    }
    let network = RwLock::new(
        NetworkCfg::new(args.namespace.clone(), core_sets)
            .context("invalid topology configuration")?,
    );
    info!("Run nonce: {}", network.read().nonce());

    let sim = SimTransport::new();
    sim.register_network(&network.read())
        .context("failed to build simulated ensemble")?;

    let mut aggregator = PerformanceAggregator::new(sim.clone());
    let run_started = Instant::now();

    for round in 1..=args.rounds {
        let params = LoadParams::new(
            args.txtype.clone(),
            args.accounts,
            args.txs,
            args.tx_rate,
            args.batch_size,
        );
        let profile = SimLoadProfile::for_load(&params, args.round_duration);
        let addresses: Vec<String> = network.read().live_peers().map(|p| p.dns_name()).collect();

        let sim_in_round = sim.clone();
        let round_duration = args.round_duration;
        let outcome = aggregator
            .measure_round(&network, params, || async move {
                tokio::time::sleep(round_duration).await;
                for address in &addresses {
                    if let Err(err) = sim_in_round.apply_load(address, &profile) {
                        warn!("simulated load failed for {}: {}", address, err);
                    }
                }
            })
            .await;

        info!(
            "Round {}/{}: {} rows recorded, {} peers unreachable",
            round,
            args.rounds,
            outcome.rows_recorded,
            outcome.unreachable.len()
        );
    }

    let rows: Vec<_> = aggregator.history().values().flatten().collect();
    if !rows.is_empty() {
        let mean_close_rate =
            rows.iter().map(|row| row.close_rate).sum::<f64>() / rows.len() as f64;
        info!(
            "Measured {} rows in {}; mean close rate {}",
            rows.len(),
            format_duration(run_started.elapsed()),
            format_rate(mean_close_rate)
        );
    }

    // Recording is complete; the history becomes read-only for export.
    let network = network.into_inner();
    let history = aggregator.into_history();
    let sink = FileSink::new(&args.output_dir);

    let failures = report::export_all(&history, &network, &sink);
    for (peer, err) in &failures {
        warn!("artifact for {} was not written: {}", peer, err);
    }

    let summary = RunSummary::new(&network, args.rounds);
    let json =
        serde_json::to_string_pretty(&summary).context("failed to serialize run summary")?;
    sink.write_string(&network.namespace, "run_summary.json", &json)
        .context("failed to write run summary")?;

    info!(
        "Ledger benchmark harness completed; artifacts in {:?}",
        args.output_dir.join(&network.namespace)
    );
    Ok(())
}
