use ledger_benchmark::{
    aggregator::{LoadParams, PerformanceAggregator},
    report::{self, MemorySink},
    topology::{CatchupMode, CoreSet, NetworkCfg},
    transport::sim::{SimLoadProfile, SimTransport},
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

fn network(live: usize, max: usize) -> Arc<RwLock<NetworkCfg>> {
    let core = CoreSet::new("core", max, live, CatchupMode::None).expect("valid core-set");
    Arc::new(RwLock::new(
        NetworkCfg::with_nonce("itest", "scenario", vec![core]).expect("valid network"),
    ))
}

fn profile() -> SimLoadProfile {
    SimLoadProfile {
        ledgers: 5,
        mean_txs_per_ledger: 20.0,
        mean_close_ms: 100.0,
        window: Duration::from_secs(1),
        with_load_generator: true,
    }
}

/// The concrete scenario: core-set "core" with maximum size 3 and live count
/// 2, one successful round against both peers, and a no-op export for the
/// never-measured third ordinal.
#[tokio::test]
async fn scenario_two_live_peers_one_round() {
    let network = network(2, 3);
    let sim = SimTransport::new();
    sim.register_network(&network.read()).unwrap();

    let mut aggregator = PerformanceAggregator::new(sim.clone());
    let sim_in_round = sim.clone();
    let outcome = aggregator
        .measure_round(
            &network,
            LoadParams::new("load-A", 10, 100, 5, 20),
            || async move {
                sim_in_round.apply_load("core-0.itest", &profile()).unwrap();
                sim_in_round.apply_load("core-1.itest", &profile()).unwrap();
            },
        )
        .await;

    assert_eq!(outcome.rows_recorded, 2);
    assert!(outcome.unreachable.is_empty());

    let history = aggregator.history();
    for name in ["core-0", "core-1"] {
        let rows = history.get(name).expect("peer has a history entry");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].txtype, "load-A");
        assert_eq!(rows[0].accounts, 10);
        assert_eq!(rows[0].txs, 100);
        assert_eq!(rows[0].tx_rate, 5);
        assert_eq!(rows[0].batch_size, 20);
    }

    // "core-2" was never measured: exporting it produces no artifact.
    let sink = MemorySink::new();
    report::export_peer(history, "scenario", "core-2", &sink).unwrap();
    assert_eq!(sink.artifact_count(), 0);
}

#[tokio::test]
async fn rounds_append_in_issue_order() {
    let network = network(2, 2);
    let sim = SimTransport::new();
    sim.register_network(&network.read()).unwrap();

    let mut aggregator = PerformanceAggregator::new(sim.clone());
    for label in ["round-1", "round-2", "round-3"] {
        let sim_in_round = sim.clone();
        aggregator
            .measure_round(
                &network,
                LoadParams::new(label, 10, 100, 5, 20),
                || async move {
                    sim_in_round.apply_load("core-0.itest", &profile()).unwrap();
                    sim_in_round.apply_load("core-1.itest", &profile()).unwrap();
                },
            )
            .await;
    }

    for name in ["core-0", "core-1"] {
        let labels: Vec<&str> = aggregator.history()[name]
            .iter()
            .map(|row| row.txtype.as_str())
            .collect();
        assert_eq!(labels, vec!["round-1", "round-2", "round-3"]);
    }
}

/// An unreachable peer receives no row and no placeholder while the others
/// record normally, and its previously recorded rounds stay intact.
#[tokio::test]
async fn partial_failure_is_isolated_per_peer() {
    let network = network(2, 2);
    let sim = SimTransport::new();
    sim.register_network(&network.read()).unwrap();

    let mut aggregator = PerformanceAggregator::new(sim.clone());

    let sim_in_round = sim.clone();
    aggregator
        .measure_round(
            &network,
            LoadParams::new("warm", 10, 100, 5, 20),
            || async move {
                sim_in_round.apply_load("core-0.itest", &profile()).unwrap();
                sim_in_round.apply_load("core-1.itest", &profile()).unwrap();
            },
        )
        .await;

    sim.set_reachable("core-1.itest", false).unwrap();
    let sim_in_round = sim.clone();
    let outcome = aggregator
        .measure_round(
            &network,
            LoadParams::new("degraded", 10, 100, 5, 20),
            || async move {
                sim_in_round.apply_load("core-0.itest", &profile()).unwrap();
            },
        )
        .await;

    assert_eq!(outcome.rows_recorded, 1);
    assert_eq!(outcome.unreachable, vec!["core-1".to_string()]);

    let history = aggregator.history();
    assert_eq!(history["core-0"].len(), 2);
    assert_eq!(history["core-1"].len(), 1, "no placeholder row inserted");
    assert_eq!(history["core-1"][0].txtype, "warm");
}

/// A peer added while the workload runs is snapshotted without having
/// received this round's reset: it reports whatever baseline it has.
#[tokio::test]
async fn peer_added_mid_workload_is_snapshotted_unreset() {
    let network = network(2, 3);
    let sim = SimTransport::new();
    sim.register_network(&network.read()).unwrap();

    let mut aggregator = PerformanceAggregator::new(sim.clone());

    let sim_in_round = sim.clone();
    let network_in_round = Arc::clone(&network);
    let outcome = aggregator
        .measure_round(
            &network,
            LoadParams::new("expand", 10, 100, 5, 20),
            || async move {
                // the external topology operation: a third peer comes up
                // mid-workload, already carrying some baseline activity
                sim_in_round.register_peer("core-2.itest").unwrap();
                sim_in_round.apply_load("core-2.itest", &profile()).unwrap();
                network_in_round
                    .write()
                    .core_set_mut("core")
                    .unwrap()
                    .set_live_count(3)
                    .unwrap();

                sim_in_round.apply_load("core-0.itest", &profile()).unwrap();
                sim_in_round.apply_load("core-1.itest", &profile()).unwrap();
            },
        )
        .await;

    assert_eq!(outcome.rows_recorded, 3);
    let history = aggregator.history();
    assert_eq!(history["core-2"].len(), 1);
    // the un-reset baseline is visible in the recorded row
    assert!(history["core-2"][0].txs_applied > 0);
}

/// A peer removed from the live set between rounds keeps its history and
/// simply stops accumulating new rows.
#[tokio::test]
async fn peer_removed_between_rounds_stops_recording() {
    let network = network(2, 2);
    let sim = SimTransport::new();
    sim.register_network(&network.read()).unwrap();

    let mut aggregator = PerformanceAggregator::new(sim.clone());

    let sim_in_round = sim.clone();
    aggregator
        .measure_round(
            &network,
            LoadParams::new("before", 10, 100, 5, 20),
            || async move {
                sim_in_round.apply_load("core-0.itest", &profile()).unwrap();
                sim_in_round.apply_load("core-1.itest", &profile()).unwrap();
            },
        )
        .await;

    network
        .write()
        .core_set_mut("core")
        .unwrap()
        .set_live_count(1)
        .unwrap();

    let sim_in_round = sim.clone();
    let outcome = aggregator
        .measure_round(
            &network,
            LoadParams::new("after", 10, 100, 5, 20),
            || async move {
                sim_in_round.apply_load("core-0.itest", &profile()).unwrap();
            },
        )
        .await;

    assert_eq!(outcome.rows_recorded, 1);
    let history = aggregator.history();
    assert_eq!(history["core-0"].len(), 2);
    assert_eq!(history["core-1"].len(), 1);
    assert_eq!(history["core-1"][0].txtype, "before");
}
