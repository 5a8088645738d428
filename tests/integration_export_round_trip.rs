use ledger_benchmark::{
    aggregator::{LoadParams, PerformanceAggregator, PerformanceHistory},
    report::{self, FileSink, MemorySink},
    topology::{CatchupMode, CoreSet, NetworkCfg},
    transport::sim::{SimLoadProfile, SimTransport},
};
use parking_lot::RwLock;
use std::time::Duration;

fn profile(with_load_generator: bool) -> SimLoadProfile {
    SimLoadProfile {
        ledgers: 8,
        mean_txs_per_ledger: 25.0,
        mean_close_ms: 150.0,
        window: Duration::from_secs(2),
        with_load_generator,
    }
}

/// Run `rounds` measurement rounds against a two-peer core-set and return
/// the recorded history together with the (post-run) network view.
async fn record_history(rounds: usize, with_load_generator: bool) -> (PerformanceHistory, NetworkCfg) {
    let core = CoreSet::new("core", 3, 2, CatchupMode::None).unwrap();
    let network = RwLock::new(NetworkCfg::with_nonce("etest", "export", vec![core]).unwrap());

    let sim = SimTransport::new();
    sim.register_network(&network.read()).unwrap();

    let mut aggregator = PerformanceAggregator::new(sim.clone());
    for round in 0..rounds {
        let sim_in_round = sim.clone();
        let load_profile = profile(with_load_generator);
        aggregator
            .measure_round(
                &network,
                LoadParams::new(format!("load-{}", round), 10, 200, 10, 25),
                || async move {
                    sim_in_round.apply_load("core-0.etest", &load_profile).unwrap();
                    sim_in_round.apply_load("core-1.etest", &load_profile).unwrap();
                },
            )
            .await;
    }
    (aggregator.into_history(), network.into_inner())
}

#[tokio::test]
async fn exported_table_parses_back_to_the_same_rows() {
    let (history, network) = record_history(3, true).await;

    let sink = MemorySink::new();
    let failures = report::export_all(&history, &network, &sink);
    assert!(failures.is_empty());

    for name in ["core-0", "core-1"] {
        let content = sink
            .artifact("export", &format!("{}.perf", name))
            .expect("artifact written");
        let parsed = report::parse_rows(&content).unwrap();
        assert_eq!(parsed, history[name]);
        assert!(parsed.iter().all(|row| row.load_step_rate.is_some()));
    }

    // live count is 2, so the third known ordinal has no history and no file
    assert!(sink.artifact("export", "core-2.perf").is_none());
}

#[tokio::test]
async fn absent_load_generator_fields_round_trip_as_nan() {
    let (history, network) = record_history(1, false).await;

    let sink = MemorySink::new();
    report::export_all(&history, &network, &sink);

    let content = sink.artifact("export", "core-0.perf").unwrap();
    let data_line = content.lines().nth(1).unwrap();
    assert!(data_line.contains("\tNaN\tNaN\t"));

    let parsed = report::parse_rows(&content).unwrap();
    assert!(parsed[0].load_step_rate.is_none());
}

/// Shrinking the live set after recording must not lose the removed peer's
/// artifact: histories are keyed by short name, and export walks every known
/// ordinal.
#[tokio::test]
async fn removed_peer_history_is_still_exported() {
    let (history, mut network) = record_history(2, true).await;

    network
        .core_set_mut("core")
        .unwrap()
        .set_live_count(1)
        .unwrap();

    let sink = MemorySink::new();
    let failures = report::export_all(&history, &network, &sink);
    assert!(failures.is_empty());

    let content = sink.artifact("export", "core-1.perf").expect("retained");
    assert_eq!(report::parse_rows(&content).unwrap().len(), 2);
}

#[tokio::test]
async fn file_sink_writes_artifacts_under_namespace() {
    let (history, network) = record_history(1, true).await;

    let dir = tempfile::tempdir().unwrap();
    let sink = FileSink::new(dir.path());
    let failures = report::export_all(&history, &network, &sink);
    assert!(failures.is_empty());

    let path = dir.path().join("export").join("core-0.perf");
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(report::parse_rows(&content).unwrap().len(), 1);
}
