use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::topology::CatchupMode;

/// Ledger Benchmark Harness - performance measurement for ledger replication test networks
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Number of core-sets in the simulated topology
    #[clap(long, default_value_t = crate::defaults::CORE_SETS)]
    pub core_sets: usize,

    /// Configured maximum size of each core-set
    #[clap(long, default_value_t = crate::defaults::MAX_NODES)]
    pub max_nodes: usize,

    /// Current live peer count per core-set (defaults to the maximum)
    #[clap(long)]
    pub live_nodes: Option<usize>,

    /// Number of measurement rounds to run
    #[clap(short = 'r', long, default_value_t = crate::defaults::ROUNDS)]
    pub rounds: usize,

    /// Workload label recorded in each performance row
    #[clap(long, default_value = "pay")]
    pub txtype: String,

    /// Number of load-generation accounts
    #[clap(long, default_value_t = crate::defaults::ACCOUNTS)]
    pub accounts: u64,

    /// Number of transactions submitted per round
    #[clap(long, default_value_t = crate::defaults::TX_COUNT)]
    pub txs: u64,

    /// Target transaction rate in transactions per second
    #[clap(long, default_value_t = crate::defaults::TX_RATE)]
    pub tx_rate: u32,

    /// Load-generation batch size
    #[clap(long, default_value_t = crate::defaults::BATCH_SIZE)]
    pub batch_size: u32,

    /// Catchup mode applied to every core-set (none, recent/N, complete)
    #[clap(long, value_parser = parse_catchup, default_value = "none")]
    pub catchup: CatchupMode,

    /// Simulated workload duration per round (e.g. "500ms", "2s")
    #[clap(short = 'd', long, value_parser = parse_duration, default_value = "1s")]
    pub round_duration: Duration,

    /// Output directory for .perf artifacts and the run summary
    #[clap(short = 'o', long, default_value = crate::defaults::OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Artifact namespace within the output directory
    #[clap(long, default_value = crate::defaults::NAMESPACE)]
    pub namespace: String,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

/// Parse a catchup mode from string ("none", "complete", "recent/N")
fn parse_catchup(s: &str) -> Result<CatchupMode, String> {
    match s.trim() {
        "none" => Ok(CatchupMode::None),
        "complete" => Ok(CatchupMode::Complete),
        other => {
            if let Some(count) = other.strip_prefix("recent/") {
                let n: u32 = count
                    .parse()
                    .map_err(|_| format!("invalid recent-ledger count: {}", count))?;
                Ok(CatchupMode::RecentWindow(n))
            } else {
                Err(format!(
                    "invalid catchup mode: {} (expected none, complete, or recent/N)",
                    other
                ))
            }
        }
    }
}

/// Parse duration from string (e.g., "10s", "5m", "1h")
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else {
        (s, "s") // Default to seconds
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    let duration = match unit {
        "ms" => Duration::from_millis(num as u64),
        "s" => Duration::from_secs(num as u64),
        "m" => Duration::from_secs((num * 60.0) as u64),
        "h" => Duration::from_secs((num * 3600.0) as u64),
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));

        assert!(parse_duration("").is_err());
        assert!(parse_duration("invalid").is_err());
    }

    #[test]
    fn test_parse_catchup() {
        assert_eq!(parse_catchup("none").unwrap(), CatchupMode::None);
        assert_eq!(parse_catchup("complete").unwrap(), CatchupMode::Complete);
        assert_eq!(
            parse_catchup("recent/1024").unwrap(),
            CatchupMode::RecentWindow(1024)
        );

        assert!(parse_catchup("recent/").is_err());
        assert!(parse_catchup("recent/abc").is_err());
        assert!(parse_catchup("everything").is_err());
    }
}
