//! Governance simulator.
//!
//! Runs a batch of concurrent simulated reads through an [`OperationGovernor`]
//! and prints a JSON summary of admissions, timeouts and resolved preferences.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use serde_json::json;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use op_governance::config::watcher::ConfigWatcher;
use op_governance::config::{load_config, GovernanceConfig};
use op_governance::context::{ContextError, Timeout};
use op_governance::dispatch::{GovernanceError, OperationGovernor, DEFAULT_RESOURCE};
use op_governance::limiter::refiller::spawn_refiller;
use op_governance::observability::{logging, metrics};
use op_governance::preference::{ClientSession, ReadPreference, SessionState, TransactionOptions};

#[derive(Parser)]
#[command(name = "governance-sim")]
#[command(about = "Drive simulated operations through the governance layer", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of concurrent operations.
    #[arg(short, long, default_value_t = 32)]
    operations: usize,

    /// Simulated server work per operation, in milliseconds.
    #[arg(short, long, default_value_t = 20)]
    work_ms: u64,

    /// Per-call timeout in milliseconds (negative means infinite).
    #[arg(short, long)]
    timeout_ms: Option<i64>,

    /// Reload the config file when it changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Outcome {
    Completed,
    Throttled,
    TimedOut,
    Cancelled,
    Failed,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Throttled => "throttled",
            Outcome::TimedOut => "timed_out",
            Outcome::Cancelled => "cancelled",
            Outcome::Failed => "failed",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GovernanceConfig::default(),
    };

    logging::init_logging(&config.observability.log_level)?;
    tracing::info!("governance-sim v0.1.0 starting");
    tracing::info!(
        capacity = config.limiter.capacity,
        admission_cost = config.limiter.admission_cost,
        operation_timeout = ?config.timeouts.operation_timeout(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let governor = Arc::new(OperationGovernor::from_config(&config)?);
    let shutdown = CancellationToken::new();

    let mut refillers = Vec::new();
    if config.limiter.refill_per_sec > 0.0 {
        let resources: BTreeSet<&str> = std::iter::once(DEFAULT_RESOURCE)
            .chain(config.limiter.resources.keys().map(String::as_str))
            .collect();
        for resource in resources {
            if let Some(bucket) = governor.bucket(resource)? {
                refillers.push(spawn_refiller(
                    bucket,
                    config.limiter.refill_per_sec,
                    config.limiter.refill_interval(),
                    shutdown.child_token(),
                )?);
            }
        }
    }

    // Kept alive for the duration of the run.
    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let watcher = watcher.run()?;
            let governor = governor.clone();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    if let Err(e) = governor.apply_config(&new_config) {
                        tracing::error!(error = %e, "Rejected reloaded configuration");
                    }
                }
            });
            Some(watcher)
        }
        _ => None,
    };

    let call_timeout = cli.timeout_ms.map(Timeout::from_millis);
    let wait_queue_timeout = config.timeouts.wait_queue_timeout();
    let work = Duration::from_millis(cli.work_ms);
    let started = Instant::now();

    let mut tasks = JoinSet::new();
    for i in 0..cli.operations {
        let governor = governor.clone();
        let cancellation = shutdown.child_token();
        tasks.spawn(async move {
            simulate_read(&governor, i, call_timeout, wait_queue_timeout, work, cancellation).await
        });
    }

    let mut outcomes: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut preferences: BTreeMap<String, usize> = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (outcome, preference) = joined?;
        *outcomes.entry(outcome.as_str()).or_default() += 1;
        if let Some(preference) = preference {
            *preferences.entry(preference.to_string()).or_default() += 1;
        }
    }

    shutdown.cancel();
    for refiller in refillers {
        refiller.await?;
    }

    let report = json!({
        "operations": cli.operations,
        "elapsed_ms": started.elapsed().as_millis() as u64,
        "outcomes": outcomes,
        "read_preferences": preferences,
        "tokens_remaining": governor.bucket(DEFAULT_RESOURCE)?.map(|b| b.tokens()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    tracing::info!("Simulation complete");
    Ok(())
}

/// One simulated read: admission, checkout wait, then a server round trip
/// under a child context. Every third operation runs inside a transaction.
async fn simulate_read(
    governor: &OperationGovernor,
    index: usize,
    call_timeout: Option<Timeout>,
    wait_queue_timeout: Timeout,
    work: Duration,
    cancellation: CancellationToken,
) -> (Outcome, Option<ReadPreference>) {
    let mut session = ClientSession::new();
    if index % 3 == 0 {
        let options = TransactionOptions {
            read_preference: Some(ReadPreference::nearest()),
        };
        if session.start_transaction(options).is_err() {
            return (Outcome::Failed, None);
        }
    }

    let admission = match governor.begin_read(
        Some(&session as &dyn SessionState),
        None,
        call_timeout,
        cancellation,
    ) {
        Ok(admission) => admission,
        Err(GovernanceError::Throttled { .. }) => return (Outcome::Throttled, None),
        Err(e) => {
            tracing::error!(error = %e, "Admission failed");
            return (Outcome::Failed, None);
        }
    };

    let context = &admission.context;
    let checkout_wait = context.remaining_timeout_or_default(wait_queue_timeout);
    tracing::debug!(operation_id = %context.id(), checkout_wait = %checkout_wait, "Checking out connection");

    let round_trip = context.derive_child(None);
    let result = round_trip.run(tokio::time::sleep(work)).await;

    if let Err(e) = governor.release() {
        tracing::error!(error = %e, "Failed to release admission tokens");
    }

    let outcome = match result {
        Ok(()) => Outcome::Completed,
        Err(ContextError::TimedOut { .. }) => Outcome::TimedOut,
        Err(ContextError::Cancelled) => Outcome::Cancelled,
        Err(ContextError::MissingContext { .. }) => Outcome::Failed,
    };
    (outcome, Some(admission.read_preference))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_requires_config() {
        assert!(Cli::try_parse_from(["governance-sim", "--watch"]).is_err());

        let cli = Cli::try_parse_from(["governance-sim", "--watch", "-c", "governance.toml"]).unwrap();
        assert!(cli.watch);
        assert_eq!(cli.config, Some(PathBuf::from("governance.toml")));
    }
}
