//! Time-driven refill for a token bucket.
//!
//! # Responsibilities
//! - Deposit `rate × interval` tokens on every tick
//! - Stop promptly when the cancellation token fires
//!
//! # Design Decisions
//! - The bucket itself stays a pure counter; wall-clock refill lives here
//! - First deposit happens one interval after spawn, not immediately

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::limiter::{LimiterError, LimiterResult, TokenBucket};

/// Spawn a background task refilling `bucket` at `rate_per_sec`.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_refiller(
    bucket: Arc<TokenBucket>,
    rate_per_sec: f64,
    interval: Duration,
    cancel: CancellationToken,
) -> LimiterResult<JoinHandle<()>> {
    if interval.is_zero() {
        return Err(LimiterError::InvalidRefill("interval must be non-zero".into()));
    }
    let per_tick = rate_per_sec * interval.as_secs_f64();
    if !(per_tick.is_finite() && per_tick > 0.0) {
        return Err(LimiterError::InvalidRefill(format!(
            "rate {} per second yields no tokens per tick",
            rate_per_sec
        )));
    }

    let handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(rate_per_sec, interval_ms = interval.as_millis() as u64, "Refiller started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Refiller stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = bucket.deposit(per_tick) {
                        tracing::error!(error = %e, "Refill deposit rejected");
                        break;
                    }
                }
            }
        }
    });

    Ok(handle)
}
