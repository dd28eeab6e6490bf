//! Shared utilities for integration tests.

use std::sync::Arc;

use op_governance::context::{Clock, FrozenClock, ManualClock, OperationContext, Timeout};
use op_governance::dispatch::{GovernorSettings, OperationGovernor, DEFAULT_RESOURCE};
use op_governance::limiter::LimiterRegistry;
use op_governance::preference::{ClientSession, ReadPreference, TransactionOptions};
use tokio_util::sync::CancellationToken;

/// Root context on a frozen clock, so elapsed time is always zero.
#[allow(dead_code)]
pub fn frozen_context(timeout: Option<Timeout>) -> OperationContext {
    OperationContext::root(Arc::new(FrozenClock::default()), timeout, CancellationToken::new())
}

/// Root context on a manual clock, returning the clock for stepping.
#[allow(dead_code)]
pub fn manual_context(timeout: Option<Timeout>) -> (ManualClock, OperationContext) {
    let clock = ManualClock::new();
    let context = OperationContext::root(Arc::new(clock.clone()), timeout, CancellationToken::new());
    (clock, context)
}

/// Session with a running transaction.
#[allow(dead_code)]
pub fn session_in_transaction(preference: Option<ReadPreference>) -> ClientSession {
    let mut session = ClientSession::new();
    session
        .start_transaction(TransactionOptions { read_preference: preference })
        .expect("fresh session has no transaction");
    session
}

/// Governor whose buckets hold `capacity` tokens each, one token per operation.
#[allow(dead_code)]
pub fn governor(
    capacity: f64,
    clock: Arc<dyn Clock>,
    settings: GovernorSettings,
) -> OperationGovernor {
    let registry = LimiterRegistry::new(capacity).expect("valid capacity");
    OperationGovernor::new(Some(Arc::new(registry)), 1.0, clock, settings)
}

/// Tokens left in the governor's default bucket.
#[allow(dead_code)]
pub fn default_tokens(governor: &OperationGovernor) -> Option<f64> {
    governor
        .bucket(DEFAULT_RESOURCE)
        .expect("valid capacity")
        .map(|bucket| bucket.tokens())
}
