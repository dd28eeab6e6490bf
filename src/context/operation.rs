//! Per-operation time budget and cancellation scope.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::context::{Clock, ContextError, ContextResult, SystemClock, Timeout};
use crate::observability::metrics;

/// Time budget and cancellation scope of one logical operation.
///
/// A context is immutable once built. Children resolve their budget against
/// the parent's remaining time at creation and keep only that result, so a
/// parent can be dropped while its children are still in use. The only shared
/// mutable part is the cancellation latch.
#[derive(Debug, Clone)]
pub struct OperationContext {
    id: Uuid,
    clock: Arc<dyn Clock>,
    timeout: Option<Timeout>,
    root_timeout_configured: bool,
    started_at: Instant,
    cancellation: CancellationToken,
}

impl OperationContext {
    /// Create the root context of a top-level call.
    ///
    /// `None` means no timeout is configured for the call.
    pub fn root(
        clock: Arc<dyn Clock>,
        timeout: Option<Timeout>,
        cancellation: CancellationToken,
    ) -> Self {
        let started_at = clock.now();
        let context = Self {
            id: Uuid::new_v4(),
            clock,
            timeout,
            root_timeout_configured: timeout.is_some(),
            started_at,
            cancellation,
        };
        tracing::debug!(
            operation_id = %context.id,
            timeout = ?context.timeout,
            "Root operation context created"
        );
        context
    }

    /// Root context on the system clock.
    pub fn new(timeout: Option<Timeout>, cancellation: CancellationToken) -> Self {
        Self::root(Arc::new(SystemClock), timeout, cancellation)
    }

    /// Derive a context for a sub-operation.
    ///
    /// The child's budget is the smaller of the parent's remaining budget and
    /// `timeout`. Whether the root was configured is inherited as is: a child
    /// that brings its own budget does not turn on the operation timeout.
    /// Cancelling the parent cancels the child, not the reverse.
    pub fn derive_child(&self, timeout: Option<Timeout>) -> Self {
        let inherited = self.timeout.map(|_| self.remaining_timeout());
        let effective = match (inherited, timeout) {
            (Some(inherited), Some(requested)) => Some(inherited.min(requested)),
            (Some(inherited), None) => Some(inherited),
            (None, requested) => requested,
        };

        tracing::trace!(
            operation_id = %self.id,
            requested = ?timeout,
            effective = ?effective,
            "Child operation context derived"
        );

        Self {
            id: self.id,
            clock: self.clock.clone(),
            timeout: effective,
            root_timeout_configured: self.root_timeout_configured,
            started_at: self.clock.now(),
            cancellation: self.cancellation.child_token(),
        }
    }

    /// Identifier shared by a root context and all of its descendants.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Budget this context was created with, after inheritance.
    pub fn timeout(&self) -> Option<Timeout> {
        self.timeout
    }

    /// Whether the root of this context's chain was given a timeout.
    ///
    /// A zero timeout and an unbounded timeout both count as configured.
    /// Budgets added by children do not.
    pub fn is_root_context_timeout_configured(&self) -> bool {
        self.root_timeout_configured
    }

    /// Time since this context was created.
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started_at)
    }

    /// Budget left; `Unbounded` when no timeout is configured.
    pub fn remaining_timeout(&self) -> Timeout {
        match self.timeout {
            Some(timeout) => timeout.saturating_sub(self.elapsed()),
            None => Timeout::Unbounded,
        }
    }

    /// Budget left, or `default` when no timeout is configured.
    ///
    /// An expired budget is reported as [`Timeout::ZERO`], never as `default`.
    pub fn remaining_timeout_or_default(&self, default: Timeout) -> Timeout {
        match self.timeout {
            Some(_) => self.remaining_timeout(),
            None => default,
        }
    }

    /// Whether the configured budget has run out.
    pub fn is_timed_out(&self) -> bool {
        self.timeout.is_some() && self.remaining_timeout().is_expired()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Cancellation token observed by this context.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Resolves once this context is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// Fail if the context is cancelled or out of time.
    pub fn check(&self) -> ContextResult<()> {
        if self.is_cancelled() {
            return Err(self.cancelled_error());
        }
        if self.is_timed_out() {
            return Err(self.timed_out_error());
        }
        Ok(())
    }

    /// Drive `future` until it completes, the budget runs out, or the
    /// context is cancelled, whichever comes first.
    pub async fn run<F>(&self, future: F) -> ContextResult<F::Output>
    where
        F: Future,
    {
        self.check()?;

        let remaining = self.remaining_timeout();
        let expiry = async move {
            match remaining {
                Timeout::Bounded(remaining) => tokio::time::sleep(remaining).await,
                Timeout::Unbounded => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            output = future => Ok(output),
            _ = self.cancellation.cancelled() => Err(self.cancelled_error()),
            _ = expiry => Err(self.timed_out_error()),
        }
    }

    /// `maxTimeMS` to send with a command, leaving room for the round trip.
    ///
    /// Returns `None` when the root has no timeout, the remaining budget is
    /// unbounded or the round trip time is unknown. A budget that would leave less than one millisecond
    /// for the server is reported as timed out.
    pub fn server_max_time(&self, round_trip_time: Duration) -> ContextResult<Option<u64>> {
        if !self.is_root_context_timeout_configured() || round_trip_time.is_zero() {
            return Ok(None);
        }

        match self.remaining_timeout() {
            Timeout::Unbounded => Ok(None),
            Timeout::Bounded(remaining) => {
                let millis = remaining.saturating_sub(round_trip_time).as_millis();
                if millis == 0 {
                    return Err(self.timed_out_error());
                }
                Ok(Some(u64::try_from(millis).unwrap_or(u64::MAX)))
            }
        }
    }

    fn timed_out_error(&self) -> ContextError {
        let elapsed = self.elapsed();
        tracing::warn!(operation_id = %self.id, elapsed_ms = elapsed.as_millis() as u64, "Operation timed out");
        metrics::record_context_outcome("timed_out");
        ContextError::TimedOut { elapsed }
    }

    fn cancelled_error(&self) -> ContextError {
        tracing::debug!(operation_id = %self.id, "Operation cancelled");
        metrics::record_context_outcome("cancelled");
        ContextError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FrozenClock, ManualClock};

    fn frozen(timeout: Option<Timeout>) -> OperationContext {
        OperationContext::root(
            Arc::new(FrozenClock::default()),
            timeout,
            CancellationToken::new(),
        )
    }

    fn ms(millis: u64) -> Timeout {
        Timeout::Bounded(Duration::from_millis(millis))
    }

    #[test]
    fn test_timeout_configured_table() {
        assert!(!frozen(None).is_root_context_timeout_configured());
        assert!(frozen(Some(Timeout::ZERO)).is_root_context_timeout_configured());
        assert!(frozen(Some(Timeout::Unbounded)).is_root_context_timeout_configured());
        assert!(frozen(Some(ms(500))).is_root_context_timeout_configured());
    }

    #[test]
    fn test_remaining_with_frozen_clock() {
        let default = ms(42);
        assert_eq!(frozen(None).remaining_timeout_or_default(default), default);
        assert_eq!(frozen(Some(ms(500))).remaining_timeout_or_default(default), ms(500));
        assert_eq!(
            frozen(Some(Timeout::Unbounded)).remaining_timeout_or_default(default),
            Timeout::Unbounded
        );
        assert_eq!(
            frozen(Some(Timeout::ZERO)).remaining_timeout_or_default(default),
            Timeout::ZERO
        );
    }

    #[test]
    fn test_expired_reports_zero_not_default() {
        let clock = ManualClock::new();
        let ctx = OperationContext::root(Arc::new(clock.clone()), Some(ms(100)), CancellationToken::new());

        clock.advance(Duration::from_millis(30));
        assert_eq!(ctx.remaining_timeout_or_default(ms(999)), ms(70));
        assert!(!ctx.is_timed_out());

        clock.advance(Duration::from_millis(500));
        assert_eq!(ctx.remaining_timeout_or_default(ms(999)), Timeout::ZERO);
        assert!(ctx.is_timed_out());
        assert!(matches!(ctx.check(), Err(ContextError::TimedOut { .. })));
    }

    #[test]
    fn test_huge_clock_step_expires_budget() {
        let clock = ManualClock::new();
        let ctx = OperationContext::root(Arc::new(clock.clone()), Some(ms(100)), CancellationToken::new());

        clock.advance(Duration::MAX);
        assert_eq!(ctx.remaining_timeout(), Timeout::ZERO);
        assert!(ctx.is_timed_out());
    }

    #[test]
    fn test_zero_timeout_is_already_expired() {
        let ctx = frozen(Some(Timeout::ZERO));
        assert!(ctx.is_timed_out());
        assert!(ctx.check().is_err());
    }

    #[test]
    fn test_child_can_only_shrink_budget() {
        let clock = ManualClock::new();
        let root = OperationContext::root(Arc::new(clock.clone()), Some(ms(1000)), CancellationToken::new());
        clock.advance(Duration::from_millis(400));

        let wider = root.derive_child(Some(ms(5000)));
        assert_eq!(wider.timeout(), Some(ms(600)));

        let narrower = root.derive_child(Some(ms(100)));
        assert_eq!(narrower.timeout(), Some(ms(100)));

        let inherited = root.derive_child(None);
        assert_eq!(inherited.timeout(), Some(ms(600)));
        assert_eq!(inherited.id(), root.id());
    }

    #[test]
    fn test_child_of_unconfigured_root() {
        let root = frozen(None);
        assert!(!root.derive_child(None).is_root_context_timeout_configured());

        let child = root.derive_child(Some(ms(50)));
        assert!(!child.is_root_context_timeout_configured());
        assert_eq!(child.remaining_timeout(), ms(50));
        assert_eq!(child.remaining_timeout_or_default(ms(999)), ms(50));
        assert!(!child.derive_child(None).is_root_context_timeout_configured());
    }

    #[test]
    fn test_child_budget_does_not_set_max_time() {
        let root = frozen(None);
        let selection = root.derive_child(Some(Timeout::Bounded(Duration::from_secs(30))));

        assert_eq!(selection.server_max_time(Duration::from_millis(5)), Ok(None));

        let configured = frozen(Some(ms(500))).derive_child(Some(ms(100)));
        assert!(configured.is_root_context_timeout_configured());
        assert_eq!(configured.server_max_time(Duration::from_millis(20)), Ok(Some(80)));
    }

    #[test]
    fn test_unbounded_parent_takes_child_budget() {
        let root = frozen(Some(Timeout::Unbounded));
        assert_eq!(root.derive_child(Some(ms(10))).timeout(), Some(ms(10)));
        assert_eq!(root.derive_child(None).timeout(), Some(Timeout::Unbounded));
    }

    #[test]
    fn test_child_outlives_parent() {
        let child = {
            let root = frozen(Some(ms(300)));
            root.derive_child(None)
        };
        assert_eq!(child.remaining_timeout(), ms(300));
    }

    #[test]
    fn test_cancellation_flows_down_only() {
        let root = frozen(None);
        let child = root.derive_child(None);

        child.cancellation().cancel();
        assert!(child.is_cancelled());
        assert!(!root.is_cancelled());

        let sibling = root.derive_child(None);
        root.cancellation().cancel();
        assert!(sibling.is_cancelled());
        assert_eq!(sibling.check(), Err(ContextError::Cancelled));
    }

    #[test]
    fn test_cancelled_and_timed_out_are_distinct() {
        let ctx = frozen(Some(Timeout::ZERO));
        assert!(matches!(ctx.check(), Err(ContextError::TimedOut { .. })));
        ctx.cancellation().cancel();
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
    }

    #[test]
    fn test_server_max_time() {
        let rtt = Duration::from_millis(20);

        assert_eq!(frozen(None).server_max_time(rtt), Ok(None));
        assert_eq!(frozen(Some(Timeout::Unbounded)).server_max_time(rtt), Ok(None));
        assert_eq!(frozen(Some(ms(500))).server_max_time(Duration::ZERO), Ok(None));
        assert_eq!(frozen(Some(ms(500))).server_max_time(rtt), Ok(Some(480)));
        assert!(matches!(
            frozen(Some(ms(20))).server_max_time(rtt),
            Err(ContextError::TimedOut { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_completes_within_budget() {
        let ctx = OperationContext::new(Some(ms(1000)), CancellationToken::new());
        let out = ctx
            .run(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                7
            })
            .await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_times_out() {
        let ctx = OperationContext::new(Some(ms(50)), CancellationToken::new());
        let out = ctx.run(tokio::time::sleep(Duration::from_secs(60))).await;
        assert!(matches!(out, Err(ContextError::TimedOut { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_observes_cancellation() {
        let token = CancellationToken::new();
        let ctx = OperationContext::new(None, token.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            token.cancel();
        });

        let out = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(out, Err(ContextError::Cancelled));
    }

    #[test]
    fn test_concurrent_queries() {
        let ctx = Arc::new(frozen(Some(ms(250))));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ctx = ctx.clone();
                std::thread::spawn(move || ctx.remaining_timeout_or_default(Timeout::ZERO))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), ms(250));
        }
    }
}
