//! Write concern timeout under an operation timeout.

use std::time::Duration;

use crate::context::OperationContext;

/// Default wtimeout for a commit retry when nothing else bounds it.
pub const COMMIT_RETRY_WTIMEOUT: Duration = Duration::from_millis(10_000);

/// Write concern timeout to send with a transaction write or commit.
///
/// A timeout configured on the root context replaces any wtimeout. Otherwise
/// a commit retry without one gets `commit_retry_fallback`, normally
/// [`COMMIT_RETRY_WTIMEOUT`].
pub fn effective_wtimeout(
    context: &OperationContext,
    requested: Option<Duration>,
    is_commit_retry: bool,
    commit_retry_fallback: Duration,
) -> Option<Duration> {
    if context.is_root_context_timeout_configured() {
        return None;
    }
    if is_commit_retry {
        return requested.or(Some(commit_retry_fallback));
    }
    requested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FrozenClock, Timeout};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn context(timeout: Option<Timeout>) -> OperationContext {
        OperationContext::root(Arc::new(FrozenClock::default()), timeout, CancellationToken::new())
    }

    #[test]
    fn test_timeout_strips_wtimeout() {
        let ctx = context(Some(Timeout::Bounded(Duration::from_secs(5))));
        assert_eq!(
            effective_wtimeout(&ctx, Some(Duration::from_secs(1)), false, COMMIT_RETRY_WTIMEOUT),
            None
        );
        assert_eq!(effective_wtimeout(&ctx, None, true, COMMIT_RETRY_WTIMEOUT), None);
        assert_eq!(effective_wtimeout(&ctx.derive_child(None), None, true, COMMIT_RETRY_WTIMEOUT), None);
    }

    #[test]
    fn test_commit_retry_fallback() {
        let ctx = context(None);
        assert_eq!(
            effective_wtimeout(&ctx, None, true, COMMIT_RETRY_WTIMEOUT),
            Some(COMMIT_RETRY_WTIMEOUT)
        );
        assert_eq!(
            effective_wtimeout(&ctx, Some(Duration::from_secs(3)), true, COMMIT_RETRY_WTIMEOUT),
            Some(Duration::from_secs(3))
        );
        assert_eq!(effective_wtimeout(&ctx, None, false, COMMIT_RETRY_WTIMEOUT), None);
    }

    #[test]
    fn test_custom_commit_retry_fallback() {
        let ctx = context(None);
        let fallback = Duration::from_millis(2_500);
        assert_eq!(effective_wtimeout(&ctx, None, true, fallback), Some(fallback));
        assert_eq!(
            effective_wtimeout(&ctx, Some(Duration::from_secs(3)), true, fallback),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_child_budget_keeps_wtimeout() {
        let selection = context(None).derive_child(Some(Timeout::Bounded(Duration::from_secs(30))));
        let requested = Some(Duration::from_secs(1));

        assert_eq!(
            effective_wtimeout(&selection, requested, false, COMMIT_RETRY_WTIMEOUT),
            requested
        );
        assert_eq!(
            effective_wtimeout(&selection, None, true, COMMIT_RETRY_WTIMEOUT),
            Some(COMMIT_RETRY_WTIMEOUT)
        );
    }
}
