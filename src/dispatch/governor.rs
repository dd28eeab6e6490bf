//! Admission, deadline and preference for each outgoing operation.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;

use crate::config::GovernanceConfig;
use crate::context::{Clock, OperationContext, SystemClock, Timeout};
use crate::dispatch::{GovernanceError, GovernanceResult};
use crate::limiter::{LimiterRegistry, TokenBucket};
use crate::observability::metrics;
use crate::preference::{
    effective_wtimeout, resolve_read_preference, ReadPreference, SessionState, COMMIT_RETRY_WTIMEOUT,
};

/// Resource charged by calls that do not name one.
pub const DEFAULT_RESOURCE: &str = "operations";

/// Settings that may change while the governor is running.
#[derive(Debug, Clone, PartialEq)]
pub struct GovernorSettings {
    /// Timeout for calls that do not pass one.
    pub default_timeout: Option<Timeout>,

    /// Client-level default read preference.
    pub default_read_preference: Option<ReadPreference>,

    /// wtimeout for a commit retry that carries none.
    pub commit_retry_wtimeout: Duration,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            default_timeout: None,
            default_read_preference: None,
            commit_retry_wtimeout: COMMIT_RETRY_WTIMEOUT,
        }
    }
}

impl GovernorSettings {
    pub fn from_config(config: &GovernanceConfig) -> GovernanceResult<Self> {
        let default_read_preference = config
            .read_preference
            .as_ref()
            .map(|p| p.to_read_preference())
            .transpose()?;

        Ok(Self {
            default_timeout: config.timeouts.operation_timeout(),
            default_read_preference,
            commit_retry_wtimeout: config.timeouts.commit_retry_wtimeout(),
        })
    }
}

/// What a read operation needs before it is sent.
#[derive(Debug, Clone)]
pub struct ReadAdmission {
    pub context: OperationContext,
    pub read_preference: ReadPreference,
}

/// Gatekeeper shared by all operations of one client.
#[derive(Debug)]
pub struct OperationGovernor {
    limiter: Option<Arc<LimiterRegistry>>,
    admission_cost: f64,
    clock: Arc<dyn Clock>,
    settings: ArcSwap<GovernorSettings>,
}

impl OperationGovernor {
    /// Create a governor. `limiter: None` disables admission control.
    pub fn new(
        limiter: Option<Arc<LimiterRegistry>>,
        admission_cost: f64,
        clock: Arc<dyn Clock>,
        settings: GovernorSettings,
    ) -> Self {
        Self {
            limiter,
            admission_cost,
            clock,
            settings: ArcSwap::from_pointee(settings),
        }
    }

    /// Build a governor on the system clock from validated configuration.
    ///
    /// `limiter.capacity` sizes every bucket not listed under `limiter.resources`.
    pub fn from_config(config: &GovernanceConfig) -> GovernanceResult<Self> {
        let limiter = if config.limiter.enabled {
            Some(Arc::new(LimiterRegistry::from_config(&config.limiter)?))
        } else {
            None
        };

        Ok(Self::new(
            limiter,
            config.limiter.admission_cost,
            Arc::new(SystemClock),
            GovernorSettings::from_config(config)?,
        ))
    }

    /// The bucket registry, if admission control is enabled.
    pub fn limiter(&self) -> Option<&Arc<LimiterRegistry>> {
        self.limiter.as_ref()
    }

    /// The bucket guarding `resource`, if admission control is enabled.
    pub fn bucket(&self, resource: &str) -> GovernanceResult<Option<Arc<TokenBucket>>> {
        match &self.limiter {
            Some(registry) => Ok(Some(registry.bucket(resource)?)),
            None => Ok(None),
        }
    }

    /// Current reloadable settings.
    pub fn settings(&self) -> Arc<GovernorSettings> {
        self.settings.load_full()
    }

    /// Replace the reloadable settings from a new configuration.
    pub fn apply_config(&self, config: &GovernanceConfig) -> GovernanceResult<()> {
        let settings = GovernorSettings::from_config(config)?;
        tracing::info!(
            default_timeout = ?settings.default_timeout,
            default_read_preference = ?settings.default_read_preference,
            commit_retry_wtimeout_ms = settings.commit_retry_wtimeout.as_millis() as u64,
            "Governor settings reloaded"
        );
        self.settings.store(Arc::new(settings));
        Ok(())
    }

    /// Admit a write operation and open its root context.
    pub fn begin_write(
        &self,
        timeout: Option<Timeout>,
        cancellation: CancellationToken,
    ) -> GovernanceResult<OperationContext> {
        self.begin_write_for(DEFAULT_RESOURCE, timeout, cancellation)
    }

    /// Like [`begin_write`](Self::begin_write), charged to `resource`.
    pub fn begin_write_for(
        &self,
        resource: &str,
        timeout: Option<Timeout>,
        cancellation: CancellationToken,
    ) -> GovernanceResult<OperationContext> {
        let settings = self.settings.load();
        self.admit(resource)?;
        Ok(self.root_context(timeout.or(settings.default_timeout), cancellation))
    }

    /// Admit a read operation, open its root context and resolve its preference.
    pub fn begin_read(
        &self,
        session: Option<&dyn SessionState>,
        explicit: Option<&ReadPreference>,
        timeout: Option<Timeout>,
        cancellation: CancellationToken,
    ) -> GovernanceResult<ReadAdmission> {
        self.begin_read_for(DEFAULT_RESOURCE, session, explicit, timeout, cancellation)
    }

    /// Like [`begin_read`](Self::begin_read), charged to `resource`.
    pub fn begin_read_for(
        &self,
        resource: &str,
        session: Option<&dyn SessionState>,
        explicit: Option<&ReadPreference>,
        timeout: Option<Timeout>,
        cancellation: CancellationToken,
    ) -> GovernanceResult<ReadAdmission> {
        let settings = self.settings.load();
        self.admit(resource)?;

        let context = self.root_context(timeout.or(settings.default_timeout), cancellation);
        let read_preference =
            resolve_read_preference(explicit, settings.default_read_preference.as_ref(), session);
        tracing::debug!(
            operation_id = %context.id(),
            resource,
            read_preference = %read_preference,
            "Read admitted"
        );

        Ok(ReadAdmission {
            context,
            read_preference,
        })
    }

    /// wtimeout to send with a transaction write or commit under `context`.
    pub fn write_concern_timeout(
        &self,
        context: &OperationContext,
        requested: Option<Duration>,
        is_commit_retry: bool,
    ) -> Option<Duration> {
        let fallback = self.settings.load().commit_retry_wtimeout;
        effective_wtimeout(context, requested, is_commit_retry, fallback)
    }

    /// Hand an operation's admission tokens back.
    pub fn release(&self) -> GovernanceResult<()> {
        self.release_for(DEFAULT_RESOURCE)
    }

    /// Hand admission tokens back to `resource`.
    pub fn release_for(&self, resource: &str) -> GovernanceResult<()> {
        if let Some(bucket) = self.bucket(resource)? {
            bucket.deposit(self.admission_cost)?;
            metrics::record_token_balance(resource, bucket.tokens());
        }
        Ok(())
    }

    fn admit(&self, resource: &str) -> GovernanceResult<()> {
        let Some(registry) = &self.limiter else {
            return Ok(());
        };

        if registry.try_admit(resource, self.admission_cost)? {
            return Ok(());
        }

        let available = registry.bucket(resource)?.tokens();
        Err(GovernanceError::Throttled {
            resource: resource.to_string(),
            requested: self.admission_cost,
            available,
        })
    }

    fn root_context(&self, timeout: Option<Timeout>, cancellation: CancellationToken) -> OperationContext {
        OperationContext::root(self.clock.clone(), timeout, cancellation)
    }
}
