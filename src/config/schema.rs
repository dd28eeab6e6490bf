//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the governance
//! layer. All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::Timeout;
use crate::limiter::DEFAULT_CAPACITY;
use crate::preference::{PreferenceResult, ReadPreference, ReadPreferenceMode, TagSet};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Admission limiter settings.
    pub limiter: LimiterConfig,

    /// Operation timeout settings.
    pub timeouts: TimeoutConfig,

    /// Client-level default read preference. Absent means primary.
    pub read_preference: Option<ReadPreferenceConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Admission limiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Enable admission control.
    pub enabled: bool,

    /// Bucket capacity (and starting balance).
    pub capacity: f64,

    /// Tokens taken per admitted operation.
    pub admission_cost: f64,

    /// Tokens deposited per second by the refiller (0 disables it).
    pub refill_per_sec: f64,

    /// Refiller tick in milliseconds.
    pub refill_interval_ms: u64,

    /// Capacity overrides for named resources.
    pub resources: HashMap<String, f64>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            admission_cost: 1.0,
            refill_per_sec: 0.0,
            refill_interval_ms: 100,
            resources: HashMap::new(),
        }
    }
}

impl LimiterConfig {
    pub fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default operation timeout in milliseconds. Negative means infinite,
    /// absent means no timeout configured.
    pub operation_timeout_ms: Option<i64>,

    /// Wait used for connection checkout when no operation timeout is configured.
    pub wait_queue_timeout_ms: u64,

    /// wtimeout applied to a commit retry that carries none, when no
    /// operation timeout is configured.
    pub commit_retry_wtimeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: None,
            wait_queue_timeout_ms: 120_000,
            commit_retry_wtimeout_ms: 10_000,
        }
    }
}

impl TimeoutConfig {
    pub fn operation_timeout(&self) -> Option<Timeout> {
        self.operation_timeout_ms.map(Timeout::from_millis)
    }

    pub fn wait_queue_timeout(&self) -> Timeout {
        Timeout::Bounded(Duration::from_millis(self.wait_queue_timeout_ms))
    }

    pub fn commit_retry_wtimeout(&self) -> Duration {
        Duration::from_millis(self.commit_retry_wtimeout_ms)
    }
}

/// Read preference as written in a config file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReadPreferenceConfig {
    /// Routing mode, e.g. "secondaryPreferred".
    pub mode: ReadPreferenceMode,

    /// Optional tag sets.
    pub tag_sets: Vec<TagSet>,

    /// Optional max staleness in seconds.
    pub max_staleness_secs: Option<u64>,
}

impl ReadPreferenceConfig {
    /// Build the validated preference.
    pub fn to_read_preference(&self) -> PreferenceResult<ReadPreference> {
        let preference = ReadPreference::new(self.mode).with_tag_sets(self.tag_sets.clone())?;
        match self.max_staleness_secs {
            Some(secs) => preference.with_max_staleness(Duration::from_secs(secs)),
            None => Ok(preference),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
