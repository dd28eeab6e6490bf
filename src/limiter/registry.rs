//! Per-resource bucket registry.
//!
//! # Responsibilities
//! - Hand out one shared bucket per guarded resource
//! - Create buckets lazily with a configured or default capacity
//! - Record admission outcomes per resource

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::LimiterConfig;
use crate::limiter::{LimiterError, LimiterResult, TokenBucket};
use crate::observability::metrics;

/// Registry of named token buckets.
#[derive(Debug)]
pub struct LimiterRegistry {
    buckets: DashMap<String, Arc<TokenBucket>>,
    default_capacity: f64,
    capacities: HashMap<String, f64>,
}

impl LimiterRegistry {
    /// Create a registry whose buckets all use `default_capacity`.
    pub fn new(default_capacity: f64) -> LimiterResult<Self> {
        Self::with_capacities(default_capacity, HashMap::new())
    }

    /// Create a registry with per-resource capacity overrides.
    pub fn with_capacities(
        default_capacity: f64,
        capacities: HashMap<String, f64>,
    ) -> LimiterResult<Self> {
        if !(default_capacity.is_finite() && default_capacity > 0.0) {
            return Err(LimiterError::InvalidCapacity(default_capacity));
        }
        if let Some(bad) = capacities.values().find(|c| !(c.is_finite() && **c > 0.0)) {
            return Err(LimiterError::InvalidCapacity(*bad));
        }

        Ok(Self {
            buckets: DashMap::new(),
            default_capacity,
            capacities,
        })
    }

    /// Build a registry from the limiter section of the configuration.
    pub fn from_config(config: &LimiterConfig) -> LimiterResult<Self> {
        Self::with_capacities(config.capacity, config.resources.clone())
    }

    /// Get the bucket for `resource`, creating it on first use.
    pub fn bucket(&self, resource: &str) -> LimiterResult<Arc<TokenBucket>> {
        if let Some(bucket) = self.buckets.get(resource) {
            return Ok(bucket.clone());
        }

        let capacity = self
            .capacities
            .get(resource)
            .copied()
            .unwrap_or(self.default_capacity);
        let candidate = Arc::new(TokenBucket::with_capacity(capacity)?);

        // Another caller may have raced us here; keep whichever landed first.
        let bucket = self
            .buckets
            .entry(resource.to_string())
            .or_insert(candidate)
            .clone();
        tracing::debug!(resource, capacity = bucket.capacity(), "Bucket registered");
        Ok(bucket)
    }

    /// Consume `amount` tokens from the bucket guarding `resource`.
    pub fn try_admit(&self, resource: &str, amount: f64) -> LimiterResult<bool> {
        let bucket = self.bucket(resource)?;
        let admitted = bucket.consume(amount)?;

        metrics::record_admission(resource, admitted);
        metrics::record_token_balance(resource, bucket.tokens());
        if !admitted {
            tracing::warn!(resource, amount, tokens = bucket.tokens(), "Admission rejected");
        }
        Ok(admitted)
    }

    /// Number of buckets created so far.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no bucket has been created yet.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
