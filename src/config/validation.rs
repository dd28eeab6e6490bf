//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities > 0, non-zero intervals)
//! - Check the default read preference is well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GovernanceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GovernanceConfig;
use crate::preference::PreferenceError;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("limiter.capacity must be positive and finite, got {0}")]
    InvalidCapacity(f64),

    #[error("limiter.admission_cost must be positive, got {0}")]
    InvalidAdmissionCost(f64),

    #[error("limiter.admission_cost {cost} exceeds capacity {capacity}")]
    AdmissionCostExceedsCapacity { cost: f64, capacity: f64 },

    #[error("limiter.refill_per_sec must not be negative, got {0}")]
    InvalidRefillRate(f64),

    #[error("limiter.refill_interval_ms must be non-zero when refill is enabled")]
    ZeroRefillInterval,

    #[error("limiter.resources.{resource} capacity must be positive and finite, got {capacity}")]
    InvalidResourceCapacity { resource: String, capacity: f64 },

    #[error("limiter.admission_cost {cost} exceeds limiter.resources.{resource} capacity {capacity}")]
    AdmissionCostExceedsResourceCapacity {
        resource: String,
        cost: f64,
        capacity: f64,
    },

    #[error("timeouts.commit_retry_wtimeout_ms must be non-zero")]
    ZeroCommitRetryWtimeout,

    #[error("read_preference: {0}")]
    ReadPreference(PreferenceError),

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

fn valid_capacity(capacity: f64) -> bool {
    capacity.is_finite() && capacity > 0.0
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &GovernanceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let limiter = &config.limiter;

    if !valid_capacity(limiter.capacity) {
        errors.push(ValidationError::InvalidCapacity(limiter.capacity));
    }
    if !(limiter.admission_cost > 0.0) {
        errors.push(ValidationError::InvalidAdmissionCost(limiter.admission_cost));
    } else if valid_capacity(limiter.capacity) && limiter.admission_cost > limiter.capacity {
        errors.push(ValidationError::AdmissionCostExceedsCapacity {
            cost: limiter.admission_cost,
            capacity: limiter.capacity,
        });
    }
    if !(limiter.refill_per_sec >= 0.0) {
        errors.push(ValidationError::InvalidRefillRate(limiter.refill_per_sec));
    } else if limiter.refill_per_sec > 0.0 && limiter.refill_interval_ms == 0 {
        errors.push(ValidationError::ZeroRefillInterval);
    }

    let mut resources: Vec<_> = limiter.resources.iter().collect();
    resources.sort_by(|a, b| a.0.cmp(b.0));
    for (resource, capacity) in resources {
        if !valid_capacity(*capacity) {
            errors.push(ValidationError::InvalidResourceCapacity {
                resource: resource.clone(),
                capacity: *capacity,
            });
        } else if limiter.admission_cost > *capacity {
            errors.push(ValidationError::AdmissionCostExceedsResourceCapacity {
                resource: resource.clone(),
                cost: limiter.admission_cost,
                capacity: *capacity,
            });
        }
    }

    if config.timeouts.commit_retry_wtimeout_ms == 0 {
        errors.push(ValidationError::ZeroCommitRetryWtimeout);
    }

    if let Some(preference) = &config.read_preference {
        if let Err(e) = preference.to_read_preference() {
            errors.push(ValidationError::ReadPreference(e));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
