//! Operation dispatch governance.
//!
//! # Data Flow
//! ```text
//! Client call:
//!     → governor.rs: consume admission tokens from the resource's bucket (reject if throttled)
//!     → governor.rs: build root OperationContext (call timeout or configured default)
//!     → governor.rs: resolve read preference (reads only)
//!     → caller derives child contexts per server round trip
//! ```
//!
//! # Design Decisions
//! - The governor owns the limiter registry; callers reach it through the governor, not a global
//! - Calls that name no resource share the `operations` bucket
//! - Reloadable settings are swapped atomically; in-flight operations keep what they started with

use thiserror::Error;

use crate::config::ConfigError;
use crate::context::ContextError;
use crate::limiter::LimiterError;
use crate::preference::PreferenceError;

pub mod governor;

pub use governor::{GovernorSettings, OperationGovernor, ReadAdmission, DEFAULT_RESOURCE};

/// Errors surfaced to operation dispatch.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// Not enough admission tokens.
    #[error("Operation on '{resource}' throttled: requested {requested} tokens, {available} available")]
    Throttled {
        resource: String,
        requested: f64,
        available: f64,
    },

    #[error(transparent)]
    Limiter(#[from] LimiterError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Preference(#[from] PreferenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for dispatch governance.
pub type GovernanceResult<T> = Result<T, GovernanceError>;
