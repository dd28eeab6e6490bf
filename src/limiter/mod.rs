//! Rate admission subsystem.
//!
//! # Data Flow
//! ```text
//! Operation dispatch:
//!     → registry.rs (look up the bucket guarding a resource)
//!     → token_bucket.rs (non-blocking consume; reject if balance too low)
//!     → On completion or on a timer: deposit (refiller.rs)
//! ```
//!
//! # Design Decisions
//! - Admission never blocks; callers decide whether to queue, retry or reject
//! - Refill is event driven; the refiller is an optional wrapper, not part of the bucket
//! - Buckets are owned instances shared through `Arc`, never process globals

use thiserror::Error;

pub mod refiller;
pub mod registry;
pub mod token_bucket;

pub use registry::LimiterRegistry;
pub use token_bucket::{TokenBucket, DEFAULT_CAPACITY};

/// Errors raised by the admission limiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LimiterError {
    /// A token amount was zero, negative or NaN.
    #[error("Invalid argument `{param}`: {value} must be a positive number")]
    InvalidArgument { param: &'static str, value: f64 },

    /// Bucket capacity must be positive and finite.
    #[error("Invalid bucket capacity: {0}")]
    InvalidCapacity(f64),

    /// Refill rate or interval cannot produce a positive deposit.
    #[error("Invalid refill schedule: {0}")]
    InvalidRefill(String),
}

/// Result type for limiter operations.
pub type LimiterResult<T> = Result<T, LimiterError>;
