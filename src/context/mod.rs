//! Operation context subsystem.
//!
//! # Data Flow
//! ```text
//! Top-level client call:
//!     → OperationContext::root (clock, optional timeout, cancellation token)
//!     → derive_child per server round trip (budget can only shrink)
//!     → remaining_timeout_or_default at every wait point
//!     → check / run abort on expiry or cancellation
//! ```
//!
//! # Design Decisions
//! - A child stores its resolved budget, never a pointer to its parent
//! - "Infinite" is a variant of [`Timeout`], not a magic number
//! - Expiry is reported as a zero remaining budget; only `check`/`run` turn it into an error
//! - Timed out and cancelled are distinct errors

use std::time::Duration;

use thiserror::Error;

pub mod clock;
pub mod ext;
pub mod operation;
pub mod timeout;

pub use clock::{Clock, FrozenClock, ManualClock, SystemClock};
pub use ext::OperationContextExt;
pub use operation::OperationContext;
pub use timeout::Timeout;

/// Errors raised by operation contexts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// An operation was invoked without a context.
    #[error("Argument `{param}` must not be absent")]
    MissingContext { param: &'static str },

    /// The operation's time budget ran out.
    #[error("Operation timed out after {elapsed:?}")]
    TimedOut { elapsed: Duration },

    /// The operation was cancelled by its caller.
    #[error("Operation was cancelled")]
    Cancelled,
}

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;
