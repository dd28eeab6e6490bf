//! Read preference resolution.
//!
//! # Data Flow
//! ```text
//! Read operation about to be sent:
//!     explicit per-call preference?        → use it
//!     session in a transaction with one?   → use the transaction's
//!     client default configured?           → use it
//!     otherwise                            → primary
//! ```
//!
//! # Design Decisions
//! - Resolution is a pure function recomputed per operation; transaction state changes between calls
//! - Sessions are consumed through the [`SessionState`] trait
//! - Write concern timeout handling sits here too since it also depends on context and transaction state

use thiserror::Error;

pub mod read_preference;
pub mod resolver;
pub mod session;
pub mod write_concern;

pub use read_preference::{ReadPreference, ReadPreferenceMode, TagSet};
pub use resolver::resolve_read_preference;
pub use session::{ClientSession, SessionState, TransactionOptions, TransactionState};
pub use write_concern::{effective_wtimeout, COMMIT_RETRY_WTIMEOUT};

/// Errors raised while building preferences or driving session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferenceError {
    /// Unrecognized read preference mode name.
    #[error("Unknown read preference mode: {0}")]
    UnknownMode(String),

    /// Primary reads cannot be narrowed by tags.
    #[error("Tag sets cannot be used with primary read preference")]
    PrimaryWithTagSets,

    /// Primary reads cannot be bounded by staleness.
    #[error("Max staleness cannot be used with primary read preference")]
    PrimaryWithMaxStaleness,

    /// Max staleness below the allowed minimum.
    #[error("Max staleness of {actual_secs}s is below the minimum of {min_secs}s")]
    MaxStalenessTooSmall { actual_secs: u64, min_secs: u64 },

    /// `start_transaction` while one is already running.
    #[error("Transaction already in progress")]
    TransactionInProgress,

    /// Commit or abort without a running transaction.
    #[error("No transaction started")]
    NoTransactionStarted,
}

/// Result type for preference and session operations.
pub type PreferenceResult<T> = Result<T, PreferenceError>;
