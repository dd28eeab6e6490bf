//! Session and transaction state consumed by the resolver.

use crate::preference::{PreferenceError, PreferenceResult, ReadPreference};

/// Ambient session state visible to read preference resolution.
pub trait SessionState {
    /// Whether a transaction is currently running on the session.
    fn is_in_transaction(&self) -> bool;

    /// The running transaction, if any.
    fn transaction(&self) -> Option<&TransactionState>;
}

/// Options a transaction is started with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    pub read_preference: Option<ReadPreference>,
}

/// A running transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionState {
    options: TransactionOptions,
}

impl TransactionState {
    pub fn new(options: TransactionOptions) -> Self {
        Self { options }
    }

    /// The preference this transaction was started with, if it set one.
    pub fn read_preference(&self) -> Option<&ReadPreference> {
        self.options.read_preference.as_ref()
    }
}

/// In-memory client session.
#[derive(Debug, Clone, Default)]
pub struct ClientSession {
    default_transaction_options: TransactionOptions,
    transaction: Option<TransactionState>,
}

impl ClientSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session whose transactions fall back to `defaults` for unset options.
    pub fn with_default_transaction_options(defaults: TransactionOptions) -> Self {
        Self {
            default_transaction_options: defaults,
            transaction: None,
        }
    }

    /// Start a transaction. Unset options are filled from the session defaults.
    pub fn start_transaction(&mut self, options: TransactionOptions) -> PreferenceResult<()> {
        if self.transaction.is_some() {
            return Err(PreferenceError::TransactionInProgress);
        }

        let read_preference = options
            .read_preference
            .or_else(|| self.default_transaction_options.read_preference.clone());
        self.transaction = Some(TransactionState::new(TransactionOptions { read_preference }));
        tracing::debug!("Transaction started");
        Ok(())
    }

    pub fn commit_transaction(&mut self) -> PreferenceResult<()> {
        self.end_transaction("committed")
    }

    pub fn abort_transaction(&mut self) -> PreferenceResult<()> {
        self.end_transaction("aborted")
    }

    fn end_transaction(&mut self, outcome: &'static str) -> PreferenceResult<()> {
        match self.transaction.take() {
            Some(_) => {
                tracing::debug!(outcome, "Transaction ended");
                Ok(())
            }
            None => Err(PreferenceError::NoTransactionStarted),
        }
    }
}

impl SessionState for ClientSession {
    fn is_in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    fn transaction(&self) -> Option<&TransactionState> {
        self.transaction.as_ref()
    }
}
