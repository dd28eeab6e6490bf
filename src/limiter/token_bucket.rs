//! Token bucket admission primitive.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::limiter::{LimiterError, LimiterResult};

/// Capacity of a bucket built with [`TokenBucket::new`].
pub const DEFAULT_CAPACITY: f64 = 1000.0;

/// A counting token bucket.
///
/// The balance starts full and only changes through [`TokenBucket::consume`]
/// and [`TokenBucket::deposit`]. Both hold the balance lock for the whole
/// check-and-update, so concurrent callers can never jointly over-admit.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: Mutex<f64>,
}

impl TokenBucket {
    /// Create a full bucket with [`DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            tokens: Mutex::new(DEFAULT_CAPACITY),
        }
    }

    /// Create a full bucket with a custom capacity.
    pub fn with_capacity(capacity: f64) -> LimiterResult<Self> {
        if !(capacity.is_finite() && capacity > 0.0) {
            return Err(LimiterError::InvalidCapacity(capacity));
        }

        Ok(Self {
            capacity,
            tokens: Mutex::new(capacity),
        })
    }

    /// Maximum balance of the bucket.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Current balance.
    pub fn tokens(&self) -> f64 {
        *self.balance()
    }

    /// Try to take `amount` tokens.
    ///
    /// Returns `Ok(true)` when admitted and `Ok(false)` when the balance is too
    /// low, in which case nothing is taken.
    pub fn consume(&self, amount: f64) -> LimiterResult<bool> {
        ensure_positive(amount)?;

        let mut tokens = self.balance();
        if *tokens >= amount {
            *tokens -= amount;
            tracing::trace!(amount, tokens = *tokens, "Tokens consumed");
            Ok(true)
        } else {
            tracing::debug!(amount, tokens = *tokens, "Insufficient tokens");
            Ok(false)
        }
    }

    /// Return `amount` tokens to the bucket, clamped at capacity.
    pub fn deposit(&self, amount: f64) -> LimiterResult<()> {
        ensure_positive(amount)?;

        let mut tokens = self.balance();
        *tokens = (*tokens + amount).min(self.capacity);
        tracing::trace!(amount, tokens = *tokens, "Tokens deposited");
        Ok(())
    }

    fn balance(&self) -> MutexGuard<'_, f64> {
        // The balance is a plain number; a panic elsewhere cannot leave it torn.
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TokenBucket {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_positive(amount: f64) -> LimiterResult<()> {
    // Written as a positive check so NaN is rejected too.
    if amount > 0.0 {
        Ok(())
    } else {
        Err(LimiterError::InvalidArgument {
            param: "amount",
            value: amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_new_bucket_starts_full() {
        let bucket = TokenBucket::new();
        assert_eq!(bucket.capacity(), 1000.0);
        assert_eq!(bucket.tokens(), 1000.0);
    }

    #[test]
    fn test_consume_deposit_scenario() {
        let bucket = TokenBucket::new();

        assert!(bucket.consume(100.0).unwrap());
        assert_eq!(bucket.tokens(), 900.0);

        assert!(!bucket.consume(2000.0).unwrap());
        assert_eq!(bucket.tokens(), 900.0);

        bucket.deposit(200.0).unwrap();
        assert_eq!(bucket.tokens(), 1000.0);
    }

    #[test]
    fn test_consume_exact_balance() {
        let bucket = TokenBucket::with_capacity(5.0).unwrap();
        assert!(bucket.consume(5.0).unwrap());
        assert_eq!(bucket.tokens(), 0.0);
        assert!(!bucket.consume(0.5).unwrap());
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let bucket = TokenBucket::new();
        bucket.consume(10.0).unwrap();

        for amount in [0.0, -1.0, f64::NAN] {
            let err = bucket.consume(amount).unwrap_err();
            assert!(matches!(err, LimiterError::InvalidArgument { param: "amount", .. }));
            let err = bucket.deposit(amount).unwrap_err();
            assert!(matches!(err, LimiterError::InvalidArgument { param: "amount", .. }));
        }

        assert_eq!(bucket.tokens(), 990.0);
    }

    #[test]
    fn test_invalid_capacity() {
        assert!(TokenBucket::with_capacity(0.0).is_err());
        assert!(TokenBucket::with_capacity(-3.0).is_err());
        assert!(TokenBucket::with_capacity(f64::INFINITY).is_err());
        assert!(TokenBucket::with_capacity(f64::NAN).is_err());
    }

    #[test]
    fn test_concurrent_consumers_never_over_admit() {
        let bucket = Arc::new(TokenBucket::with_capacity(100.0).unwrap());
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bucket = bucket.clone();
                let admitted = admitted.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if bucket.consume(1.0).unwrap() {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 100);
        assert_eq!(bucket.tokens(), 0.0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Consume(u32),
        Deposit(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..1500).prop_map(Op::Consume),
            (1u32..1500).prop_map(Op::Deposit),
        ]
    }

    proptest! {
        #[test]
        fn prop_balance_stays_within_bounds(ops in proptest::collection::vec(op(), 0..64)) {
            let bucket = TokenBucket::new();
            for op in ops {
                match op {
                    Op::Consume(n) => { bucket.consume(n as f64).unwrap(); }
                    Op::Deposit(n) => bucket.deposit(n as f64).unwrap(),
                }
                let tokens = bucket.tokens();
                prop_assert!((0.0..=bucket.capacity()).contains(&tokens));
            }
        }

        #[test]
        fn prop_consume_then_deposit_round_trips(spent in 1u32..1000, amount in 1u32..1000) {
            let bucket = TokenBucket::new();
            bucket.consume(spent as f64).unwrap();
            let before = bucket.tokens();

            if bucket.consume(amount as f64).unwrap() {
                bucket.deposit(amount as f64).unwrap();
            }
            prop_assert_eq!(bucket.tokens(), before);
        }

        #[test]
        fn prop_failed_consume_leaves_balance(spent in 1u32..1000, excess in 1u32..1000) {
            let bucket = TokenBucket::new();
            bucket.consume(spent as f64).unwrap();
            let before = bucket.tokens();

            prop_assert!(!bucket.consume(before + excess as f64).unwrap());
            prop_assert_eq!(bucket.tokens(), before);
        }
    }
}
