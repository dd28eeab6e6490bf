//! Concurrent use of one governor by many tasks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use op_governance::context::{SystemClock, Timeout};
use op_governance::dispatch::{GovernanceError, GovernorSettings};
use tokio_util::sync::CancellationToken;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_never_over_admit() {
    let governor = Arc::new(common::governor(
        50.0,
        Arc::new(SystemClock),
        GovernorSettings::default(),
    ));
    let admitted = Arc::new(AtomicUsize::new(0));
    let throttled = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..200 {
        let governor = governor.clone();
        let admitted = admitted.clone();
        let throttled = throttled.clone();
        handles.push(tokio::spawn(async move {
            match governor.begin_read(None, None, None, CancellationToken::new()) {
                Ok(_) => admitted.fetch_add(1, Ordering::SeqCst),
                Err(GovernanceError::Throttled { .. }) => throttled.fetch_add(1, Ordering::SeqCst),
                Err(e) => panic!("unexpected error: {e}"),
            };
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 50);
    assert_eq!(throttled.load(Ordering::SeqCst), 150);
    assert_eq!(common::default_tokens(&governor), Some(0.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_admit_and_release_keeps_balance() {
    let governor = Arc::new(common::governor(
        8.0,
        Arc::new(SystemClock),
        GovernorSettings {
            default_timeout: Some(Timeout::Unbounded),
            ..Default::default()
        },
    ));

    let mut handles = Vec::new();
    for _ in 0..64 {
        let governor = governor.clone();
        handles.push(tokio::spawn(async move {
            if let Ok(context) = governor.begin_write(None, CancellationToken::new()) {
                assert!(context.is_root_context_timeout_configured());
                assert!(!context.is_timed_out());
                governor.release().unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(common::default_tokens(&governor), Some(8.0));
}
