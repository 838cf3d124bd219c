//! Integration tests for the reconnect back-off policy.
//!
//! Tests run with `start_paused = true`: the runtime auto-advances the
//! clock whenever every task is idle, so timers resolve instantly while
//! `Instant` arithmetic stays exact.

use std::time::Duration;

use partyline_reconnect::{BackoffConfig, ReconnectError, ReconnectPolicy};
use tokio::time::{self, Instant};

// =========================================================================
// Helpers
// =========================================================================

fn no_jitter(max_retries: Option<u32>) -> BackoffConfig {
    BackoffConfig {
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(8),
        multiplier: 2.0,
        jitter: 0.0,
        max_retries,
    }
}

// =========================================================================
// Scheduling
// =========================================================================

#[test]
fn test_new_policy_is_idle() {
    let policy: ReconnectPolicy<&str> =
        ReconnectPolicy::new(BackoffConfig::default());
    assert_eq!(policy.retries(), 0);
    assert!(!policy.is_pending());
    assert!(policy.target().is_none());
}

#[test]
fn test_schedule_doubles_delay_until_cap() {
    let mut policy = ReconnectPolicy::new(no_jitter(None));

    let delays: Vec<_> = (0..6)
        .map(|_| policy.schedule("R1").unwrap())
        .collect();

    assert_eq!(
        delays,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8),
            Duration::from_secs(8),
            Duration::from_secs(8),
        ]
    );
    assert_eq!(policy.retries(), 6);
}

#[test]
fn test_schedule_replaces_pending_target() {
    let mut policy = ReconnectPolicy::new(no_jitter(None));
    policy.schedule("R1").unwrap();
    policy.schedule("R2").unwrap();

    assert!(policy.is_pending());
    assert_eq!(policy.target(), Some(&"R2"));
}

#[test]
fn test_schedule_fails_at_retry_ceiling() {
    let mut policy = ReconnectPolicy::new(no_jitter(Some(3)));
    for _ in 0..3 {
        policy.schedule("R1").unwrap();
    }

    let err = policy.schedule("R1").unwrap_err();

    assert_eq!(err, ReconnectError::Exhausted { attempts: 3 });
    assert!(!policy.is_pending(), "exhaustion must drop the pending timer");
}

#[test]
fn test_reset_restarts_streak() {
    let mut policy = ReconnectPolicy::new(no_jitter(Some(2)));
    policy.schedule("R1").unwrap();
    policy.schedule("R1").unwrap();
    assert!(policy.schedule("R1").is_err());

    policy.reset();

    assert_eq!(policy.retries(), 0);
    assert_eq!(policy.schedule("R1").unwrap(), Duration::from_secs(1));
}

#[test]
fn test_cancel_is_idempotent() {
    let mut policy = ReconnectPolicy::new(no_jitter(None));
    policy.schedule("R1").unwrap();

    policy.cancel();
    policy.cancel();

    assert!(!policy.is_pending());
    // Cancelling does not forgive the failure streak.
    assert_eq!(policy.retries(), 1);
}

#[test]
fn test_jittered_delays_never_exceed_max() {
    let mut policy = ReconnectPolicy::new(BackoffConfig {
        initial_delay: Duration::from_secs(4),
        max_delay: Duration::from_secs(5),
        multiplier: 2.0,
        jitter: 0.5,
        max_retries: None,
    });
    for _ in 0..50 {
        let delay = policy.schedule(()).unwrap();
        assert!(delay <= Duration::from_secs(5), "{delay:?} over cap");
    }
}

// =========================================================================
// Waiting
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_fires_after_delay() {
    let mut policy = ReconnectPolicy::new(no_jitter(None));
    let start = Instant::now();
    policy.schedule("R1").unwrap();

    let target = policy.wait().await;

    assert_eq!(target, "R1");
    assert_eq!(start.elapsed(), Duration::from_secs(1));
    assert!(!policy.is_pending());
}

#[tokio::test(start_paused = true)]
async fn test_wait_pends_when_idle() {
    let mut policy: ReconnectPolicy<&str> =
        ReconnectPolicy::new(no_jitter(None));

    let result = time::timeout(Duration::from_secs(60), policy.wait()).await;

    assert!(result.is_err(), "idle policy must never fire");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_timer_never_fires() {
    let mut policy = ReconnectPolicy::new(no_jitter(None));
    policy.schedule("R1").unwrap();
    policy.cancel();

    let result = time::timeout(Duration::from_secs(60), policy.wait()).await;

    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_wait_keeps_timer() {
    let mut policy = ReconnectPolicy::new(no_jitter(None));
    policy.schedule("R1").unwrap();

    // Give up waiting halfway through.
    let early = time::timeout(Duration::from_millis(500), policy.wait()).await;
    assert!(early.is_err());
    assert!(policy.is_pending());

    let start = Instant::now();
    assert_eq!(policy.wait().await, "R1");
    assert_eq!(start.elapsed(), Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_retry_chain_in_select_loop() {
    let mut policy = ReconnectPolicy::new(no_jitter(Some(4)));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    let start = Instant::now();
    let mut fired = Vec::new();

    policy.schedule("R1").unwrap();
    loop {
        tokio::select! {
            _ = rx.recv() => unreachable!("no commands are sent"),
            target = policy.wait() => {
                fired.push((target, start.elapsed()));
                // Every attempt "fails" and schedules the next one.
                if policy.schedule(target).is_err() {
                    break;
                }
            }
        }
    }
    drop(tx);

    assert_eq!(
        fired,
        vec![
            ("R1", Duration::from_secs(1)),
            ("R1", Duration::from_secs(3)),
            ("R1", Duration::from_secs(7)),
            ("R1", Duration::from_secs(15)),
        ]
    );
}
