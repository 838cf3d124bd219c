//! Reconnect back-off policy for Partyline.
//!
//! Decides *whether* and *when* a lost session connection is re-established.
//! Delays grow exponentially from [`BackoffConfig::initial_delay`] up to
//! [`BackoffConfig::max_delay`], each one spread by random jitter so a fleet
//! of clients dropped by the same server restart does not reconnect in
//! lock-step. After [`BackoffConfig::max_retries`] consecutive failures the
//! policy refuses to schedule further attempts.
//!
//! # Integration
//!
//! The policy owns at most one pending timer and is designed to sit inside
//! the session driver's `tokio::select!` loop. A failed attempt simply calls
//! [`ReconnectPolicy::schedule`] again, so retries form a timer chain driven
//! by the loop rather than a recursive call stack:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* connect / disconnect */ }
//!         target = reconnect.wait() => start_dial(target),
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Back-off configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first reconnect attempt.
    pub initial_delay: Duration,
    /// Upper bound on any single delay (after jitter).
    pub max_delay: Duration,
    /// Growth factor between consecutive delays. Values below 1.0 are
    /// raised to 1.0.
    pub multiplier: f64,
    /// Relative jitter (0.0–1.0). `0.2` spreads each delay by ±20 %.
    pub jitter: f64,
    /// Consecutive attempts allowed before giving up. `None` retries
    /// forever.
    pub max_retries: Option<u32>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.2,
            max_retries: Some(10),
        }
    }
}

impl BackoffConfig {
    /// A constant delay with no jitter, bounded by `max_retries`.
    pub fn fixed(delay: Duration, max_retries: Option<u32>) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            jitter: 0.0,
            max_retries,
        }
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`ReconnectPolicy::new`]. Rules:
    /// - `multiplier` raised to at least 1.0 (NaN becomes 1.0).
    /// - `jitter` clamped to `0.0..=1.0` (NaN becomes 0.0).
    /// - `max_delay` raised to at least `initial_delay`.
    pub fn validated(mut self) -> Self {
        self.multiplier = self.multiplier.max(1.0);
        if !self.multiplier.is_finite() {
            warn!("back-off multiplier is not finite, using 1.0");
            self.multiplier = 1.0;
        }
        self.jitter = if self.jitter.is_nan() {
            0.0
        } else {
            self.jitter.clamp(0.0, 1.0)
        };
        if self.max_delay < self.initial_delay {
            warn!(
                initial_ms = self.initial_delay.as_millis() as u64,
                max_ms = self.max_delay.as_millis() as u64,
                "max_delay below initial_delay, raising it"
            );
            self.max_delay = self.initial_delay;
        }
        self
    }

    /// The un-jittered delay before attempt number `retry` (0-based).
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.min(64) as i32;
        let secs = self.initial_delay.as_secs_f64()
            * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by [`ReconnectPolicy::schedule`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconnectError {
    /// The retry ceiling was reached; no attempt was scheduled.
    #[error("gave up after {attempts} reconnect attempts")]
    Exhausted { attempts: u32 },
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

struct Pending<T> {
    target: T,
    deadline: Instant,
}

/// Reconnect state for one session: the retry counter and the single
/// pending timer, together with the target it will reconnect to.
pub struct ReconnectPolicy<T> {
    config: BackoffConfig,
    retries: u32,
    pending: Option<Pending<T>>,
}

impl<T> ReconnectPolicy<T> {
    /// Creates an idle policy.
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config: config.validated(),
            retries: 0,
            pending: None,
        }
    }

    /// Schedules a reconnect to `target`, replacing any pending one.
    ///
    /// Returns the delay until the attempt fires.
    ///
    /// # Errors
    /// [`ReconnectError::Exhausted`] once `max_retries` consecutive attempts
    /// have been scheduled without a [`reset`](Self::reset). Any pending
    /// timer is dropped in that case.
    pub fn schedule(&mut self, target: T) -> Result<Duration, ReconnectError> {
        if let Some(max) = self.config.max_retries {
            if self.retries >= max {
                self.pending = None;
                warn!(attempts = self.retries, "reconnect attempts exhausted");
                return Err(ReconnectError::Exhausted {
                    attempts: self.retries,
                });
            }
        }

        let delay = self.jittered(self.config.base_delay(self.retries));
        self.retries += 1;

        let replaced = self
            .pending
            .replace(Pending {
                target,
                deadline: Instant::now() + delay,
            })
            .is_some();

        debug!(
            attempt = self.retries,
            delay_ms = delay.as_millis() as u64,
            replaced,
            "reconnect scheduled"
        );
        Ok(delay)
    }

    /// Drops the pending timer, if any. Safe to call multiple times.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            debug!(attempt = self.retries, "reconnect cancelled");
        }
    }

    /// Marks the connection healthy: cancels any pending timer and starts
    /// the next failure streak from the initial delay.
    pub fn reset(&mut self) {
        self.cancel();
        self.retries = 0;
    }

    /// Waits until the pending timer fires and returns its target.
    ///
    /// With nothing scheduled this future pends forever, so a surrounding
    /// `select!` keeps servicing its other branches. Dropping the future
    /// before it completes leaves the timer in place.
    pub async fn wait(&mut self) -> T {
        let Some(deadline) = self.pending.as_ref().map(|p| p.deadline) else {
            return std::future::pending().await;
        };

        time::sleep_until(deadline).await;

        match self.pending.take() {
            Some(pending) => pending.target,
            None => std::future::pending().await,
        }
    }

    /// Consecutive attempts scheduled since the last [`reset`](Self::reset).
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Whether a reconnect timer is pending.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The target of the pending reconnect, if any.
    pub fn target(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.target)
    }

    /// The effective (validated) configuration.
    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.config.jitter == 0.0 || base.is_zero() {
            return base;
        }
        let spread = self.config.jitter;
        let factor = 1.0 + rand::rng().random_range(-spread..=spread);
        let secs = (base.as_secs_f64() * factor)
            .min(self.config.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }
}
