//! Countdown timing for Quizrace rooms.
//!
//! Two cancellable timers, both meant to sit inside a room actor's
//! `tokio::select!` loop:
//!
//! - [`TickScheduler`] — a fixed-interval ticker that can be started and
//!   stopped. Drives the once-per-second countdown.
//! - [`Delay`] — a one-shot deadline that can be armed and disarmed. Drives
//!   the short pause between "time's up" and the next question.
//!
//! While stopped (or disarmed) the `wait_*` futures pend forever, so the
//! corresponding `select!` branch simply never fires:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = ticker.wait_for_tick() => { /* countdown */ }
//!         _ = advance.wait() => { /* auto-advance */ }
//!     }
//! }
//! ```
//!
//! Both futures are cancel-safe: state only changes after the sleep
//! completes, so dropping a pending future leaves the timer untouched.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TickPolicy {
    /// Skip the missed tick(s) and resume one interval from now.
    /// A stalled room never replays a burst of countdown ticks.
    #[default]
    Skip,
    /// Keep the original cadence. The next tick fires one interval after
    /// the missed deadline, possibly immediately.
    Drop,
}

/// Configuration for a [`TickScheduler`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    /// Time between ticks. Must be non-zero.
    pub interval: Duration,
    /// Overrun handling policy.
    pub policy: TickPolicy,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            policy: TickPolicy::default(),
        }
    }
}

impl TickConfig {
    /// Shortest interval the scheduler accepts.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    /// Create a config for a specific interval with the default policy.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`]. A zero interval
    /// would spin the actor loop, so it is raised to [`Self::MIN_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_secs_f64() * 1000.0,
                "tick interval below minimum — clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Tick number since the last [`TickScheduler::start`] (starts at 1).
    pub tick: u64,
    /// `true` if this tick fired more than 10% of an interval late.
    pub overrun: bool,
    /// Whole intervals that were skipped because of the overrun.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval tick scheduler with start/stop.
///
/// One per room actor. Created stopped; [`start`](Self::start) schedules
/// the first tick one interval from now and [`stop`](Self::stop) cancels
/// everything that is pending.
#[derive(Debug)]
pub struct TickScheduler {
    config: TickConfig,
    next_tick: Option<Instant>,
    tick_count: u64,
}

impl TickScheduler {
    /// Create a stopped scheduler from config.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        debug!(
            interval_ms = config.interval.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "tick scheduler created"
        );
        Self {
            config,
            next_tick: None,
            tick_count: 0,
        }
    }

    /// Create a stopped scheduler for a specific interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self::new(TickConfig::with_interval(interval))
    }

    /// Start ticking. The first tick fires one interval from now.
    ///
    /// Restarting a running scheduler resets its cadence and tick count.
    pub fn start(&mut self) {
        self.tick_count = 0;
        self.next_tick = Some(Instant::now() + self.config.interval);
        debug!("tick scheduler started");
    }

    /// Stop ticking. Safe to call multiple times.
    pub fn stop(&mut self) {
        if self.next_tick.take().is_some() {
            debug!(tick = self.tick_count, "tick scheduler stopped");
        }
    }

    /// Whether the scheduler is currently ticking.
    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Wait until the next tick is due.
    ///
    /// While stopped this future pends forever.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let Some(next) = self.next_tick else {
            return std::future::pending().await;
        };

        time::sleep_until(next).await;

        let interval = self.config.interval;
        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > interval / 10;
        let mut ticks_skipped = 0u64;

        self.tick_count += 1;
        self.next_tick = Some(match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = (late_by.as_nanos() / interval.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "tick overrun — skipping ahead"
                        );
                    }
                }
                now + interval
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun — keeping original schedule"
                    );
                }
                next + interval
            }
        });

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Ticks fired since the last start.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

// ---------------------------------------------------------------------------
// Delay
// ---------------------------------------------------------------------------

/// A one-shot cancellable deadline.
///
/// [`wait`](Self::wait) resolves once after the armed duration and leaves
/// the delay disarmed, so it fires at most once per [`arm`](Self::arm).
#[derive(Debug, Default)]
pub struct Delay {
    deadline: Option<Instant>,
}

impl Delay {
    /// Create a disarmed delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the delay to fire `after` from now, replacing any pending deadline.
    pub fn arm(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
    }

    /// Cancel the pending deadline, if any.
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Wait for the deadline. Pends forever while disarmed.
    pub async fn wait(&mut self) {
        let Some(deadline) = self.deadline else {
            return std::future::pending().await;
        };
        time::sleep_until(deadline).await;
        self.deadline = None;
    }
}
