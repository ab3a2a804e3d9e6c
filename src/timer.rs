//! Timing code sections.
//!
//! A [`Timer`] accumulates time over any number of start/stop cycles:
//!
//! ```
//! use bsutils::timer::Timer;
//!
//! let mut t = Timer::new();
//! {
//!     let _guard = t.scope().unwrap();
//!     // ... timed work ...
//! }
//! t.start().unwrap();
//! t.stop().unwrap(); // adds to the same total
//! assert!(!t.running());
//! println!("{:?} total", t.elapsed());
//! ```

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

/// Errors from misuse of a [`Timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("timer already started")]
    AlreadyStarted,
    #[error("timer not started")]
    NotStarted,
}

/// Source of time readings for a [`Timer`].
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time from [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A stopwatch that adds up the time between each `start` and `stop`.
#[derive(Debug, Clone)]
pub struct Timer<C: Clock = MonotonicClock> {
    clock: C,
    elapsed: Duration,
    started_at: Option<Duration>,
}

impl Timer {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::default())
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Timer<C> {
    /// A stopped timer reading from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            elapsed: Duration::ZERO,
            started_at: None,
        }
    }

    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.started_at.is_some() {
            return Err(TimerError::AlreadyStarted);
        }
        self.started_at = Some(self.clock.now());
        Ok(())
    }

    /// Stop and add the time since `start` to the total.
    pub fn stop(&mut self) -> Result<(), TimerError> {
        let start = self.started_at.take().ok_or(TimerError::NotStarted)?;
        self.elapsed += self.clock.now().saturating_sub(start);
        Ok(())
    }

    /// Clear the accumulated total. A running timer keeps running.
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    pub fn running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Total over completed start/stop cycles.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Start the timer and return a guard that stops it when dropped.
    pub fn scope(&mut self) -> Result<TimerGuard<'_, C>, TimerError> {
        self.start()?;
        Ok(TimerGuard { timer: self })
    }
}

/// Stops its [`Timer`] on drop.
#[derive(Debug)]
pub struct TimerGuard<'a, C: Clock> {
    timer: &'a mut Timer<C>,
}

impl<C: Clock> Drop for TimerGuard<'_, C> {
    fn drop(&mut self) {
        // started in `scope`, so this cannot fail
        let _ = self.timer.stop();
    }
}

/// Run `f`, log how long it took under `name`, and return its result.
///
/// ```
/// let sum = bsutils::timer::timed("sum", || (1..=10).sum::<i32>());
/// assert_eq!(sum, 55);
/// ```
pub fn timed<R>(name: &str, f: impl FnOnce() -> R) -> R {
    let start = Instant::now();
    let result = f();
    let secs = start.elapsed().as_secs_f64();
    info!(task = name, secs, "{name} executed in {secs:.6} seconds");
    result
}
