//! ticker.rs
//! Periodic timer for the single-threaded UI loop.
//!
//! Nothing runs on its own: the loop calls [`Ticker::poll`] with the current time
//! and fires the callback when it returns true. A late poll fires once and
//! reschedules from `now`, so a stalled loop never produces a burst of catch-up ticks.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next_due: Option<Instant>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self { period, next_due: None }
    }

    /// Starts (or restarts) the timer; the first tick is one period from `now`.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.period);
    }

    /// Starts the timer so that it fires on the next poll.
    pub fn start_immediately(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns true if the timer is due and schedules the next tick.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let next = due + self.period;
                self.next_due = Some(if next > now { next } else { now + self.period });
                true
            }
            _ => false,
        }
    }
}
