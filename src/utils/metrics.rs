//! Panel counters shared between the UI loop and the network executor.
//!
//! Plain atomics: the executor thread increments feedback counters while the UI
//! loop increments everything else, so no lock is held on either path.
//! `live_executors` doubles as a leak check for session teardown.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct PanelStats {
    discovery_failures: AtomicU64,
    feedback_received: AtomicU64,
    feedback_rejected: AtomicU64,
    feedback_dropped: AtomicU64,
    unknown_joint_updates: AtomicU64,
    commands_published: AtomicU64,
    commands_skipped: AtomicU64,
    live_executors: AtomicUsize,
}

/// Point-in-time copy of [`PanelStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub discovery_failures: u64,
    pub feedback_received: u64,
    pub feedback_rejected: u64,
    pub feedback_dropped: u64,
    pub unknown_joint_updates: u64,
    pub commands_published: u64,
    pub commands_skipped: u64,
    pub live_executors: usize,
}

impl PanelStats {
    #[inline]
    pub fn record_discovery_failure(&self) {
        self.discovery_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_feedback_received(&self) {
        self.feedback_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_feedback_rejected(&self) {
        self.feedback_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Hand-off queue was full; update lost.
    #[inline]
    pub fn record_feedback_dropped(&self) {
        self.feedback_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unknown_joint_update(&self) {
        self.unknown_joint_updates.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_command_published(&self) {
        self.commands_published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_command_skipped(&self) {
        self.commands_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn executor_started(&self) {
        self.live_executors.fetch_add(1, Ordering::AcqRel);
    }

    pub fn executor_stopped(&self) {
        self.live_executors.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            discovery_failures: self.discovery_failures.load(Ordering::Relaxed),
            feedback_received: self.feedback_received.load(Ordering::Relaxed),
            feedback_rejected: self.feedback_rejected.load(Ordering::Relaxed),
            feedback_dropped: self.feedback_dropped.load(Ordering::Relaxed),
            unknown_joint_updates: self.unknown_joint_updates.load(Ordering::Relaxed),
            commands_published: self.commands_published.load(Ordering::Relaxed),
            commands_skipped: self.commands_skipped.load(Ordering::Relaxed),
            live_executors: self.live_executors.load(Ordering::Acquire),
        }
    }
}
