//! executor.rs
//! Network-processing thread of a bound session.
//!
//! Receives raw controller state reports, decodes them, and hands the resulting
//! position updates to the UI loop over a bounded channel. It never touches session
//! state itself. Shutdown is a hard join: once [`NetworkExecutor::shutdown`] returns,
//! no feedback callback can run.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, error, info, warn};

use crate::error::{PanelError, PanelResult};
use crate::session::feedback::{FeedbackIngester, PositionUpdate};
use crate::session::transport::ControllerStateMsg;
use crate::utils::metrics::PanelStats;

// Upper bound on how long shutdown waits for the loop to notice the stop flag
const RECV_POLL: Duration = Duration::from_millis(20);

pub struct NetworkExecutor {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

// Keeps `live_executors` honest even if the thread body panics.
struct LiveGuard(Arc<PanelStats>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.executor_stopped();
    }
}

impl NetworkExecutor {
    pub fn spawn(
        name: &str,
        rx: Receiver<ControllerStateMsg>,
        handoff: Sender<PositionUpdate>,
        stats: Arc<PanelStats>,
    ) -> PanelResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        stats.executor_started();
        let guard = LiveGuard(stats.clone());

        let handle = thread::Builder::new()
            .name(format!("executor-{}", name))
            .spawn(move || {
                let _guard = guard;
                run_loop(&rx, &handoff, &flag, &stats);
            })
            .map_err(|e| PanelError::Transport(format!("failed to spawn executor: {}", e)))?;

        info!("[Executor] Started for '{}'", name);
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops the loop and joins the thread. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => debug!("[Executor] Joined"),
                Err(_) => error!("[Executor] Thread panicked before join"),
            }
        }
    }
}

impl Drop for NetworkExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(
    rx: &Receiver<ControllerStateMsg>,
    handoff: &Sender<PositionUpdate>,
    running: &AtomicBool,
    stats: &PanelStats,
) {
    while running.load(Ordering::Acquire) {
        let msg = match rx.recv_timeout(RECV_POLL) {
            Ok(msg) => msg,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("[Executor] Subscription closed");
                break;
            }
        };

        stats.record_feedback_received();
        match FeedbackIngester::decode(&msg) {
            Ok(update) => match handoff.try_send(update) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => stats.record_feedback_dropped(),
                Err(TrySendError::Disconnected(_)) => {
                    debug!("[Executor] Feedback wiring disconnected");
                }
            },
            Err(e) => {
                stats.record_feedback_rejected();
                warn!("[Executor] Discarding state report: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::bounded;

    #[test]
    fn forwards_decoded_updates_and_rejects_malformed() {
        let stats = Arc::new(PanelStats::default());
        let (tx_state, rx_state) = bounded(8);
        let (tx_update, rx_update) = bounded(8);

        let mut exec = NetworkExecutor::spawn("test", rx_state, tx_update, stats.clone()).unwrap();
        assert_eq!(stats.snapshot().live_executors, 1);

        tx_state
            .send(ControllerStateMsg { joint_names: vec!["j1".into()], positions: vec![] })
            .unwrap();
        tx_state
            .send(ControllerStateMsg { joint_names: vec!["j1".into()], positions: vec![0.25] })
            .unwrap();

        let update = rx_update.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(update.positions["j1"], 0.25);

        exec.shutdown();
        exec.shutdown();
        assert!(!exec.is_running());

        let snap = stats.snapshot();
        assert_eq!(snap.live_executors, 0);
        assert_eq!(snap.feedback_received, 2);
        assert_eq!(snap.feedback_rejected, 1);
    }

    #[test]
    fn exits_when_subscription_closes() {
        let stats = Arc::new(PanelStats::default());
        let (tx_state, rx_state) = bounded::<ControllerStateMsg>(1);
        let (tx_update, _rx_update) = bounded(1);

        let mut exec = NetworkExecutor::spawn("closing", rx_state, tx_update, stats.clone()).unwrap();
        drop(tx_state);
        exec.shutdown();
        assert_eq!(stats.snapshot().live_executors, 0);
    }
}
