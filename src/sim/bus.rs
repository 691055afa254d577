//! bus.rs
//! In-memory transport. Keeps a registry of live subscriptions and publishers so
//! teardown leaks show up as non-zero counts.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use log::debug;
use parking_lot::Mutex;

use crate::error::{PanelError, PanelResult};
use crate::session::transport::{
    ControllerStateMsg, JointTrajectory, PublisherId, StateSubscription, SubscriptionId, Transport,
};

// Depth of each subscriber queue, like a keep-last QoS of a few messages
const SUBSCRIPTION_DEPTH: usize = 16;

#[derive(Default)]
struct BusInner {
    subscriptions: HashMap<u64, (String, Sender<ControllerStateMsg>)>,
    publishers: HashMap<u64, String>,
    command_taps: HashMap<String, Vec<Sender<JointTrajectory>>>,
}

#[derive(Default)]
pub struct LoopbackBus {
    inner: Mutex<BusInner>,
    next_id: AtomicU64,
    reject_advertise: AtomicBool,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a state report to every subscriber of `topic`; returns how many
    /// subscribers accepted it. Full subscriber queues drop the report.
    pub fn deliver_state(&self, topic: &str, msg: ControllerStateMsg) -> usize {
        let inner = self.inner.lock();
        let mut delivered = 0;
        for (sub_topic, tx) in inner.subscriptions.values() {
            if sub_topic != topic {
                continue;
            }
            match tx.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => debug!("[Bus] Subscriber queue full on {}", topic),
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
        delivered
    }

    /// Receives every command later published on `topic`.
    pub fn tap_commands(&self, topic: &str) -> Receiver<JointTrajectory> {
        let (tx, rx) = unbounded();
        self.inner
            .lock()
            .command_taps
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Makes `advertise_command` fail, to exercise partial binds.
    pub fn set_reject_advertise(&self, reject: bool) {
        self.reject_advertise.store(reject, Ordering::Release);
    }

    pub fn live_subscriptions(&self) -> usize {
        self.inner.lock().subscriptions.len()
    }

    pub fn live_publishers(&self) -> usize {
        self.inner.lock().publishers.len()
    }

    pub fn subscribed_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .inner
            .lock()
            .subscriptions
            .values()
            .map(|(t, _)| t.clone())
            .collect();
        topics.sort();
        topics
    }

    pub fn advertised_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.inner.lock().publishers.values().cloned().collect();
        topics.sort();
        topics
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Transport for LoopbackBus {
    fn subscribe_state(&self, topic: &str) -> PanelResult<StateSubscription> {
        let id = self.next_id();
        let (tx, rx) = bounded(SUBSCRIPTION_DEPTH);
        self.inner
            .lock()
            .subscriptions
            .insert(id, (topic.to_string(), tx));
        Ok(StateSubscription {
            id: SubscriptionId(id),
            topic: topic.to_string(),
            rx,
        })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.lock().subscriptions.remove(&id.0);
    }

    fn advertise_command(&self, topic: &str) -> PanelResult<PublisherId> {
        if self.reject_advertise.load(Ordering::Acquire) {
            return Err(PanelError::Transport(format!("cannot advertise {}", topic)));
        }
        let id = self.next_id();
        self.inner.lock().publishers.insert(id, topic.to_string());
        Ok(PublisherId(id))
    }

    fn publish(&self, id: PublisherId, msg: JointTrajectory) -> PanelResult<()> {
        let mut inner = self.inner.lock();
        let topic = inner
            .publishers
            .get(&id.0)
            .cloned()
            .ok_or_else(|| PanelError::Transport(format!("publisher {} does not exist", id.0)))?;

        if let Some(taps) = inner.command_taps.get_mut(&topic) {
            taps.retain(|tx| tx.send(msg.clone()).is_ok());
        }
        Ok(())
    }

    fn destroy_publisher(&self, id: PublisherId) {
        self.inner.lock().publishers.remove(&id.0);
    }
}
