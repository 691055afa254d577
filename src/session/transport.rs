//! transport.rs
//! Message records and the publish/subscribe seam a session binds through.
//!
//! The transport hands each subscription a crossbeam receiver; the session's
//! executor thread owns that receiver. Destroying the subscription drops the
//! transport's sender, which disconnects the receiver.

use std::time::Duration;

use crossbeam::channel::Receiver;

use crate::error::PanelResult;

/// State report of a trajectory controller (parallel name/position arrays).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerStateMsg {
    pub joint_names: Vec<String>,
    pub positions: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    pub positions: Vec<f64>,
    pub time_from_start: Duration,
}

/// Trajectory command; the panel always sends exactly one point.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTrajectory {
    pub joint_names: Vec<String>,
    pub points: Vec<TrajectoryPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublisherId(pub u64);

pub struct StateSubscription {
    pub id: SubscriptionId,
    pub topic: String,
    pub rx: Receiver<ControllerStateMsg>,
}

pub trait Transport: Send + Sync {
    fn subscribe_state(&self, topic: &str) -> PanelResult<StateSubscription>;

    /// Destroys a subscription; unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    fn advertise_command(&self, topic: &str) -> PanelResult<PublisherId>;

    fn publish(&self, id: PublisherId, msg: JointTrajectory) -> PanelResult<()>;

    /// Destroys a publisher; unknown ids are ignored.
    fn destroy_publisher(&self, id: PublisherId);
}

pub const STATE_TOPIC_SUFFIX: &str = "/controller_state";
pub const COMMAND_TOPIC_SUFFIX: &str = "/joint_trajectory";

pub fn state_topic(controller_ns: &str) -> String {
    format!("{}{}", controller_ns, STATE_TOPIC_SUFFIX)
}

pub fn command_topic(controller_ns: &str) -> String {
    format!("{}{}", controller_ns, COMMAND_TOPIC_SUFFIX)
}
