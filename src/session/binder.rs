//! binder.rs
//! Binding to a selected controller: feedback subscription, command publisher,
//! network executor, and the per-joint runtime table they feed.
//!
//! A [`Session`] owns every resource it creates and releases them in
//! [`Session::teardown`] (also run on drop): hand-off wiring first, then the
//! subscription and publisher, then a hard join of the executor.

use std::{collections::HashMap, sync::Arc};

use crossbeam::channel::{Receiver, bounded};
use log::{debug, info, warn};

use crate::discovery::{
    limits::{JointLimitCache, JointLimits},
    lister::ControllerInfo,
    namespace::{joint_names, resolve},
};
use crate::error::{PanelError, PanelResult};
use crate::session::{
    executor::NetworkExecutor,
    feedback::{FeedbackIngester, JointRuntimeState, PositionUpdate},
    transport::{JointTrajectory, PublisherId, SubscriptionId, Transport, command_topic, state_topic},
};
use crate::utils::metrics::PanelStats;

/// Explicit per-joint editor handle, kept in the session's joint order.
#[derive(Debug, Clone, PartialEq)]
pub struct JointEditor {
    pub name: String,
    pub min: f64,
    pub max: f64,
    /// Displayed value; feedback in monitor mode, user target in control mode.
    pub value: Option<f64>,
    /// Accepts user input; true only while the panel is in control mode.
    pub enabled: bool,
}

pub struct Session {
    cm_ns: String,
    controller_name: String,
    controller_ns: String,
    joints: Vec<String>,
    runtime: HashMap<String, JointRuntimeState>,
    editors: Vec<JointEditor>,
    limits: HashMap<String, JointLimits>,
    transport: Arc<dyn Transport>,
    stats: Arc<PanelStats>,
    subscription: Option<SubscriptionId>,
    publisher: Option<PublisherId>,
    executor: Option<NetworkExecutor>,
    feedback_rx: Option<Receiver<PositionUpdate>>,
    reported_unknown: bool,
}

impl Session {
    pub fn cm_ns(&self) -> &str {
        &self.cm_ns
    }

    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }

    pub fn controller_ns(&self) -> &str {
        &self.controller_ns
    }

    pub fn joints(&self) -> &[String] {
        &self.joints
    }

    pub fn runtime(&self) -> &HashMap<String, JointRuntimeState> {
        &self.runtime
    }

    pub fn editors(&self) -> &[JointEditor] {
        &self.editors
    }

    pub fn limits(&self) -> &HashMap<String, JointLimits> {
        &self.limits
    }

    /// True while subscription, publisher and executor are all alive.
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
            && self.publisher.is_some()
            && self.executor.as_ref().is_some_and(NetworkExecutor::is_running)
    }

    /// Ok when every joint has an editor, i.e. usable limits.
    pub fn limits_complete(&self) -> PanelResult<()> {
        let missing: Vec<String> = self
            .joints
            .iter()
            .filter(|j| !self.limits.contains_key(*j))
            .cloned()
            .collect();
        if missing.is_empty() && self.editors.len() == self.joints.len() {
            Ok(())
        } else {
            Err(PanelError::IncompleteJointLimits { missing })
        }
    }

    /// Retries editor construction for a degraded session once the cache has limits.
    pub fn refresh_limits(&mut self, cache: &JointLimitCache) -> PanelResult<()> {
        if self.limits_complete().is_ok() {
            return Ok(());
        }
        let (editors, limits) = build_editors(&self.joints, cache)?;
        info!("[Binder] Limits resolved for '{}'", self.controller_name);
        self.editors = editors;
        self.limits = limits;
        Ok(())
    }

    /// Applies every pending feedback update. Runs on the UI loop only.
    pub fn drain_feedback(&mut self) -> usize {
        let Some(rx) = &self.feedback_rx else {
            return 0;
        };

        let mut applied = 0;
        while let Ok(update) = rx.try_recv() {
            if let Err(e) = FeedbackIngester::apply(&update, &mut self.runtime) {
                self.stats.record_unknown_joint_update();
                if !self.reported_unknown {
                    warn!("[Binder] {} ('{}')", e, self.controller_name);
                    self.reported_unknown = true;
                } else {
                    debug!("[Binder] {}", e);
                }
            }
            applied += 1;
        }
        applied
    }

    /// Copies known positions into the editors (monitor mode refresh).
    pub fn refresh_editors(&mut self) {
        for editor in &mut self.editors {
            if let Some(position) = self.runtime.get(&editor.name).and_then(|s| s.position) {
                editor.value = Some(position);
            }
        }
    }

    /// Mirrors the panel mode onto every editor.
    pub fn set_editors_enabled(&mut self, enabled: bool) {
        for editor in &mut self.editors {
            editor.enabled = enabled;
        }
    }

    /// Sets a joint target, clamped to the joint's position limits. Returns the
    /// value actually stored.
    pub fn set_command(&mut self, joint: &str, value: f64) -> PanelResult<f64> {
        if !value.is_finite() {
            return Err(PanelError::InvalidTarget { joint: joint.to_string(), value });
        }
        let editor = self
            .editors
            .iter_mut()
            .find(|e| e.name == joint)
            .ok_or_else(|| {
                if self.joints.iter().any(|j| j == joint) {
                    PanelError::IncompleteJointLimits { missing: vec![joint.to_string()] }
                } else {
                    PanelError::UnknownJoint(joint.to_string())
                }
            })?;

        let clamped = value.clamp(editor.min, editor.max);
        editor.value = Some(clamped);
        if let Some(state) = self.runtime.get_mut(joint) {
            state.command = Some(clamped);
        }
        Ok(clamped)
    }

    /// Forgets all user targets so every joint holds its current position.
    pub fn clear_commands(&mut self) {
        for state in self.runtime.values_mut() {
            state.command = None;
        }
    }

    pub fn publish(&self, msg: JointTrajectory) -> PanelResult<()> {
        let id = self
            .publisher
            .ok_or_else(|| PanelError::Transport("command publisher destroyed".to_string()))?;
        self.transport.publish(id, msg)?;
        self.stats.record_command_published();
        Ok(())
    }

    /// Releases every resource; each step is guarded so partial sessions and
    /// repeated calls are fine.
    pub fn teardown(&mut self) {
        // Disconnect the hand-off first so nothing more reaches the runtime table.
        self.feedback_rx = None;

        if let Some(id) = self.subscription.take() {
            self.transport.unsubscribe(id);
        }
        if let Some(id) = self.publisher.take() {
            self.transport.destroy_publisher(id);
        }
        if let Some(mut executor) = self.executor.take() {
            executor.shutdown();
        }

        if !self.runtime.is_empty() || !self.editors.is_empty() {
            debug!("[Binder] Released '{}'", self.controller_name);
        }
        self.runtime.clear();
        self.editors.clear();
        self.joints.clear();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

pub struct SessionBinder {
    transport: Arc<dyn Transport>,
    stats: Arc<PanelStats>,
    feedback_capacity: usize,
}

impl SessionBinder {
    pub fn new(transport: Arc<dyn Transport>, stats: Arc<PanelStats>, feedback_capacity: usize) -> Self {
        Self {
            transport,
            stats,
            feedback_capacity,
        }
    }

    /// Binds to `controller_name` of the manager at `cm_ns`. Missing limits
    /// degrade the session (no control mode) instead of failing the bind.
    pub fn bind(
        &self,
        cm_ns: &str,
        controller_name: &str,
        snapshot: &[ControllerInfo],
        cache: &JointLimitCache,
    ) -> PanelResult<Session> {
        let info = snapshot
            .iter()
            .find(|c| c.name == controller_name)
            .ok_or_else(|| PanelError::NoSuchController(controller_name.to_string()))?;

        let joints = joint_names(info);
        let runtime = joints
            .iter()
            .map(|j| (j.clone(), JointRuntimeState::default()))
            .collect();

        let (editors, limits) = match build_editors(&joints, cache) {
            Ok(built) => built,
            Err(e) => {
                warn!("[Binder] '{}' bound without control: {}", controller_name, e);
                (Vec::new(), HashMap::new())
            }
        };

        let controller_ns = resolve(cm_ns, controller_name);
        let mut session = Session {
            cm_ns: cm_ns.to_string(),
            controller_name: controller_name.to_string(),
            controller_ns,
            joints,
            runtime,
            editors,
            limits,
            transport: self.transport.clone(),
            stats: self.stats.clone(),
            subscription: None,
            publisher: None,
            executor: None,
            feedback_rx: None,
            reported_unknown: false,
        };

        // On failure `session` drops here and releases whatever was attached.
        self.attach(&mut session)?;

        info!(
            "[Binder] Bound '{}' at {} ({} joints)",
            session.controller_name,
            session.controller_ns,
            session.joints.len()
        );
        Ok(session)
    }

    fn attach(&self, session: &mut Session) -> PanelResult<()> {
        let sub = self.transport.subscribe_state(&state_topic(&session.controller_ns))?;
        session.subscription = Some(sub.id);

        let publisher = self.transport.advertise_command(&command_topic(&session.controller_ns))?;
        session.publisher = Some(publisher);

        let (handoff_tx, handoff_rx) = bounded(self.feedback_capacity);
        session.feedback_rx = Some(handoff_rx);
        session.executor = Some(NetworkExecutor::spawn(
            &session.controller_name,
            sub.rx,
            handoff_tx,
            self.stats.clone(),
        )?);
        Ok(())
    }

    pub fn unbind(&self, session: &mut Session) {
        session.teardown();
        info!("[Binder] Unbound '{}'", session.controller_name);
    }
}

fn build_editors(
    joints: &[String],
    cache: &JointLimitCache,
) -> PanelResult<(Vec<JointEditor>, HashMap<String, JointLimits>)> {
    let mut editors = Vec::with_capacity(joints.len());
    let mut limits = HashMap::with_capacity(joints.len());
    let mut missing = Vec::new();

    for name in joints {
        match cache.get(name) {
            Some(l) if l.max_velocity > 0.0 && l.min_position <= l.max_position => {
                editors.push(JointEditor {
                    name: name.clone(),
                    min: l.min_position,
                    max: l.max_position,
                    value: None,
                    enabled: false,
                });
                limits.insert(name.clone(), *l);
            }
            _ => missing.push(name.clone()),
        }
    }

    if missing.is_empty() {
        Ok((editors, limits))
    } else {
        Err(PanelError::IncompleteJointLimits { missing })
    }
}
