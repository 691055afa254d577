//! cell.rs
//! Simulated robot cell: controller managers, their controllers, and a joint
//! limits table. Implements every discovery-side service so the panel can run
//! without a live robot.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::discovery::{
    limits::{JointLimits, JointLimitsSource},
    lister::{ControllerInfo, ControllerLister, ControllerManagerLister, ControllerState},
};
use crate::error::{PanelError, PanelResult};

#[derive(Default)]
struct CellState {
    managers: BTreeMap<String, Vec<ControllerInfo>>,
    limits: HashMap<String, JointLimits>,
    offline: bool,
    limit_fetches: usize,
}

/// Cheap to clone; clones share the same cell.
#[derive(Clone, Default)]
pub struct SimulatedCell {
    state: Arc<Mutex<CellState>>,
}

/// An active joint trajectory controller claiming position and velocity
/// interfaces of `joints`.
pub fn trajectory_controller(name: &str, joints: &[&str]) -> ControllerInfo {
    ControllerInfo {
        name: name.to_string(),
        controller_type: "joint_trajectory_controller/JointTrajectoryController".to_string(),
        state: ControllerState::Active,
        required_state_interfaces: joints
            .iter()
            .flat_map(|j| [format!("{}/position", j), format!("{}/velocity", j)])
            .collect(),
    }
}

impl SimulatedCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_controller_manager(&self, cm_ns: &str) {
        self.state.lock().managers.entry(cm_ns.to_string()).or_default();
    }

    pub fn remove_controller_manager(&self, cm_ns: &str) {
        self.state.lock().managers.remove(cm_ns);
    }

    /// Adds or replaces a controller of `cm_ns`.
    pub fn add_controller(&self, cm_ns: &str, info: ControllerInfo) {
        let mut state = self.state.lock();
        let controllers = state.managers.entry(cm_ns.to_string()).or_default();
        controllers.retain(|c| c.name != info.name);
        controllers.push(info);
    }

    pub fn set_controller_state(&self, cm_ns: &str, name: &str, controller_state: ControllerState) {
        let mut state = self.state.lock();
        if let Some(c) = state
            .managers
            .get_mut(cm_ns)
            .and_then(|cs| cs.iter_mut().find(|c| c.name == name))
        {
            c.state = controller_state;
        }
    }

    pub fn set_joint_limits(&self, joint: &str, limits: JointLimits) {
        self.state.lock().limits.insert(joint.to_string(), limits);
    }

    /// While offline every listing call fails.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    pub fn limit_fetches(&self) -> usize {
        self.state.lock().limit_fetches
    }
}

impl ControllerManagerLister for SimulatedCell {
    fn list_controller_managers(&self) -> PanelResult<Vec<String>> {
        let state = self.state.lock();
        if state.offline {
            return Err(PanelError::DiscoveryUnavailable("cell offline".to_string()));
        }
        Ok(state.managers.keys().cloned().collect())
    }
}

impl ControllerLister for SimulatedCell {
    fn list_controllers(&self, cm_ns: &str) -> PanelResult<Vec<ControllerInfo>> {
        let state = self.state.lock();
        if state.offline {
            return Err(PanelError::DiscoveryUnavailable("cell offline".to_string()));
        }
        state
            .managers
            .get(cm_ns)
            .cloned()
            .ok_or_else(|| PanelError::DiscoveryUnavailable(format!("no controller manager at {}", cm_ns)))
    }
}

impl JointLimitsSource for SimulatedCell {
    fn fetch(&self, joint_names: &[String]) -> PanelResult<HashMap<String, JointLimits>> {
        let mut state = self.state.lock();
        state.limit_fetches += 1;
        Ok(joint_names
            .iter()
            .filter_map(|j| state.limits.get(j).map(|l| (j.clone(), *l)))
            .collect())
    }
}
