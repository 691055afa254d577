//! poller.rs
//! Controller manager and controller discovery.
//!
//! Two polls, both driven by the panel's discovery timer:
//! - controller managers: replaces the candidate namespace list
//! - controllers of the selected manager: type/state filtered, then limited to
//!   controllers whose joints all have limits
//!
//! A failed listing keeps the previous result and is retried next tick.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::PanelConfig;
use crate::discovery::{
    limits::JointLimitCache,
    lister::{ControllerInfo, ControllerLister, ControllerManagerLister, filter_by_state, filter_by_type},
    namespace::joint_names,
};
use crate::utils::metrics::PanelStats;

pub struct ControllerDiscovery {
    cm_lister: Box<dyn ControllerManagerLister>,
    controller_lister: Box<dyn ControllerLister>,
    type_marker: String,
    required_state: String,
    controller_managers: Vec<String>,
    selected_cm: Option<String>,
    // Running controllers of the selected manager, as of the last successful poll
    running: Vec<ControllerInfo>,
    controllers: Vec<String>,
    stats: Arc<PanelStats>,
}

impl ControllerDiscovery {
    pub fn new(
        config: &PanelConfig,
        cm_lister: Box<dyn ControllerManagerLister>,
        controller_lister: Box<dyn ControllerLister>,
        stats: Arc<PanelStats>,
    ) -> Self {
        Self {
            cm_lister,
            controller_lister,
            type_marker: config.controller_type_marker.clone(),
            required_state: config.required_controller_state.clone(),
            controller_managers: Vec::new(),
            selected_cm: None,
            running: Vec::new(),
            controllers: Vec::new(),
            stats,
        }
    }

    /// Refreshes the controller manager candidates.
    pub fn poll_controller_managers(&mut self) -> &[String] {
        match self.cm_lister.list_controller_managers() {
            Ok(mut managers) => {
                managers.sort();
                managers.dedup();
                if managers != self.controller_managers {
                    debug!("[Discovery] Controller managers: {:?}", managers);
                }
                self.controller_managers = managers;
            }
            Err(e) => {
                self.stats.record_discovery_failure();
                warn!("[Discovery] Controller manager listing failed: {}", e);
            }
        }
        &self.controller_managers
    }

    /// Switches the manager whose controllers are polled. Forgets every
    /// controller of the previous manager, since managers may reuse names.
    pub fn select_controller_manager(&mut self, cm_ns: Option<&str>) {
        self.selected_cm = cm_ns.filter(|ns| !ns.is_empty()).map(str::to_string);
        self.running.clear();
        self.controllers.clear();
        if let Some(ns) = &self.selected_cm {
            info!("[Discovery] Watching controller manager '{}'", ns);
        }
    }

    /// Refreshes the running controllers of the selected manager and primes the
    /// limit cache on first sight of any. Returns the selectable controller names.
    pub fn poll_controllers(&mut self, limits: &mut JointLimitCache) -> &[String] {
        let Some(cm_ns) = self.selected_cm.as_deref() else {
            self.running.clear();
            self.controllers.clear();
            return &self.controllers;
        };

        let listed = match self.controller_lister.list_controllers(cm_ns) {
            Ok(listed) => listed,
            Err(e) => {
                self.stats.record_discovery_failure();
                warn!("[Discovery] Controller listing for '{}' failed: {}", cm_ns, e);
                return &self.controllers;
            }
        };

        let by_type = filter_by_type(&listed, &self.type_marker);
        self.running = filter_by_state(by_type, &self.required_state)
            .into_iter()
            .cloned()
            .collect();

        if !self.running.is_empty() && !limits.is_populated() {
            let mut all_joints: Vec<String> = Vec::new();
            for info in &self.running {
                for joint in joint_names(info) {
                    if !all_joints.contains(&joint) {
                        all_joints.push(joint);
                    }
                }
            }
            limits.get_or_fetch(&all_joints);
        }

        let mut valid: Vec<String> = self
            .running
            .iter()
            .filter(|info| !limits.is_populated() || limits.covers(&joint_names(info)))
            .map(|info| info.name.clone())
            .collect();
        valid.sort();

        if valid != self.controllers {
            debug!("[Discovery] Controllers of '{}': {:?}", cm_ns, valid);
        }
        self.controllers = valid;
        &self.controllers
    }

    pub fn controller_managers(&self) -> &[String] {
        &self.controller_managers
    }

    pub fn controllers(&self) -> &[String] {
        &self.controllers
    }

    pub fn selected_controller_manager(&self) -> Option<&str> {
        self.selected_cm.as_deref()
    }

    /// Latest type/state-filtered snapshot of the selected manager.
    pub fn running_snapshot(&self) -> &[ControllerInfo] {
        &self.running
    }
}
