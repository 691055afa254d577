//! panel.rs
//! UI-loop orchestrator: discovery timers, controller selection, mode switching,
//! command publication, and persisted selection.
//!
//! Everything here runs on one thread. The owner calls [`Panel::tick`] regularly;
//! the only other thread involved is the session's executor, which reaches the
//! panel exclusively through the feedback hand-off drained in `tick`.

use std::{sync::Arc, time::Instant};

use log::{debug, info, warn};

use crate::config::PanelConfig;
use crate::discovery::{
    limits::{JointLimitCache, JointLimitsSource},
    lister::{ControllerLister, ControllerManagerLister},
    poller::ControllerDiscovery,
};
use crate::error::{PanelError, PanelResult};
use crate::session::{
    binder::{JointEditor, Session, SessionBinder},
    command::CommandSynthesizer,
    mode::{Mode, ModeController},
    transport::Transport,
};
use crate::utils::{metrics::PanelStats, settings::PanelSettings, ticker::Ticker};

pub struct Panel {
    config: PanelConfig,
    discovery: ControllerDiscovery,
    limits: JointLimitCache,
    binder: SessionBinder,
    session: Option<Session>,
    mode: ModeController,
    synthesizer: CommandSynthesizer,
    speed_scaling_percent: f64,
    cm_timer: Ticker,
    controller_timer: Ticker,
    stats: Arc<PanelStats>,
}

impl Panel {
    pub fn new(
        config: PanelConfig,
        cm_lister: Box<dyn ControllerManagerLister>,
        controller_lister: Box<dyn ControllerLister>,
        limits_source: Box<dyn JointLimitsSource>,
        transport: Arc<dyn Transport>,
    ) -> PanelResult<Self> {
        config.validate()?;
        let stats = Arc::new(PanelStats::default());

        Ok(Self {
            discovery: ControllerDiscovery::new(&config, cm_lister, controller_lister, stats.clone()),
            limits: JointLimitCache::new(limits_source),
            binder: SessionBinder::new(transport, stats.clone(), config.feedback_queue_capacity),
            session: None,
            mode: ModeController::new(&config),
            synthesizer: CommandSynthesizer::new(config.min_trajectory_duration()),
            speed_scaling_percent: config.speed_scaling_default_percent.clamp(
                config.speed_scaling_min_percent,
                config.speed_scaling_max_percent,
            ),
            cm_timer: Ticker::new(config.discovery_period()),
            controller_timer: Ticker::new(config.discovery_period()),
            stats,
            config,
        })
    }

    /// Starts the discovery timers; the first polls run on the next tick.
    pub fn start(&mut self, now: Instant) {
        self.cm_timer.start_immediately(now);
        self.controller_timer.start_immediately(now);
        info!("[Panel] Started");
    }

    /// Runs every timer that is due. Called repeatedly from the UI loop.
    pub fn tick(&mut self, now: Instant) {
        if self.cm_timer.poll(now) {
            self.refresh_controller_managers();
        }
        if self.controller_timer.poll(now) {
            self.refresh_controllers();
        }

        if let Some(session) = self.session.as_mut() {
            session.drain_feedback();
        }

        if self.mode.refresh_due(now) {
            if let Some(session) = self.session.as_mut() {
                session.refresh_editors();
            }
        }
        if self.mode.command_due(now) {
            self.publish_command();
        }
    }

    fn refresh_controller_managers(&mut self) {
        self.discovery.poll_controller_managers();
        let lost = self
            .discovery
            .selected_controller_manager()
            .filter(|ns| !self.discovery.controller_managers().iter().any(|m| m == ns))
            .map(str::to_string);

        if let Some(ns) = lost {
            info!("[Panel] Controller manager '{}' disappeared", ns);
            self.unload_controller();
            self.discovery.select_controller_manager(None);
        }
    }

    fn refresh_controllers(&mut self) {
        let controllers = self.discovery.poll_controllers(&mut self.limits);
        let lost = self
            .session
            .as_ref()
            .map(|s| s.controller_name())
            .filter(|name| !controllers.iter().any(|c| c == name))
            .map(str::to_string);

        if let Some(name) = lost {
            info!("[Panel] Controller '{}' is no longer available", name);
            self.unload_controller();
            return;
        }

        // A session bound before the cache was primed picks up its limits here.
        if let Some(session) = self.session.as_mut() {
            if self.limits.is_populated() && session.limits_complete().is_err() {
                match session.refresh_limits(&self.limits) {
                    Ok(()) => session.set_editors_enabled(self.mode.editors_enabled()),
                    Err(e) => debug!("[Panel] '{}' still degraded: {}", session.controller_name(), e),
                }
            }
        }
    }

    /// Selects the controller manager to watch. Any bound controller is released,
    /// since managers may host different controllers under the same name.
    pub fn select_controller_manager(&mut self, cm_ns: Option<&str>) -> PanelResult<()> {
        let cm_ns = cm_ns.filter(|ns| !ns.is_empty());
        if cm_ns == self.discovery.selected_controller_manager() {
            return Ok(());
        }
        if let Some(ns) = cm_ns {
            if !self.discovery.controller_managers().iter().any(|m| m == ns) {
                return Err(PanelError::DiscoveryUnavailable(format!(
                    "controller manager '{}' not discovered",
                    ns
                )));
            }
        }

        self.unload_controller();
        self.discovery.select_controller_manager(cm_ns);
        self.refresh_controllers();
        Ok(())
    }

    /// Binds to `name`, or just unbinds for `None`. A name missing from the
    /// latest discovery is refused and the current binding is kept.
    pub fn select_controller(&mut self, now: Instant, name: Option<&str>) -> PanelResult<()> {
        let Some(name) = name.filter(|n| !n.is_empty()) else {
            self.unload_controller();
            return Ok(());
        };

        let Some(cm_ns) = self.discovery.selected_controller_manager().map(str::to_string) else {
            return Err(PanelError::NoSuchController(name.to_string()));
        };
        if !self.discovery.running_snapshot().iter().any(|c| c.name == name) {
            return Err(PanelError::NoSuchController(name.to_string()));
        }

        self.unload_controller();
        let session = self
            .binder
            .bind(&cm_ns, name, self.discovery.running_snapshot(), &self.limits)?;
        self.session = Some(session);
        self.mode.on_bind(now);
        Ok(())
    }

    fn unload_controller(&mut self) {
        if let Some(mut session) = self.session.take() {
            self.binder.unbind(&mut session);
        }
        self.mode.on_unbind();
    }

    /// Toggles control mode. Enabling is refused without a controller or with
    /// incomplete joint limits; the panel then stays in monitor mode.
    pub fn set_control_enabled(&mut self, now: Instant, enabled: bool) -> PanelResult<()> {
        if !enabled {
            self.mode.release_control(now);
            self.sync_editors();
            return Ok(());
        }

        let readiness = match self.session.as_mut() {
            None => Err(PanelError::NoControllerSelected),
            Some(session) => session.refresh_limits(&self.limits),
        };

        let was_monitoring = self.mode.mode() == Mode::Monitor;
        if let Err(e) = self.mode.request_control(now, readiness) {
            warn!("[Panel] Control mode refused: {}", e);
            self.sync_editors();
            return Err(e);
        }
        self.sync_editors();

        // Fresh control session: hold current positions until the user edits a joint.
        if was_monitoring {
            if let Some(session) = self.session.as_mut() {
                session.clear_commands();
            }
        }
        Ok(())
    }

    fn sync_editors(&mut self) {
        let enabled = self.mode.editors_enabled();
        if let Some(session) = self.session.as_mut() {
            session.set_editors_enabled(enabled);
        }
    }

    /// Sets a joint target; returns the value after clamping to the joint limits.
    pub fn set_joint_command(&mut self, joint: &str, value: f64) -> PanelResult<f64> {
        let session = self.session.as_mut().ok_or(PanelError::NoControllerSelected)?;
        if !self.mode.editors_enabled() {
            return Err(PanelError::MonitorMode);
        }
        session.set_command(joint, value)
    }

    /// Sets the speed scaling percentage; returns the value after clamping.
    pub fn set_speed_scaling(&mut self, percent: f64) -> PanelResult<f64> {
        if !self.mode.editors_enabled() {
            return Err(PanelError::MonitorMode);
        }
        self.speed_scaling_percent = percent.clamp(
            self.config.speed_scaling_min_percent,
            self.config.speed_scaling_max_percent,
        );
        Ok(self.speed_scaling_percent)
    }

    /// Fraction of maximum speed, in `(0, 1]`.
    pub fn speed_scale(&self) -> f64 {
        self.speed_scaling_percent / self.config.speed_scaling_max_percent
    }

    fn publish_command(&mut self) {
        let speed_scale = self.speed_scale();
        let Some(session) = self.session.as_ref() else {
            return;
        };

        let traj = match self.synthesizer.synthesize(
            session.joints(),
            session.runtime(),
            session.limits(),
            speed_scale,
        ) {
            Ok(traj) => traj,
            Err(e @ PanelError::PositionUnknown(_)) => {
                self.stats.record_command_skipped();
                debug!("[Panel] Skipping command: {}", e);
                return;
            }
            Err(e) => {
                self.stats.record_command_skipped();
                warn!("[Panel] Skipping command: {}", e);
                return;
            }
        };

        if let Err(e) = session.publish(traj) {
            warn!("[Panel] Command publish failed: {}", e);
        }
    }

    pub fn save_settings(&self) -> PanelSettings {
        PanelSettings {
            cm_ns: self.discovery.selected_controller_manager().map(str::to_string),
            controller_name: self.session.as_ref().map(|s| s.controller_name().to_string()),
        }
    }

    /// Restores a saved selection if discovery still reports it; otherwise
    /// leaves the panel as it is.
    pub fn restore_settings(&mut self, now: Instant, settings: &PanelSettings) {
        self.refresh_controller_managers();
        let Some(cm_ns) = settings.cm_ns.as_deref() else {
            return;
        };
        if let Err(e) = self.select_controller_manager(Some(cm_ns)) {
            debug!("[Panel] Saved controller manager not restored: {}", e);
            return;
        }
        if let Some(name) = settings.controller_name.as_deref() {
            if let Err(e) = self.select_controller(now, Some(name)) {
                debug!("[Panel] Saved controller not restored: {}", e);
            }
        }
    }

    /// Stops every timer, releases the session and forgets cached limits.
    pub fn shutdown(&mut self) {
        self.cm_timer.stop();
        self.controller_timer.stop();
        self.unload_controller();
        self.limits.clear();
        info!("[Panel] Shut down");
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn controller_managers(&self) -> &[String] {
        self.discovery.controller_managers()
    }

    pub fn controllers(&self) -> &[String] {
        self.discovery.controllers()
    }

    pub fn selected_controller_manager(&self) -> Option<&str> {
        self.discovery.selected_controller_manager()
    }

    pub fn selected_controller(&self) -> Option<&str> {
        self.session.as_ref().map(Session::controller_name)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn mode_controller(&self) -> &ModeController {
        &self.mode
    }

    pub fn editors(&self) -> &[JointEditor] {
        self.session.as_ref().map(Session::editors).unwrap_or(&[])
    }

    pub fn editors_enabled(&self) -> bool {
        self.mode.editors_enabled()
    }

    pub fn speed_scaling_percent(&self) -> f64 {
        self.speed_scaling_percent
    }

    pub fn stats(&self) -> &Arc<PanelStats> {
        &self.stats
    }
}

impl Drop for Panel {
    fn drop(&mut self) {
        self.unload_controller();
    }
}
