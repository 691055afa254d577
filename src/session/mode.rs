//! mode.rs
//! Monitor/control state machine.
//!
//! Two timers are gated by the mode: the editor refresh timer (feedback drives the
//! view) and the command timer (the view drives the controller). With a session
//! bound exactly one of them runs; with no session neither does.

use std::time::Instant;

use log::info;

use crate::config::PanelConfig;
use crate::error::PanelResult;
use crate::utils::ticker::Ticker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Editors follow controller feedback; nothing is sent.
    Monitor,
    /// Editors hold user targets; commands are published periodically.
    Control,
}

pub struct ModeController {
    mode: Mode,
    bound: bool,
    command_timer: Ticker,
    refresh_timer: Ticker,
}

impl ModeController {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            mode: Mode::Monitor,
            bound: false,
            command_timer: Ticker::new(config.command_period()),
            refresh_timer: Ticker::new(config.widget_refresh_period()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// A session was bound: start in monitor mode.
    pub fn on_bind(&mut self, now: Instant) {
        self.bound = true;
        self.enter_monitor(now);
    }

    /// The session was torn down: monitor mode, both timers stopped.
    pub fn on_unbind(&mut self) {
        self.bound = false;
        self.mode = Mode::Monitor;
        self.command_timer.stop();
        self.refresh_timer.stop();
    }

    /// Enters control mode if `readiness` allows it. On rejection the mode is
    /// left untouched and the reason is returned.
    pub fn request_control(&mut self, now: Instant, readiness: PanelResult<()>) -> PanelResult<()> {
        readiness?;
        debug_assert!(self.bound, "control readiness checked without a session");
        if self.mode != Mode::Control {
            info!("[Mode] Control mode: publishing commands");
        }
        self.mode = Mode::Control;
        self.refresh_timer.stop();
        self.command_timer.start(now);
        Ok(())
    }

    pub fn release_control(&mut self, now: Instant) {
        if !self.bound {
            return;
        }
        if self.mode == Mode::Control {
            info!("[Mode] Monitor mode: following feedback");
        }
        self.enter_monitor(now);
    }

    fn enter_monitor(&mut self, now: Instant) {
        self.mode = Mode::Monitor;
        self.command_timer.stop();
        self.refresh_timer.start(now);
    }

    pub fn command_due(&mut self, now: Instant) -> bool {
        self.command_timer.poll(now)
    }

    pub fn refresh_due(&mut self, now: Instant) -> bool {
        self.refresh_timer.poll(now)
    }

    pub fn is_publishing(&self) -> bool {
        self.command_timer.is_active()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_timer.is_active()
    }

    /// Editors (and the speed-scaling editor) accept input only in control mode.
    pub fn editors_enabled(&self) -> bool {
        self.mode == Mode::Control
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PanelError;

    fn invariant_holds(m: &ModeController) -> bool {
        if m.is_bound() {
            m.is_publishing() != m.is_refreshing()
        } else {
            !m.is_publishing() && !m.is_refreshing()
        }
    }

    #[test]
    fn starts_unbound_and_idle() {
        let m = ModeController::new(&PanelConfig::default());
        assert_eq!(m.mode(), Mode::Monitor);
        assert!(invariant_holds(&m));
    }

    #[test]
    fn rejected_request_keeps_monitor() {
        let now = Instant::now();
        let mut m = ModeController::new(&PanelConfig::default());
        m.on_bind(now);

        let res = m.request_control(now, Err(PanelError::IncompleteJointLimits { missing: vec!["j1".into()] }));
        assert!(res.is_err());
        assert_eq!(m.mode(), Mode::Monitor);
        assert!(m.is_refreshing());
        assert!(!m.editors_enabled());
    }

    #[test]
    fn invariant_survives_any_event_sequence() {
        #[derive(Clone, Copy)]
        enum Ev {
            Bind,
            Unbind,
            Enable,
            Reject,
            Disable,
        }
        let events = [Ev::Bind, Ev::Unbind, Ev::Enable, Ev::Reject, Ev::Disable];
        let now = Instant::now();

        // Every sequence of length 4 over the five events.
        for code in 0..events.len().pow(4) {
            let mut m = ModeController::new(&PanelConfig::default());
            let mut c = code;
            for _ in 0..4 {
                let ev = events[c % events.len()];
                c /= events.len();
                match ev {
                    Ev::Bind => m.on_bind(now),
                    Ev::Unbind => m.on_unbind(),
                    Ev::Enable => {
                        let readiness = if m.is_bound() { Ok(()) } else { Err(PanelError::NoControllerSelected) };
                        let _ = m.request_control(now, readiness);
                    }
                    Ev::Reject => {
                        let _ = m.request_control(now, Err(PanelError::NoControllerSelected));
                    }
                    Ev::Disable => m.release_control(now),
                }
                assert!(invariant_holds(&m));
                assert_eq!(m.editors_enabled(), m.is_publishing());
            }
        }
    }

    #[test]
    fn command_timer_runs_only_in_control() {
        let now = Instant::now();
        let config = PanelConfig::default();
        let mut m = ModeController::new(&config);
        m.on_bind(now);
        m.request_control(now, Ok(())).unwrap();

        let later = now + config.command_period();
        assert!(m.command_due(later));
        assert!(!m.refresh_due(later));

        m.release_control(later);
        assert!(!m.command_due(later + config.command_period()));
        assert!(m.refresh_due(later + config.widget_refresh_period()));
    }
}
