//! config.rs
//! Panel timing and filtering knobs.
//!
//! Defaults match the stock panel: commands at 10 Hz, editor refresh at 30 Hz,
//! discovery at 1 Hz, and a minimum trajectory duration of five command periods.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{PanelError, PanelResult};

const DEFAULT_COMMAND_RATE_HZ: f64 = 10.0;
const DEFAULT_WIDGET_REFRESH_RATE_HZ: f64 = 30.0;
const DEFAULT_DISCOVERY_RATE_HZ: f64 = 1.0;
const MIN_DURATION_COMMAND_PERIODS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Command publication rate while in control mode.
    pub command_rate_hz: f64,
    /// Editor refresh rate while in monitor mode.
    pub widget_refresh_rate_hz: f64,
    /// Rate of both the controller-manager and the controller polls.
    pub discovery_rate_hz: f64,
    /// Substring a controller type must contain to be listed.
    pub controller_type_marker: String,
    /// Controller state a controller must report to be listed.
    pub required_controller_state: String,
    pub speed_scaling_min_percent: f64,
    pub speed_scaling_max_percent: f64,
    pub speed_scaling_default_percent: f64,
    /// Bounded hand-off between the network executor and the UI loop.
    pub feedback_queue_capacity: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            command_rate_hz: DEFAULT_COMMAND_RATE_HZ,
            widget_refresh_rate_hz: DEFAULT_WIDGET_REFRESH_RATE_HZ,
            discovery_rate_hz: DEFAULT_DISCOVERY_RATE_HZ,
            controller_type_marker: "JointTrajectoryController".to_string(),
            required_controller_state: "active".to_string(),
            speed_scaling_min_percent: 1.0,
            speed_scaling_max_percent: 100.0,
            speed_scaling_default_percent: 50.0,
            feedback_queue_capacity: 64,
        }
    }
}

impl PanelConfig {
    /// Loads a JSON config file; missing fields fall back to defaults.
    pub fn load(path: &Path) -> PanelResult<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PanelResult<()> {
        for (name, rate) in [
            ("command_rate_hz", self.command_rate_hz),
            ("widget_refresh_rate_hz", self.widget_refresh_rate_hz),
            ("discovery_rate_hz", self.discovery_rate_hz),
        ] {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(PanelError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, rate
                )));
            }
        }

        if !(self.speed_scaling_min_percent > 0.0
            && self.speed_scaling_min_percent <= self.speed_scaling_max_percent)
        {
            return Err(PanelError::InvalidConfig(format!(
                "speed scaling range [{}, {}] is invalid",
                self.speed_scaling_min_percent, self.speed_scaling_max_percent
            )));
        }

        if self.feedback_queue_capacity == 0 {
            return Err(PanelError::InvalidConfig(
                "feedback_queue_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Shortest duration a synthesized trajectory may have, in seconds.
    pub fn min_trajectory_duration(&self) -> f64 {
        MIN_DURATION_COMMAND_PERIODS / self.command_rate_hz
    }

    pub fn command_period(&self) -> Duration {
        period_of(self.command_rate_hz)
    }

    pub fn widget_refresh_period(&self) -> Duration {
        period_of(self.widget_refresh_rate_hz)
    }

    pub fn discovery_period(&self) -> Duration {
        period_of(self.discovery_rate_hz)
    }
}

fn period_of(rate_hz: f64) -> Duration {
    Duration::from_secs_f64(1.0 / rate_hz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_stock_timing() {
        let config = PanelConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.min_trajectory_duration() - 0.5).abs() < 1e-12);
        assert_eq!(config.command_period(), Duration::from_millis(100));
        assert_eq!(config.discovery_period(), Duration::from_secs(1));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "command_rate_hz": 20.0 }}"#).unwrap();

        let config = PanelConfig::load(file.path()).unwrap();
        assert_eq!(config.command_rate_hz, 20.0);
        assert_eq!(config.widget_refresh_rate_hz, 30.0);
        assert!((config.min_trajectory_duration() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_rate() {
        let config = PanelConfig {
            discovery_rate_hz: 0.0,
            ..PanelConfig::default()
        };
        assert!(matches!(config.validate(), Err(PanelError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_inverted_speed_range() {
        let config = PanelConfig {
            speed_scaling_min_percent: 80.0,
            speed_scaling_max_percent: 20.0,
            ..PanelConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
