//! settings.rs
//! Persisted panel selection: last controller manager and controller.
//!
//! Restoring is best-effort; the panel ignores entries that discovery no longer reports.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::PanelResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSettings {
    pub cm_ns: Option<String>,
    pub controller_name: Option<String>,
}

impl PanelSettings {
    pub fn save(&self, path: &Path) -> PanelResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> PanelResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.json");
        let settings = PanelSettings {
            cm_ns: Some("/robot/controller_manager".into()),
            controller_name: Some("arm_controller".into()),
        };

        settings.save(&path).unwrap();
        assert_eq!(PanelSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(PanelSettings::load(&dir.path().join("absent.json")).is_err());
    }
}
