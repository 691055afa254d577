//! lister.rs
//! Listing services for controller managers and their controllers, plus the
//! type/state filters applied to every controller poll.

use crate::error::PanelResult;

/// Lifecycle state reported by a controller manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Active,
    Inactive,
    Other(String),
}

impl ControllerState {
    pub fn parse(state: &str) -> Self {
        match state {
            "active" => ControllerState::Active,
            "inactive" => ControllerState::Inactive,
            other => ControllerState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ControllerState::Active => "active",
            ControllerState::Inactive => "inactive",
            ControllerState::Other(s) => s,
        }
    }
}

/// Snapshot of one controller as reported by a single poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerInfo {
    pub name: String,
    pub controller_type: String,
    pub state: ControllerState,
    /// Interface identifiers of the form `<joint>/<interface_type>`.
    pub required_state_interfaces: Vec<String>,
}

/// Lists reachable controller manager namespaces.
pub trait ControllerManagerLister: Send + Sync {
    fn list_controller_managers(&self) -> PanelResult<Vec<String>>;
}

/// Lists the controllers known to one controller manager.
pub trait ControllerLister: Send + Sync {
    fn list_controllers(&self, cm_ns: &str) -> PanelResult<Vec<ControllerInfo>>;
}

/// Controllers whose type contains `marker`.
pub fn filter_by_type<'a>(
    controllers: impl IntoIterator<Item = &'a ControllerInfo>,
    marker: &str,
) -> Vec<&'a ControllerInfo> {
    controllers
        .into_iter()
        .filter(|c| c.controller_type.contains(marker))
        .collect()
}

/// Controllers reporting exactly `state`.
pub fn filter_by_state<'a>(
    controllers: impl IntoIterator<Item = &'a ControllerInfo>,
    state: &str,
) -> Vec<&'a ControllerInfo> {
    controllers
        .into_iter()
        .filter(|c| c.state.as_str() == state)
        .collect()
}
