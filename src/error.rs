//! error.rs
//! Error taxonomy for the panel.
//!
//! Nothing here is fatal to the process: discovery errors leave a stale or empty
//! candidate list, limit errors keep control mode disabled, feedback errors drop a
//! single update. Callers log and degrade; only `bind` surfaces an error to the user.

use thiserror::Error;

/// Convenience alias for results carrying a [`PanelError`].
pub type PanelResult<T> = std::result::Result<T, PanelError>;

#[derive(Error, Debug)]
pub enum PanelError {
    /// Selection references a controller absent from the latest discovery snapshot.
    #[error("controller '{0}' is not among the running controllers")]
    NoSuchController(String),

    #[error("no controller selected")]
    NoControllerSelected,

    /// Joint and speed-scaling editors only accept input in control mode.
    #[error("editors are read-only in monitor mode")]
    MonitorMode,

    /// Control mode is blocked until every joint has position and velocity limits.
    #[error("joint limits incomplete, missing: {}", .missing.join(", "))]
    IncompleteJointLimits { missing: Vec<String> },

    #[error("malformed feedback: {names} joint names vs {positions} positions")]
    MalformedFeedback { names: usize, positions: usize },

    /// A reported position that is NaN or infinite; the whole report is dropped.
    #[error("malformed feedback: non-finite position {value} for joint '{joint}'")]
    NonFiniteFeedback { joint: String, value: f64 },

    #[error("feedback references joints outside the session: {}", .joints.join(", "))]
    UnknownJointInFeedback { joints: Vec<String> },

    #[error("joint '{0}' is not part of the bound controller")]
    UnknownJoint(String),

    #[error("target {value} for joint '{joint}' is not a finite number")]
    InvalidTarget { joint: String, value: f64 },

    /// Synthesized duration does not fit a `Duration` (e.g. absurd feedback positions).
    #[error("trajectory duration out of range: {0}")]
    DurationOutOfRange(#[from] std::time::TryFromFloatSecsError),

    /// No feedback received yet for this joint, so no command can be synthesized.
    #[error("position of joint '{0}' is not known yet")]
    PositionUnknown(String),

    #[error("discovery unavailable: {0}")]
    DiscoveryUnavailable(String),

    #[error("joint limits lookup failed: {0}")]
    LimitsUnavailable(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
