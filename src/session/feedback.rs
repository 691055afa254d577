//! feedback.rs
//! Controller state ingestion.
//!
//! Decoding runs on the executor thread and only produces a [`PositionUpdate`];
//! applying the update to the runtime table happens on the UI loop.

use std::collections::HashMap;

use crate::error::{PanelError, PanelResult};
use crate::session::transport::ControllerStateMsg;

/// Joint name → reported position, applied atomically by the UI loop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PositionUpdate {
    pub positions: HashMap<String, f64>,
}

/// Per-joint position and user target.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointRuntimeState {
    /// Absent until the first state report.
    pub position: Option<f64>,
    /// Absent until the user edits the joint.
    pub command: Option<f64>,
}

pub struct FeedbackIngester;

impl FeedbackIngester {
    /// Builds the update from the report's parallel arrays. Reports with a
    /// length mismatch or a non-finite position are rejected whole.
    pub fn decode(msg: &ControllerStateMsg) -> PanelResult<PositionUpdate> {
        if msg.joint_names.len() != msg.positions.len() {
            return Err(PanelError::MalformedFeedback {
                names: msg.joint_names.len(),
                positions: msg.positions.len(),
            });
        }

        if let Some((joint, value)) = msg
            .joint_names
            .iter()
            .zip(&msg.positions)
            .find(|(_, p)| !p.is_finite())
        {
            return Err(PanelError::NonFiniteFeedback { joint: joint.clone(), value: *value });
        }

        let positions = msg
            .joint_names
            .iter()
            .cloned()
            .zip(msg.positions.iter().copied())
            .collect();
        Ok(PositionUpdate { positions })
    }

    /// Writes known joints into `runtime`. Unknown joints are skipped and
    /// reported; the known part of the update is still applied.
    pub fn apply(
        update: &PositionUpdate,
        runtime: &mut HashMap<String, JointRuntimeState>,
    ) -> PanelResult<()> {
        let mut unknown = Vec::new();
        for (name, position) in &update.positions {
            match runtime.get_mut(name) {
                Some(state) => state.position = Some(*position),
                None => unknown.push(name.clone()),
            }
        }

        if unknown.is_empty() {
            Ok(())
        } else {
            unknown.sort();
            Err(PanelError::UnknownJointInFeedback { joints: unknown })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(names: &[&str], positions: &[f64]) -> ControllerStateMsg {
        ControllerStateMsg {
            joint_names: names.iter().map(|s| s.to_string()).collect(),
            positions: positions.to_vec(),
        }
    }

    fn runtime(names: &[&str]) -> HashMap<String, JointRuntimeState> {
        names
            .iter()
            .map(|n| (n.to_string(), JointRuntimeState::default()))
            .collect()
    }

    #[test]
    fn decodes_parallel_arrays() {
        let update = FeedbackIngester::decode(&msg(&["j1", "j2"], &[0.1, -0.2])).unwrap();
        assert_eq!(update.positions.len(), 2);
        assert_eq!(update.positions["j2"], -0.2);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = FeedbackIngester::decode(&msg(&["j1", "j2"], &[0.1])).unwrap_err();
        assert!(matches!(err, PanelError::MalformedFeedback { names: 2, positions: 1 }));
    }

    #[test]
    fn non_finite_positions_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = FeedbackIngester::decode(&msg(&["j1", "j2"], &[0.1, bad])).unwrap_err();
            assert!(matches!(err, PanelError::NonFiniteFeedback { ref joint, .. } if joint == "j2"));
        }
        // Large but finite values are still positions.
        assert!(FeedbackIngester::decode(&msg(&["j1"], &[1e20])).is_ok());
    }

    #[test]
    fn applies_known_joints() {
        let mut table = runtime(&["j1", "j2"]);
        table.get_mut("j1").unwrap().command = Some(0.7);

        let update = FeedbackIngester::decode(&msg(&["j1", "j2"], &[0.5, 1.5])).unwrap();
        FeedbackIngester::apply(&update, &mut table).unwrap();

        assert_eq!(table["j1"], JointRuntimeState { position: Some(0.5), command: Some(0.7) });
        assert_eq!(table["j2"].position, Some(1.5));
    }

    #[test]
    fn unknown_joints_are_reported_and_skipped() {
        let mut table = runtime(&["j1"]);
        let update = FeedbackIngester::decode(&msg(&["j1", "wrist", "elbow"], &[0.5, 1.0, 2.0])).unwrap();

        let err = FeedbackIngester::apply(&update, &mut table).unwrap_err();
        match err {
            PanelError::UnknownJointInFeedback { joints } => {
                assert_eq!(joints, vec!["elbow".to_string(), "wrist".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(table.len(), 1);
        assert_eq!(table["j1"].position, Some(0.5));
    }
}
