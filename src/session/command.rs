//! command.rs
//! Trajectory command synthesis.
//!
//! Each control tick sends a single point: every joint moves straight to its
//! target (or holds position), and the whole motion takes as long as the slowest
//! joint needs at its velocity limit, stretched by the speed scale.

use std::{collections::HashMap, time::Duration};

use crate::discovery::limits::JointLimits;
use crate::error::{PanelError, PanelResult};
use crate::session::feedback::JointRuntimeState;
use crate::session::transport::{JointTrajectory, TrajectoryPoint};

#[derive(Debug, Clone, Copy)]
pub struct CommandSynthesizer {
    min_trajectory_duration: f64,
}

impl CommandSynthesizer {
    pub fn new(min_trajectory_duration: f64) -> Self {
        Self { min_trajectory_duration }
    }

    pub fn min_trajectory_duration(&self) -> f64 {
        self.min_trajectory_duration
    }

    /// Time joint needs to travel from `position` to `command` at `max_velocity`,
    /// never less than the minimum trajectory duration.
    pub fn joint_duration(&self, position: f64, command: f64, max_velocity: f64) -> f64 {
        ((command - position).abs() / max_velocity).max(self.min_trajectory_duration)
    }

    /// Builds the next command. Fails with `PositionUnknown` until every joint
    /// has reported a finite position, and with `DurationOutOfRange` when the
    /// motion time cannot be represented; the caller skips publication for that tick.
    ///
    /// `speed_scale` must lie in `(0, 1]`.
    pub fn synthesize(
        &self,
        joints: &[String],
        runtime: &HashMap<String, JointRuntimeState>,
        limits: &HashMap<String, JointLimits>,
        speed_scale: f64,
    ) -> PanelResult<JointTrajectory> {
        debug_assert!(speed_scale > 0.0 && speed_scale <= 1.0);

        let mut positions = Vec::with_capacity(joints.len());
        let mut duration = self.min_trajectory_duration;

        for name in joints {
            let position = runtime
                .get(name)
                .and_then(|s| s.position)
                .filter(|p| p.is_finite())
                .ok_or_else(|| PanelError::PositionUnknown(name.clone()))?;
            let command = runtime
                .get(name)
                .and_then(|s| s.command)
                .filter(|c| c.is_finite())
                .unwrap_or(position);

            let max_velocity = match limits.get(name) {
                Some(l) if l.max_velocity > 0.0 => l.max_velocity,
                _ => {
                    return Err(PanelError::IncompleteJointLimits {
                        missing: vec![name.clone()],
                    });
                }
            };

            duration = duration.max(self.joint_duration(position, command, max_velocity));
            positions.push(command);
        }

        let time_from_start = Duration::try_from_secs_f64(duration / speed_scale)?;
        Ok(JointTrajectory {
            joint_names: joints.to_vec(),
            points: vec![TrajectoryPoint { positions, time_from_start }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(
        entries: &[(&str, Option<f64>, Option<f64>, f64)],
    ) -> (Vec<String>, HashMap<String, JointRuntimeState>, HashMap<String, JointLimits>) {
        let mut joints = Vec::new();
        let mut runtime = HashMap::new();
        let mut limits = HashMap::new();
        for (name, position, command, max_velocity) in entries {
            joints.push(name.to_string());
            runtime.insert(name.to_string(), JointRuntimeState { position: *position, command: *command });
            limits.insert(
                name.to_string(),
                JointLimits { min_position: -3.0, max_position: 3.0, max_velocity: *max_velocity },
            );
        }
        (joints, runtime, limits)
    }

    fn duration_secs(traj: &JointTrajectory) -> f64 {
        traj.points[0].time_from_start.as_secs_f64()
    }

    #[test]
    fn duration_is_bounded_below_and_scaled() {
        let synth = CommandSynthesizer::new(0.5);
        let (joints, runtime, limits) = setup(&[("j1", Some(0.0), Some(1.0), 2.0)]);

        let full = synth.synthesize(&joints, &runtime, &limits, 1.0).unwrap();
        assert!((duration_secs(&full) - 0.5).abs() < 1e-9);

        let half = synth.synthesize(&joints, &runtime, &limits, 0.5).unwrap();
        assert!((duration_secs(&half) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn slowest_joint_sets_duration() {
        let synth = CommandSynthesizer::new(0.5);
        let (joints, runtime, limits) = setup(&[
            ("j1", Some(0.0), Some(0.1), 1.0),
            ("j2", Some(1.0), Some(-2.0), 1.5),
        ]);

        let traj = synth.synthesize(&joints, &runtime, &limits, 1.0).unwrap();
        assert!((duration_secs(&traj) - 2.0).abs() < 1e-9);
        assert_eq!(traj.joint_names, joints);
        assert_eq!(traj.points.len(), 1);
        assert_eq!(traj.points[0].positions, vec![0.1, -2.0]);
    }

    #[test]
    fn joints_without_target_hold_position() {
        let synth = CommandSynthesizer::new(0.5);
        let (joints, runtime, limits) = setup(&[
            ("j1", Some(0.3), None, 1.0),
            ("j2", Some(-0.4), Some(-0.4), 1.0),
        ]);

        let traj = synth.synthesize(&joints, &runtime, &limits, 1.0).unwrap();
        assert_eq!(traj.points[0].positions, vec![0.3, -0.4]);
        assert!((duration_secs(&traj) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_position_skips_the_cycle() {
        let synth = CommandSynthesizer::new(0.5);
        let (joints, runtime, limits) = setup(&[
            ("j1", Some(0.0), Some(1.0), 1.0),
            ("j2", None, Some(1.0), 1.0),
        ]);

        let err = synth.synthesize(&joints, &runtime, &limits, 1.0).unwrap_err();
        assert!(matches!(err, PanelError::PositionUnknown(ref j) if j == "j2"));
    }

    #[test]
    fn zero_velocity_limit_is_incomplete() {
        let synth = CommandSynthesizer::new(0.5);
        let (joints, runtime, limits) = setup(&[("j1", Some(0.0), Some(1.0), 0.0)]);

        assert!(matches!(
            synth.synthesize(&joints, &runtime, &limits, 1.0),
            Err(PanelError::IncompleteJointLimits { .. })
        ));
    }

    #[test]
    fn huge_or_infinite_distance_is_an_error_not_a_panic() {
        let synth = CommandSynthesizer::new(0.5);

        let (joints, runtime, limits) = setup(&[("j1", Some(1e20), Some(0.5), 1e-300)]);
        assert!(matches!(
            synth.synthesize(&joints, &runtime, &limits, 0.01),
            Err(PanelError::DurationOutOfRange(_))
        ));

        let (joints, runtime, limits) = setup(&[("j1", Some(1e20), Some(0.5), 1.0)]);
        assert!(matches!(
            synth.synthesize(&joints, &runtime, &limits, 0.01),
            Err(PanelError::DurationOutOfRange(_))
        ));
    }

    #[test]
    fn non_finite_position_is_never_published() {
        let synth = CommandSynthesizer::new(0.5);

        let (joints, runtime, limits) = setup(&[("j1", Some(f64::NAN), None, 1.0)]);
        assert!(matches!(
            synth.synthesize(&joints, &runtime, &limits, 1.0),
            Err(PanelError::PositionUnknown(_))
        ));

        let (joints, runtime, limits) = setup(&[("j1", Some(f64::INFINITY), Some(0.5), 1.0)]);
        assert!(matches!(
            synth.synthesize(&joints, &runtime, &limits, 1.0),
            Err(PanelError::PositionUnknown(_))
        ));
    }
}
