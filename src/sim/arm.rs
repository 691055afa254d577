//! arm.rs
//! Simulated joint trajectory controller.
//!
//! Runs on its own thread with a periodic release (SpinSleeper, like a sensor loop):
//! takes the latest trajectory command off the bus, interpolates every joint
//! linearly towards its target over the commanded duration, and publishes a state
//! report each cycle with optional measurement noise.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, error, info};
use parking_lot::Mutex;
use rand::random_range;
use spin_sleep::{SpinSleeper, SpinStrategy};

use crate::session::transport::{ControllerStateMsg, JointTrajectory, command_topic, state_topic};
use crate::sim::bus::LoopbackBus;

#[derive(Debug, Clone)]
pub struct ArmConfig {
    pub controller_ns: String,
    pub joints: Vec<String>,
    pub initial_positions: Vec<f64>,
    pub state_period: Duration,
    /// Half-width of the uniform noise added to reported positions.
    pub noise: f64,
}

struct Segment {
    start: Vec<f64>,
    target: Vec<f64>,
    started_at: Instant,
    duration: Duration,
}

impl Segment {
    fn sample(&self, now: Instant) -> Vec<f64> {
        let elapsed = now.duration_since(self.started_at).as_secs_f64();
        let total = self.duration.as_secs_f64();
        let alpha = if total > 0.0 { (elapsed / total).min(1.0) } else { 1.0 };
        self.start
            .iter()
            .zip(&self.target)
            .map(|(s, t)| s + (t - s) * alpha)
            .collect()
    }
}

pub struct SimulatedArm {
    running: Arc<AtomicBool>,
    positions: Arc<Mutex<Vec<f64>>>,
    commands_seen: Arc<Mutex<u64>>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedArm {
    pub fn spawn(bus: Arc<LoopbackBus>, config: ArmConfig) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let positions = Arc::new(Mutex::new(config.initial_positions.clone()));
        let commands_seen = Arc::new(Mutex::new(0u64));

        let handle = {
            let running = running.clone();
            let positions = positions.clone();
            let commands_seen = commands_seen.clone();
            let name = format!("sim-arm{}", config.controller_ns.replace('/', "-"));

            thread::Builder::new()
                .name(name)
                .spawn(move || run_arm(&bus, &config, &running, &positions, &commands_seen))
        };

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                error!("[SimArm] Failed to spawn arm thread: {}", e);
                None
            }
        };

        Self {
            running,
            positions,
            commands_seen,
            handle,
        }
    }

    /// Current noiseless joint positions.
    pub fn positions(&self) -> Vec<f64> {
        self.positions.lock().clone()
    }

    pub fn commands_seen(&self) -> u64 {
        *self.commands_seen.lock()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            join_arm(handle);
        }
    }
}

/// Joins the arm thread; a panic inside it is logged rather than swallowed.
fn join_arm(handle: JoinHandle<()>) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(_) => {
            error!("[SimArm] Arm thread panicked before join");
            false
        }
    }
}

impl Drop for SimulatedArm {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_arm(
    bus: &LoopbackBus,
    config: &ArmConfig,
    running: &AtomicBool,
    positions: &Mutex<Vec<f64>>,
    commands_seen: &Mutex<u64>,
) {
    let commands = bus.tap_commands(&command_topic(&config.controller_ns));
    let topic = state_topic(&config.controller_ns);
    let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);

    info!("[SimArm] Serving {} joints on {}", config.joints.len(), config.controller_ns);

    let mut segment: Option<Segment> = None;
    let mut next_release = Instant::now();

    while running.load(Ordering::Acquire) {
        let now = Instant::now();
        if now < next_release {
            sleeper.sleep(next_release - now);
        }
        next_release += config.state_period;
        let now = Instant::now();

        // Only the newest command matters; older ones are superseded.
        let latest: Option<JointTrajectory> = commands.try_iter().last();
        let mut current = positions.lock().clone();
        if let Some(segment) = &segment {
            current = segment.sample(now);
        }

        if let Some(cmd) = latest {
            *commands_seen.lock() += 1;
            match accept_command(config, &cmd) {
                Some((target, duration)) => {
                    segment = Some(Segment {
                        start: current.clone(),
                        target,
                        started_at: now,
                        duration,
                    });
                }
                None => debug!("[SimArm] Ignoring command for joints {:?}", cmd.joint_names),
            }
        }

        *positions.lock() = current.clone();

        let reported = current
            .iter()
            .map(|p| if config.noise > 0.0 { p + random_range(-config.noise..config.noise) } else { *p })
            .collect();
        bus.deliver_state(
            &topic,
            ControllerStateMsg {
                joint_names: config.joints.clone(),
                positions: reported,
            },
        );
    }

    debug!("[SimArm] Stopped {}", config.controller_ns);
}

// Maps the command onto this arm's joint order; rejects unknown or missing joints.
fn accept_command(config: &ArmConfig, cmd: &JointTrajectory) -> Option<(Vec<f64>, Duration)> {
    let point = cmd.points.last()?;
    if point.positions.len() != cmd.joint_names.len() {
        return None;
    }

    let mut target = Vec::with_capacity(config.joints.len());
    for joint in &config.joints {
        let idx = cmd.joint_names.iter().position(|n| n == joint)?;
        target.push(point.positions[idx]);
    }
    Some((target, point.time_from_start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::transport::{TrajectoryPoint, Transport};

    fn config() -> ArmConfig {
        ArmConfig {
            controller_ns: "/arm".into(),
            joints: vec!["j1".into(), "j2".into()],
            initial_positions: vec![0.0, 0.0],
            state_period: Duration::from_millis(5),
            noise: 0.0,
        }
    }

    #[test]
    fn panicking_arm_thread_is_reported_on_join() {
        assert!(join_arm(thread::spawn(|| {})));
        assert!(!join_arm(thread::spawn(|| panic!("arm fault"))));
    }

    #[test]
    fn reorders_command_into_arm_joint_order() {
        let cmd = JointTrajectory {
            joint_names: vec!["j2".into(), "j1".into()],
            points: vec![TrajectoryPoint { positions: vec![2.0, 1.0], time_from_start: Duration::from_secs(1) }],
        };
        let (target, duration) = accept_command(&config(), &cmd).unwrap();
        assert_eq!(target, vec![1.0, 2.0]);
        assert_eq!(duration, Duration::from_secs(1));
    }

    #[test]
    fn rejects_command_missing_a_joint() {
        let cmd = JointTrajectory {
            joint_names: vec!["j1".into()],
            points: vec![TrajectoryPoint { positions: vec![1.0], time_from_start: Duration::from_secs(1) }],
        };
        assert!(accept_command(&config(), &cmd).is_none());
    }

    #[test]
    fn reaches_commanded_target() {
        let bus = Arc::new(LoopbackBus::new());
        let mut arm = SimulatedArm::spawn(bus.clone(), config());

        let publisher = bus.advertise_command("/arm/joint_trajectory").unwrap();
        // The tap is registered by the arm thread; retry until it picks up a command.
        let deadline = Instant::now() + Duration::from_secs(5);
        while arm.commands_seen() == 0 && Instant::now() < deadline {
            bus.publish(
                publisher,
                JointTrajectory {
                    joint_names: vec!["j1".into(), "j2".into()],
                    points: vec![TrajectoryPoint {
                        positions: vec![0.5, -0.5],
                        time_from_start: Duration::from_millis(50),
                    }],
                },
            )
            .unwrap();
            thread::sleep(Duration::from_millis(10));
        }

        thread::sleep(Duration::from_millis(200));
        let pos = arm.positions();
        arm.stop();
        assert!((pos[0] - 0.5).abs() < 1e-9, "{:?}", pos);
        assert!((pos[1] + 0.5).abs() < 1e-9, "{:?}", pos);
    }
}
