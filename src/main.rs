//! # Joint Trajectory Controller Panel Demo
//! Runs the panel's session core against a simulated robot cell.
//!
//! The cell hosts one controller manager with two trajectory controllers (arm and
//! wrist), each backed by a simulated arm thread. The panel runs its UI loop on the
//! main thread at 200 Hz; discovery, feedback refresh and command publication all
//! happen through `Panel::tick`.
//!
//! ## Modes
//! - **Monitor:** bind the arm controller and print feedback for a few seconds.
//! - **Control:** enable control mode, send a target pose at reduced speed.
//! - **Reselect:** bounce between controllers to show unload-before-load.
//!
//! ## Outputs
//! - `data/panel_settings.json` — last selection, restored on next start.
//!
//! Optional first argument: path to a JSON `PanelConfig`.

use std::{
    fs::create_dir_all,
    io::{Write, stdin, stdout},
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{error, info, warn};
use spin_sleep::{SpinSleeper, SpinStrategy};

use jtc_panel::{
    Mode, Panel, PanelConfig,
    discovery::{limits::JointLimits, namespace::resolve},
    sim::{
        arm::{ArmConfig, SimulatedArm},
        bus::LoopbackBus,
        cell::{SimulatedCell, trajectory_controller},
    },
    utils::settings::PanelSettings,
};

const CM_NS: &str = "/robot/controller_manager";
const ARM_CONTROLLER: &str = "arm_controller";
const WRIST_CONTROLLER: &str = "wrist_controller";
const ARM_JOINTS: &[&str] = &["shoulder_pan", "shoulder_lift", "elbow"];
const WRIST_JOINTS: &[&str] = &["wrist_1", "wrist_2"];
const UI_PERIOD: Duration = Duration::from_millis(5);
const SETTINGS_PATH: &str = "data/panel_settings.json";

fn main() {
    env_logger::init();
    info!("=== JTC PANEL DEMO START ===");

    let config = match std::env::args().nth(1) {
        Some(path) => match PanelConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config {}: {}", path, e);
                return;
            }
        },
        None => PanelConfig::default(),
    };

    let bus = Arc::new(LoopbackBus::new());
    let cell = build_cell();
    let _arms = spawn_arms(&bus);

    let mut panel = match Panel::new(
        config,
        Box::new(cell.clone()),
        Box::new(cell.clone()),
        Box::new(cell),
        bus,
    ) {
        Ok(panel) => panel,
        Err(e) => {
            error!("Failed to create panel: {}", e);
            return;
        }
    };

    let start = Instant::now();
    panel.start(start);
    if let Ok(saved) = PanelSettings::load(Path::new(SETTINGS_PATH)) {
        panel.restore_settings(start, &saved);
        if let Some(name) = panel.selected_controller() {
            println!("Restored last selection: {}", name);
        }
    }

    loop {
        let choice = prompt_menu();
        match choice.as_str() {
            "1" | "" => run_monitor(&mut panel),
            "2" => run_control(&mut panel),
            "3" => run_reselect(&mut panel),
            "4" => break,
            other => println!("Unrecognized option '{}', please try again.", other),
        }
    }

    create_dir_all("data").ok();
    if let Err(e) = panel.save_settings().save(Path::new(SETTINGS_PATH)) {
        warn!("Failed to save settings: {}", e);
    }
    panel.shutdown();

    let stats = panel.stats().snapshot();
    info!(
        "[Main] commands published={}, skipped={}, feedback received={}, rejected={}",
        stats.commands_published, stats.commands_skipped, stats.feedback_received, stats.feedback_rejected
    );
    info!("=== JTC PANEL DEMO FINISHED ===");
}

fn prompt_menu() -> String {
    println!("\n┌─────────────────────────────────────────────┐");
    println!("│     SELECT DEMO                             │");
    println!("├─────────────────────────────────────────────┤");
    println!("│  1) Monitor arm controller                  │");
    println!("│  2) Control arm controller (target pose)    │");
    println!("│  3) Reselect between controllers            │");
    println!("│  4) Exit                                    │");
    println!("└─────────────────────────────────────────────┘");
    print!("Select [1/2/3/4] (default: 1): ");
    let _ = stdout().flush();

    let mut input = String::new();
    let _ = stdin().read_line(&mut input);
    input.trim().to_string()
}

fn prompt_speed() -> f64 {
    print!("Speed scaling percent [default: 50]: ");
    let _ = stdout().flush();
    let mut input = String::new();
    let _ = stdin().read_line(&mut input);
    input.trim().parse::<f64>().unwrap_or(50.0)
}

fn build_cell() -> SimulatedCell {
    let cell = SimulatedCell::new();
    cell.add_controller_manager(CM_NS);
    cell.add_controller(CM_NS, trajectory_controller(ARM_CONTROLLER, ARM_JOINTS));
    cell.add_controller(CM_NS, trajectory_controller(WRIST_CONTROLLER, WRIST_JOINTS));

    for joint in ARM_JOINTS {
        cell.set_joint_limits(joint, JointLimits { min_position: -3.0, max_position: 3.0, max_velocity: 1.0 });
    }
    for joint in WRIST_JOINTS {
        cell.set_joint_limits(joint, JointLimits { min_position: -1.5, max_position: 1.5, max_velocity: 2.0 });
    }
    cell
}

fn spawn_arms(bus: &Arc<LoopbackBus>) -> Vec<SimulatedArm> {
    [(ARM_CONTROLLER, ARM_JOINTS), (WRIST_CONTROLLER, WRIST_JOINTS)]
        .into_iter()
        .map(|(name, joints)| {
            SimulatedArm::spawn(
                bus.clone(),
                ArmConfig {
                    controller_ns: resolve(CM_NS, name),
                    joints: joints.iter().map(|j| j.to_string()).collect(),
                    initial_positions: vec![0.0; joints.len()],
                    state_period: Duration::from_millis(10),
                    noise: 0.0005,
                },
            )
        })
        .collect()
}

/// Drives the UI loop for `duration`, calling `each_second` once per second.
fn run_for(panel: &mut Panel, duration: Duration, mut each_second: impl FnMut(&mut Panel)) {
    let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);
    let start = Instant::now();
    let mut next_report = start + Duration::from_secs(1);
    let mut next_release = start;

    while start.elapsed() < duration {
        let now = Instant::now();
        if now < next_release {
            sleeper.sleep(next_release - now);
        }
        next_release += UI_PERIOD;

        let now = Instant::now();
        panel.tick(now);
        if now >= next_report {
            each_second(panel);
            next_report += Duration::from_secs(1);
        }
    }
}

/// Waits for discovery, then binds `name` under the demo controller manager.
fn ensure_selected(panel: &mut Panel, name: &str) -> bool {
    if panel.selected_controller() == Some(name) {
        return true;
    }

    run_for(panel, Duration::from_millis(1100), |_| {});
    if let Err(e) = panel.select_controller_manager(Some(CM_NS)) {
        error!("[Main] {}", e);
        return false;
    }
    println!("Controllers on {}: {:?}", CM_NS, panel.controllers());

    match panel.select_controller(Instant::now(), Some(name)) {
        Ok(()) => true,
        Err(e) => {
            error!("[Main] Cannot select {}: {}", name, e);
            false
        }
    }
}

fn print_editors(panel: &mut Panel) {
    let mode = panel.mode();
    for editor in panel.editors() {
        println!(
            "  [{:?}] {:<14} {:>8} in [{:.2}, {:.2}]",
            mode,
            editor.name,
            editor.value.map(|v| format!("{:+.3}", v)).unwrap_or_else(|| "--".into()),
            editor.min,
            editor.max
        );
    }
}

fn run_monitor(panel: &mut Panel) {
    if !ensure_selected(panel, ARM_CONTROLLER) {
        return;
    }
    if let Err(e) = panel.set_control_enabled(Instant::now(), false) {
        warn!("[Main] {}", e);
    }
    println!("Monitoring {} for 3 s...", ARM_CONTROLLER);
    run_for(panel, Duration::from_secs(3), print_editors);
}

fn run_control(panel: &mut Panel) {
    if !ensure_selected(panel, ARM_CONTROLLER) {
        return;
    }
    // Let feedback arrive so every joint has a known position.
    run_for(panel, Duration::from_millis(200), |_| {});

    if let Err(e) = panel.set_control_enabled(Instant::now(), true) {
        error!("[Main] Control mode unavailable: {}", e);
        return;
    }

    let speed = prompt_speed();
    match panel.set_speed_scaling(speed) {
        Ok(applied) => println!("Speed scaling: {:.0}%", applied),
        Err(e) => warn!("[Main] {}", e),
    }

    for (joint, target) in ARM_JOINTS.iter().zip([0.8, -0.6, 1.2]) {
        match panel.set_joint_command(joint, target) {
            Ok(applied) => println!("Target {} = {:+.3}", joint, applied),
            Err(e) => warn!("[Main] {}", e),
        }
    }

    println!("Streaming commands for 5 s...");
    run_for(panel, Duration::from_secs(5), print_editors);

    if let Err(e) = panel.set_control_enabled(Instant::now(), false) {
        warn!("[Main] {}", e);
    }
    run_for(panel, Duration::from_millis(200), |_| {});
    println!("Back in {:?} mode, final positions:", panel.mode());
    print_editors(panel);
    debug_assert_eq!(panel.mode(), Mode::Monitor);
}

fn run_reselect(panel: &mut Panel) {
    for name in [WRIST_CONTROLLER, ARM_CONTROLLER, WRIST_CONTROLLER] {
        if !ensure_selected(panel, name) {
            return;
        }
        println!("Bound {} ({} joints)", name, panel.editors().len());
        run_for(panel, Duration::from_secs(1), print_editors);
    }
}
