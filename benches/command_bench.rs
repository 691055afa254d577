use criterion::{Criterion, criterion_group, criterion_main};
use std::{collections::HashMap, hint::black_box};

use jtc_panel::discovery::limits::JointLimits;
use jtc_panel::session::{
    command::CommandSynthesizer,
    feedback::{FeedbackIngester, JointRuntimeState},
    transport::ControllerStateMsg,
};

const JOINTS: usize = 7; // typical arm

fn fixture() -> (Vec<String>, HashMap<String, JointRuntimeState>, HashMap<String, JointLimits>) {
    let joints: Vec<String> = (1..=JOINTS).map(|i| format!("joint_{}", i)).collect();
    let runtime = joints
        .iter()
        .enumerate()
        .map(|(i, j)| {
            (
                j.clone(),
                JointRuntimeState { position: Some(0.1 * i as f64), command: Some(-0.1 * i as f64) },
            )
        })
        .collect();
    let limits = joints
        .iter()
        .map(|j| (j.clone(), JointLimits { min_position: -3.0, max_position: 3.0, max_velocity: 1.5 }))
        .collect();
    (joints, runtime, limits)
}

fn synthesize_bench(c: &mut Criterion) {
    let synth = CommandSynthesizer::new(0.5);
    let (joints, runtime, limits) = fixture();

    c.bench_function("command_synthesize_7_joints", |b| {
        b.iter(|| {
            let traj = synth
                .synthesize(black_box(&joints), black_box(&runtime), black_box(&limits), 0.5)
                .unwrap();
            // Must stay far below the 100 ms command period
            black_box(traj);
        })
    });
}

fn feedback_decode_bench(c: &mut Criterion) {
    let (joints, mut runtime, _) = fixture();
    let msg = ControllerStateMsg {
        positions: (0..joints.len()).map(|i| i as f64 * 0.01).collect(),
        joint_names: joints,
    };

    c.bench_function("feedback_decode_apply_7_joints", |b| {
        b.iter(|| {
            let update = FeedbackIngester::decode(black_box(&msg)).unwrap();
            FeedbackIngester::apply(&update, &mut runtime).unwrap();
        })
    });
}

criterion_group!(benches, synthesize_bench, feedback_decode_bench);
criterion_main!(benches);
