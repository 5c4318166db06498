//! Benchmarks for gain primitives.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_echo::dsp::amplify::{self, GainRamp};

use crate::BLOCK_SIZES;

pub fn bench_amplify(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/amplify");

    for &size in BLOCK_SIZES {
        let signal: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        let mut signal_copy = signal.clone();
        group.bench_with_input(BenchmarkId::new("apply_gain", size), &size, |b, _| {
            b.iter(|| {
                signal_copy.copy_from_slice(&signal);
                amplify::apply_gain(black_box(&mut signal_copy), black_box(0.5))
            })
        });

        // Settled ramp takes the constant-gain path
        let mut ramp = GainRamp::new(0.5);
        let mut signal_copy = signal.clone();
        group.bench_with_input(BenchmarkId::new("ramp_settled", size), &size, |b, _| {
            b.iter(|| {
                signal_copy.copy_from_slice(&signal);
                ramp.process(black_box(&mut signal_copy))
            })
        });

        // Re-armed every iteration so each block is spent ramping
        let mut ramp = GainRamp::new(0.0);
        let mut signal_copy = signal.clone();
        group.bench_with_input(BenchmarkId::new("ramp_moving", size), &size, |b, _| {
            b.iter(|| {
                signal_copy.copy_from_slice(&signal);
                ramp.set_target(black_box(1.0), size as u32 * 2);
                ramp.process(black_box(&mut signal_copy))
            })
        });
    }

    group.finish();
}
