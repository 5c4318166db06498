//! Benchmarks for rendering whole echo graphs.
//!
//! Each case builds a graph on a fresh engine at 48kHz and measures one
//! block of steady-state rendering with a live input signal.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rtrb::{Producer, RingBuffer};
use saavy_echo::{
    dsp::DecayMap,
    engine::{self, EngineContext, Renderer},
    graph::{EchoChainBuilder, EchoParams, Topology},
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

fn echo_engine(
    topology: Topology,
    delay_time: f32,
    repeats: usize,
) -> (Producer<f32>, EngineContext, Renderer) {
    let (tx, rx) = RingBuffer::new(8192);
    let (mut ctx, mut renderer) = engine::open(SAMPLE_RATE, 1.0, rx);
    let decay = DecayMap::generate(repeats);
    let source = ctx.source();
    EchoChainBuilder::new(topology)
        .build(
            &mut ctx,
            source,
            &EchoParams {
                delay_time,
                repeat_count: repeats,
                output_gain: 1.0,
                decay: &decay,
            },
        )
        .expect("benchmark graph builds");

    // Apply the queued build before timing anything
    renderer.render(&mut [0.0; 64]);
    (tx, ctx, renderer)
}

pub fn bench_echo(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/echo");

    let cases: &[(&str, Topology, f32, usize)] = &[
        // Defaults: 2s delay, 3 repeats → 6 delay nodes
        ("default_per_repeat", Topology::PerRepeat, 2.0, 3),
        ("single_chain_2s", Topology::SingleChain, 2.0, 3),
        // Short slapback with a long tail
        ("slapback_16_repeats", Topology::PerRepeat, 0.12, 16),
    ];

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let mut out = vec![0.0f32; size];

        for &(name, topology, delay_time, repeats) in cases {
            let (mut tx, _ctx, mut renderer) = echo_engine(topology, delay_time, repeats);

            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for &sample in &input {
                        let _ = tx.push(sample);
                    }
                    renderer.render(black_box(&mut out));
                })
            });
        }
    }

    group.finish();
}
