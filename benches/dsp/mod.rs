//! Benchmarks for low-level DSP primitives.

mod amplify;
mod delay;
mod mix;

pub use amplify::bench_amplify;
pub use delay::bench_delay;
pub use mix::bench_mix;
