//! Real-world scenario benchmarks.
//!
//! These render complete echo graphs through the engine the way the audio
//! callback does.

mod echo;

pub use echo::bench_echo;
