//! Low-level DSP primitives used by the render engine.
//!
//! These components are allocation-free once constructed and realtime-safe,
//! so the engine can run them directly inside the audio callback. They stay
//! focused on the signal-processing math; graph wiring lives in `graph` and
//! `engine`.

/// Gain application and click-free gain ramps.
pub mod amplify;
/// Logarithmic per-repeat decay curves.
pub mod decay;
/// Bounded time-domain delay line.
pub mod delay;
/// Summing of converging signals.
pub mod mix;

pub use decay::{DecayMap, DecayPolicy};
