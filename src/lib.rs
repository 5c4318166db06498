pub mod dsp; // Delay lines, gain ramps, decay curves
pub mod engine; // In-process processing context
pub mod error;
pub mod graph; // Echo-chain construction over an abstract context
pub mod session; // Start/stop lifecycle and live parameter edits

pub use error::{CaptureError, ContextError, EchoError};

pub const MAX_BLOCK_SIZE: usize = 2048;

/// Longest duration (seconds) a single delay node can hold unless the
/// context reports otherwise.
pub const DEFAULT_DELAY_CAPACITY: f32 = 1.0;

/// Upper bound on echo repeats; keeps node counts (and delay memory) bounded.
pub const MAX_REPEATS: usize = 64;

/// Longest delay time (seconds) an echo may be configured with.
pub const MAX_DELAY_TIME: f32 = 10.0;
