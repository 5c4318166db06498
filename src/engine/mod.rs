//! Realtime render engine behind the [`AudioContext`](crate::graph::AudioContext) trait.
//!
//! [`open`] splits the engine in two:
//!
//! - [`EngineContext`] lives on the control thread. Graph builders talk to
//!   it; it validates every request against a mirror of the topology and
//!   forwards edits through a lock-free ring.
//! - [`Renderer`] lives on the audio thread. It applies the queued edits at
//!   the top of each block, pulls microphone samples from the capture ring
//!   and renders mono output.

pub mod context;
pub mod message;
pub mod node;
pub mod render;

use rtrb::{Consumer, RingBuffer};

pub use context::EngineContext;
pub use render::Renderer;

use crate::{
    graph::{segment::segment_count, NodeId},
    MAX_DELAY_TIME, MAX_REPEATS,
};

pub(crate) const SINK: NodeId = NodeId::from_raw(0);
pub(crate) const SOURCE: NodeId = NodeId::from_raw(1);

/// Edits that can be in flight between the two halves.
pub const COMMAND_QUEUE_CAPACITY: usize = 4096;

/// Gain changes glide over this long to avoid clicks.
pub const GAIN_RAMP_SECONDS: f32 = 0.01;

/// Node slots the largest valid echo graph needs with delay nodes holding
/// `delay_capacity` seconds: every repeat at the longest delay, one gain per
/// repeat, plus the source and the sink.
pub fn node_slots(delay_capacity: f32) -> usize {
    let segments = segment_count(MAX_DELAY_TIME, delay_capacity).max(1);
    MAX_REPEATS * (segments + 1) + 2
}

/// Open an engine rendering at `sample_rate` whose delay nodes hold at most
/// `delay_capacity` seconds. `capture` carries mono microphone samples.
pub fn open(
    sample_rate: f32,
    delay_capacity: f32,
    capture: Consumer<f32>,
) -> (EngineContext, Renderer) {
    open_with_queue(sample_rate, delay_capacity, capture, COMMAND_QUEUE_CAPACITY)
}

/// [`open`] with an explicit command ring size.
pub fn open_with_queue(
    sample_rate: f32,
    delay_capacity: f32,
    capture: Consumer<f32>,
    queue_capacity: usize,
) -> (EngineContext, Renderer) {
    let slots = node_slots(delay_capacity);
    // Between two drains the renderer can retire every node it holds plus
    // every insert still queued, so the return ring never fills.
    let (command_tx, command_rx) = RingBuffer::new(queue_capacity);
    let (recycle_tx, recycle_rx) = RingBuffer::new(slots + queue_capacity);
    let ramp_samples = (GAIN_RAMP_SECONDS * sample_rate).round() as u32;

    let context = EngineContext::new(sample_rate, delay_capacity, slots, command_tx, recycle_rx);
    let renderer = Renderer::new(command_rx, recycle_tx, capture, ramp_samples, slots);

    tracing::debug!(
        sample_rate,
        delay_capacity,
        queue_capacity,
        node_slots = slots,
        "engine opened"
    );
    (context, renderer)
}
