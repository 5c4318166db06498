use tracing::{debug, warn};

use crate::{
    dsp::decay::DecayMap,
    error::{ContextError, EchoError},
    graph::{
        node::{AudioContext, NodeId},
        segment::{segment, segment_count},
    },
    MAX_DELAY_TIME, MAX_REPEATS,
};

/*
Echo Chain Topologies
=====================

An echo is the source heard again later, quieter. The graph makes that from
two primitives: delay nodes (bounded to the context's capacity C) and gain
nodes. A delay longer than C is split across several delay nodes in series
(see segment.rs).

Two layouts are supported. They sound different; neither is a refactor of
the other.

SingleChain
-----------

One delayed copy of the source, at one gain. With delay = 2.5s, C = 1s:

    source ──→ [1.0] ──→ [1.0] ──→ [0.5] ──→ (gain) ──→ sink

The repeat count and decay map play no part in the wiring.

PerRepeat
---------

One sub-chain per repeat. Each sub-chain delays by the full delay time and
feeds the next, and each taps off through its own gain into the sink:

    source ──→ [1.0][1.0] ──┬──→ [1.0][1.0] ──┬──→ [1.0][1.0] ──→ (g2) ──→ sink
                            │                 │
                            └──→ (g0) ──→ sink └──→ (g1) ──→ sink

Repeat i is heard at (i + 1) × delay with gain output_gain × decay[i].
The gains sit on taps, never in series, so each repeat is attenuated
independently and nothing compounds.
*/

/// Which layout the builder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Topology {
    /// One delayed copy through a single gain.
    SingleChain,
    /// One independently attenuated sub-chain per repeat.
    #[default]
    PerRepeat,
}

impl Topology {
    /// Whether changing the repeat count changes the node layout.
    pub fn depends_on_repeats(&self) -> bool {
        matches!(self, Topology::PerRepeat)
    }

    fn chain_count(&self, repeat_count: usize) -> usize {
        match self {
            Topology::SingleChain => 1,
            Topology::PerRepeat => repeat_count,
        }
    }

    /// Panics if a per-repeat `decay` is shorter than the chain count; every
    /// caller checks the length first.
    fn gain_for(&self, repeat: usize, output_gain: f32, decay: &DecayMap) -> f32 {
        match self {
            Topology::SingleChain => output_gain,
            Topology::PerRepeat => output_gain * decay.as_slice()[repeat],
        }
    }
}

/// Inputs for one build.
#[derive(Debug, Clone, Copy)]
pub struct EchoParams<'a> {
    /// Seconds between repeats.
    pub delay_time: f32,
    pub repeat_count: usize,
    pub output_gain: f32,
    /// Must hold exactly `repeat_count` entries.
    pub decay: &'a DecayMap,
}

impl EchoParams<'_> {
    fn validate(&self, capacity: f32) -> Result<(), EchoError> {
        if !(self.delay_time.is_finite()
            && self.delay_time > 0.0
            && self.delay_time <= MAX_DELAY_TIME)
        {
            return Err(EchoError::InvalidParameter(format!(
                "delay_time must be in (0, {MAX_DELAY_TIME}] seconds, got {}",
                self.delay_time
            )));
        }
        if self.repeat_count == 0 || self.repeat_count > MAX_REPEATS {
            return Err(EchoError::InvalidParameter(format!(
                "repeat_count must be in 1..={MAX_REPEATS}, got {}",
                self.repeat_count
            )));
        }
        if self.decay.len() != self.repeat_count {
            return Err(EchoError::InvalidParameter(format!(
                "decay map has {} entries for {} repeats",
                self.decay.len(),
                self.repeat_count
            )));
        }
        if !(self.output_gain.is_finite() && self.output_gain >= 0.0) {
            return Err(EchoError::InvalidParameter(format!(
                "output_gain must be >= 0, got {}",
                self.output_gain
            )));
        }
        if !(capacity.is_finite() && capacity > 0.0) {
            return Err(EchoError::InvalidParameter(format!(
                "context reports unusable delay capacity {capacity}"
            )));
        }
        Ok(())
    }
}

/// The delay segments of one repeat and the gain that taps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatChain {
    segments: Vec<NodeId>,
    gain: NodeId,
}

impl RepeatChain {
    /// Delay nodes in signal order.
    pub fn segments(&self) -> &[NodeId] {
        &self.segments
    }

    pub fn gain(&self) -> NodeId {
        self.gain
    }

    fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.segments.iter().copied().chain(std::iter::once(self.gain))
    }
}

/// A built echo graph. Also the handle that tears it down again.
#[derive(Debug)]
pub struct EchoGraph {
    topology: Topology,
    source: NodeId,
    chains: Vec<RepeatChain>,
    segment_times: Vec<f32>,
    // Level last written to each chain's gain node.
    levels: Vec<f32>,
    torn_down: bool,
}

impl EchoGraph {
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// The node the graph reads from. Owned by the caller, not the graph.
    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn chains(&self) -> &[RepeatChain] {
        &self.chains
    }

    pub fn gain_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.chains.iter().map(|c| c.gain)
    }

    /// Every node this graph created.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.chains.iter().flat_map(RepeatChain::nodes)
    }

    pub fn node_count(&self) -> usize {
        self.chains.iter().map(|c| c.segments.len() + 1).sum()
    }

    /// Segment durations shared by every chain.
    pub fn segment_times(&self) -> &[f32] {
        &self.segment_times
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Rewrite every gain node for a new master gain. No rewiring.
    ///
    /// All or nothing: if a write fails, the gains already written are set
    /// back to their previous levels before the error is returned.
    pub fn set_output_gain<C: AudioContext + ?Sized>(
        &mut self,
        ctx: &mut C,
        output_gain: f32,
        decay: &DecayMap,
    ) -> Result<(), EchoError> {
        if self.torn_down {
            return Ok(());
        }
        if self.topology == Topology::PerRepeat && decay.len() != self.chains.len() {
            return Err(EchoError::InvalidParameter(format!(
                "decay map has {} entries for {} chains",
                decay.len(),
                self.chains.len()
            )));
        }
        let levels: Vec<f32> = (0..self.chains.len())
            .map(|repeat| self.topology.gain_for(repeat, output_gain, decay))
            .collect();
        for (written, (chain, &level)) in self.chains.iter().zip(&levels).enumerate() {
            if let Err(err) = ctx.set_gain(chain.gain, level) {
                warn!(error = %err, written, "gain rewrite failed, restoring previous levels");
                for (chain, &previous) in self.chains[..written].iter().zip(&self.levels) {
                    if let Err(err) = ctx.set_gain(chain.gain, previous) {
                        warn!(node = ?chain.gain, error = %err, "could not restore gain");
                    }
                }
                return Err(err.into());
            }
        }
        self.levels = levels;
        Ok(())
    }

    /// Retune the delay nodes in place for a new delay time.
    ///
    /// Returns `Ok(false)` without touching anything when the new time needs
    /// a different number of segments; the caller must rebuild instead. If a
    /// write fails, the delays already written are set back to the previous
    /// segment times and the error is returned.
    pub fn retime<C: AudioContext + ?Sized>(
        &mut self,
        ctx: &mut C,
        delay_time: f32,
    ) -> Result<bool, ContextError> {
        if self.torn_down {
            return Ok(false);
        }
        let capacity = ctx.delay_capacity();
        if segment_count(delay_time, capacity) != self.segment_times.len() {
            return Ok(false);
        }

        let times = segment(delay_time, capacity);
        let mut written = Vec::with_capacity(self.node_count());
        for chain in &self.chains {
            for (position, (&node, &seconds)) in chain.segments.iter().zip(&times).enumerate() {
                if let Err(err) = ctx.set_delay_time(node, seconds) {
                    warn!(
                        error = %err,
                        written = written.len(),
                        "retime failed, restoring previous delay times"
                    );
                    for &(node, position) in written.iter().rev() {
                        let previous = self.segment_times[position];
                        if let Err(err) = ctx.set_delay_time(node, previous) {
                            warn!(node = ?node, error = %err, "could not restore delay time");
                        }
                    }
                    return Err(err);
                }
                written.push((node, position));
            }
        }
        self.segment_times = times;
        Ok(true)
    }

    /// Disconnect and release every node this graph created.
    ///
    /// Idempotent: a second call does nothing.
    pub fn teardown<C: AudioContext + ?Sized>(&mut self, ctx: &mut C) {
        if self.torn_down {
            return;
        }
        for node in self.node_ids() {
            ctx.disconnect(node);
            ctx.release(node);
        }
        self.torn_down = true;
        debug!(nodes = self.node_count(), "echo graph torn down");
    }
}

/// Wires echo graphs into an [`AudioContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoChainBuilder {
    topology: Topology,
}

impl EchoChainBuilder {
    pub fn new(topology: Topology) -> Self {
        Self { topology }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Build the echo graph reading from `source`.
    ///
    /// Parameters are validated before any node is created. If the context
    /// fails partway, every node created so far is disconnected and released
    /// before the error is returned.
    pub fn build<C: AudioContext + ?Sized>(
        &self,
        ctx: &mut C,
        source: NodeId,
        params: &EchoParams<'_>,
    ) -> Result<EchoGraph, EchoError> {
        let capacity = ctx.delay_capacity();
        params.validate(capacity)?;

        let segment_times = segment(params.delay_time, capacity);
        let mut created = Vec::new();

        match self.wire(ctx, source, &segment_times, params, &mut created) {
            Ok((chains, levels)) => {
                debug!(
                    topology = ?self.topology,
                    chains = chains.len(),
                    segments_per_chain = segment_times.len(),
                    delay_time = params.delay_time,
                    "echo graph built"
                );
                Ok(EchoGraph {
                    topology: self.topology,
                    source,
                    chains,
                    segment_times,
                    levels,
                    torn_down: false,
                })
            }
            Err(err) => {
                warn!(
                    created = created.len(),
                    error = %err,
                    "echo graph build failed, rolling back"
                );
                for &node in created.iter().rev() {
                    ctx.disconnect(node);
                    ctx.release(node);
                }
                Err(EchoError::PartialBuild {
                    created: created.len(),
                    source: err,
                })
            }
        }
    }

    fn wire<C: AudioContext + ?Sized>(
        &self,
        ctx: &mut C,
        source: NodeId,
        segment_times: &[f32],
        params: &EchoParams<'_>,
        created: &mut Vec<NodeId>,
    ) -> Result<(Vec<RepeatChain>, Vec<f32>), ContextError> {
        let sink = ctx.sink();
        let chain_count = self.topology.chain_count(params.repeat_count);
        let mut chains = Vec::with_capacity(chain_count);
        let mut levels = Vec::with_capacity(chain_count);

        // Each chain reads from the previous chain's last delay, not its gain.
        let mut upstream = source;
        for repeat in 0..chain_count {
            let mut segments = Vec::with_capacity(segment_times.len());
            for &seconds in segment_times {
                let node = ctx.create_delay(seconds)?;
                created.push(node);
                ctx.connect(upstream, node)?;
                segments.push(node);
                upstream = node;
            }

            let level = self
                .topology
                .gain_for(repeat, params.output_gain, params.decay);
            let gain = ctx.create_gain(level)?;
            created.push(gain);
            ctx.connect(upstream, gain)?;
            ctx.connect(gain, sink)?;

            chains.push(RepeatChain { segments, gain });
            levels.push(level);
        }

        Ok((chains, levels))
    }
}
