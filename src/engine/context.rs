//! Control-thread half of the engine.

use std::collections::{BTreeMap, VecDeque};

use rtrb::{Consumer, Producer};
use tracing::{debug, trace, warn};

use crate::{
    dsp::delay::seconds_to_samples,
    engine::{message::GraphCommand, node::RenderNode, SINK, SOURCE},
    error::ContextError,
    graph::{AudioContext, NodeId, NodeKind},
};

/// Relative slack allowed when checking a delay against node capacity.
const CAPACITY_SLACK: f32 = 1e-4;

/// [`AudioContext`] that drives a [`Renderer`](crate::engine::Renderer) on
/// another thread.
///
/// Keeps a mirror of the topology so every request can be validated and
/// answered without waiting on the audio thread. Edits reach the renderer
/// at the start of its next block, in the order they were made.
pub struct EngineContext {
    sample_rate: f32,
    delay_capacity: f32,
    /// Ids at or past this have no slot in the renderer.
    node_slots: usize,
    commands: Producer<GraphCommand>,
    recycled: Consumer<Box<RenderNode>>,
    /// Infallible edits (disconnect, release, close) that did not fit in
    /// the ring. Flushed before anything else is sent.
    backlog: VecDeque<GraphCommand>,
    nodes: BTreeMap<NodeId, NodeKind>,
    edges: Vec<(NodeId, NodeId)>,
    free_ids: Vec<u32>,
    next_id: u32,
    closed: bool,
}

impl EngineContext {
    pub(crate) fn new(
        sample_rate: f32,
        delay_capacity: f32,
        node_slots: usize,
        commands: Producer<GraphCommand>,
        recycled: Consumer<Box<RenderNode>>,
    ) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(SINK, NodeKind::Sink);
        nodes.insert(SOURCE, NodeKind::Source);

        Self {
            sample_rate,
            delay_capacity,
            node_slots,
            commands,
            recycled,
            backlog: VecDeque::new(),
            nodes,
            edges: Vec::new(),
            free_ids: Vec::new(),
            next_id: SOURCE.raw() + 1,
            closed: false,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The live-input node. Always present.
    pub fn source(&self) -> NodeId {
        SOURCE
    }

    /// Most nodes, source and sink included, that can exist at once.
    pub fn node_slots(&self) -> usize {
        self.node_slots
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Live nodes, including the source and the sink.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|&&k| k == kind).count()
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edits not yet handed to the renderer.
    pub fn pending(&self) -> usize {
        self.backlog.len()
    }

    /// Push any backlog into the ring and drop nodes the renderer has
    /// retired. Called before every edit; cheap to call on a timer too.
    pub fn flush(&mut self) {
        while let Ok(node) = self.recycled.pop() {
            drop(node);
        }
        while let Some(command) = self.backlog.pop_front() {
            if let Err(rtrb::PushError::Full(command)) = self.commands.push(command) {
                self.backlog.push_front(command);
                break;
            }
        }
    }

    /// Send an edit that the caller can be told about.
    fn send(&mut self, command: GraphCommand) -> Result<(), ContextError> {
        self.flush();
        if !self.backlog.is_empty() || self.commands.is_full() {
            warn!(command = command.name(), "engine command queue full");
            return Err(ContextError::QueueFull);
        }
        trace!(command = command.name(), "engine command");
        self.commands
            .push(command)
            .map_err(|_| ContextError::QueueFull)
    }

    /// Send an edit that must not be lost. Queues locally if the ring is full.
    fn send_or_defer(&mut self, command: GraphCommand) {
        self.flush();
        if self.backlog.is_empty() {
            match self.commands.push(command) {
                Ok(()) => return,
                Err(rtrb::PushError::Full(command)) => {
                    debug!(command = command.name(), "deferring engine command");
                    self.backlog.push_back(command);
                }
            }
        } else {
            self.backlog.push_back(command);
        }
    }

    fn ensure_open(&self) -> Result<(), ContextError> {
        if self.closed {
            Err(ContextError::Closed)
        } else {
            Ok(())
        }
    }

    fn expect_kind(&self, node: NodeId, kind: NodeKind) -> Result<(), ContextError> {
        match self.nodes.get(&node) {
            Some(&k) if k == kind => Ok(()),
            _ => Err(ContextError::UnknownNode(node)),
        }
    }

    fn check_delay(&self, seconds: f32) -> Result<usize, ContextError> {
        let limit = self.delay_capacity * (1.0 + CAPACITY_SLACK);
        if !seconds.is_finite() || seconds < 0.0 || seconds > limit {
            return Err(ContextError::DelayOutOfRange {
                seconds,
                capacity: self.delay_capacity,
            });
        }
        Ok(seconds_to_samples(seconds, self.sample_rate))
    }

    fn insert(&mut self, kind: NodeKind, node: RenderNode) -> Result<NodeId, ContextError> {
        let id = match self.free_ids.pop() {
            Some(raw) => NodeId::from_raw(raw),
            None if (self.next_id as usize) < self.node_slots => {
                let id = NodeId::from_raw(self.next_id);
                self.next_id += 1;
                id
            }
            None => {
                warn!(limit = self.node_slots, "engine node table full");
                return Err(ContextError::LimitReached {
                    what: "nodes",
                    limit: self.node_slots,
                });
            }
        };

        if let Err(err) = self.send(GraphCommand::Insert {
            id,
            node: Box::new(node),
        }) {
            self.free_ids.push(id.raw());
            return Err(err);
        }
        self.nodes.insert(id, kind);
        Ok(id)
    }

    fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = Vec::new();
        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if seen.contains(&node) {
                continue;
            }
            seen.push(node);
            stack.extend(
                self.edges
                    .iter()
                    .filter(|&&(f, _)| f == node)
                    .map(|&(_, t)| t),
            );
        }
        false
    }
}

impl AudioContext for EngineContext {
    fn delay_capacity(&self) -> f32 {
        self.delay_capacity
    }

    fn sink(&self) -> NodeId {
        SINK
    }

    fn create_delay(&mut self, seconds: f32) -> Result<NodeId, ContextError> {
        self.ensure_open()?;
        let samples = self.check_delay(seconds)?;
        let max_samples = seconds_to_samples(self.delay_capacity, self.sample_rate);
        self.insert(NodeKind::Delay, RenderNode::delay(max_samples, samples))
    }

    fn create_gain(&mut self, gain: f32) -> Result<NodeId, ContextError> {
        self.ensure_open()?;
        self.insert(NodeKind::Gain, RenderNode::gain(gain))
    }

    fn set_delay_time(&mut self, node: NodeId, seconds: f32) -> Result<(), ContextError> {
        self.ensure_open()?;
        self.expect_kind(node, NodeKind::Delay)?;
        let samples = self.check_delay(seconds)?;
        self.send(GraphCommand::SetDelay { id: node, samples })
    }

    fn set_gain(&mut self, node: NodeId, gain: f32) -> Result<(), ContextError> {
        self.ensure_open()?;
        self.expect_kind(node, NodeKind::Gain)?;
        self.send(GraphCommand::SetGain { id: node, gain })
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), ContextError> {
        self.ensure_open()?;
        for node in [from, to] {
            if !self.nodes.contains_key(&node) {
                return Err(ContextError::UnknownNode(node));
            }
        }
        if self.edges.contains(&(from, to)) {
            return Ok(());
        }
        if self.reaches(to, from) {
            return Err(ContextError::Cycle { from, to });
        }
        if self.edges.len() >= self.node_slots * 2 {
            return Err(ContextError::LimitReached {
                what: "edges",
                limit: self.node_slots * 2,
            });
        }
        self.send(GraphCommand::Connect { from, to })?;
        self.edges.push((from, to));
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) {
        let before = self.edges.len();
        self.edges.retain(|&(from, to)| from != node && to != node);
        if self.edges.len() != before {
            self.send_or_defer(GraphCommand::Disconnect(node));
        }
    }

    fn release(&mut self, node: NodeId) {
        if node == SINK || node == SOURCE || !self.nodes.contains_key(&node) {
            return;
        }
        self.edges.retain(|&(from, to)| from != node && to != node);
        self.nodes.remove(&node);
        // Removal drops the node's edges on the render side as well.
        self.send_or_defer(GraphCommand::Remove(node));
        self.free_ids.push(node.raw());
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        debug!(nodes = self.nodes.len() - 2, "closing engine context");
        self.closed = true;
        self.edges.clear();
        self.nodes.retain(|&id, _| id == SINK || id == SOURCE);
        self.free_ids.clear();
        self.send_or_defer(GraphCommand::Clear);
    }
}
