//! In-memory [`AudioContext`] that records topology instead of rendering.

use std::collections::BTreeMap;

use crate::{
    error::ContextError,
    graph::node::{AudioContext, NodeId, NodeKind},
};

const SINK: NodeId = NodeId::from_raw(0);
const SOURCE: NodeId = NodeId::from_raw(1);

#[derive(Debug, Clone, Copy)]
struct FakeNode {
    kind: NodeKind,
    value: f32,
}

/// Topology-only context. Optionally fails from the n-th fallible call on,
/// or at that call only.
#[derive(Debug)]
pub(crate) struct FakeContext {
    capacity: f32,
    next_id: u32,
    nodes: BTreeMap<NodeId, FakeNode>,
    edges: Vec<(NodeId, NodeId)>,
    fail_at: Option<usize>,
    fail_once: bool,
    fallible_calls: usize,
    calls: usize,
    closed: bool,
}

impl FakeContext {
    pub(crate) fn new(capacity: f32) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(SINK, FakeNode { kind: NodeKind::Sink, value: 0.0 });
        nodes.insert(SOURCE, FakeNode { kind: NodeKind::Source, value: 0.0 });
        Self {
            capacity,
            next_id: 2,
            nodes,
            edges: Vec::new(),
            fail_at: None,
            fail_once: false,
            fallible_calls: 0,
            calls: 0,
            closed: false,
        }
    }

    /// Fail the fallible call with zero-based index `n` (and every one after).
    pub(crate) fn failing_after(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self.fail_once = false;
        self
    }

    /// Fail only the fallible call with zero-based index `n`.
    pub(crate) fn failing_once_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self.fail_once = true;
        self
    }

    pub(crate) fn source(&self) -> NodeId {
        SOURCE
    }

    /// Mutating calls seen so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls
    }

    pub(crate) fn count(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|n| n.kind == kind).count()
    }

    pub(crate) fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub(crate) fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&(from, to))
    }

    pub(crate) fn gain_of(&self, node: NodeId) -> Option<f32> {
        self.value_of(node, NodeKind::Gain)
    }

    pub(crate) fn delay_of(&self, node: NodeId) -> Option<f32> {
        self.value_of(node, NodeKind::Delay)
    }

    fn value_of(&self, node: NodeId, kind: NodeKind) -> Option<f32> {
        self.nodes
            .get(&node)
            .filter(|n| n.kind == kind)
            .map(|n| n.value)
    }

    fn check(&mut self) -> Result<(), ContextError> {
        self.calls += 1;
        if self.closed {
            return Err(ContextError::Closed);
        }
        let index = self.fallible_calls;
        self.fallible_calls += 1;
        match self.fail_at {
            Some(n) if index == n || (index > n && !self.fail_once) => Err(
                ContextError::Backend(format!("injected failure at call {index}")),
            ),
            _ => Ok(()),
        }
    }

    fn add(&mut self, kind: NodeKind, value: f32) -> NodeId {
        let id = NodeId::from_raw(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, FakeNode { kind, value });
        id
    }

    fn set(&mut self, node: NodeId, kind: NodeKind, value: f32) -> Result<(), ContextError> {
        self.check()?;
        match self.nodes.get_mut(&node) {
            Some(n) if n.kind == kind => {
                n.value = value;
                Ok(())
            }
            _ => Err(ContextError::UnknownNode(node)),
        }
    }
}

impl AudioContext for FakeContext {
    fn delay_capacity(&self) -> f32 {
        self.capacity
    }

    fn sink(&self) -> NodeId {
        SINK
    }

    fn create_delay(&mut self, seconds: f32) -> Result<NodeId, ContextError> {
        self.check()?;
        if seconds > self.capacity {
            return Err(ContextError::DelayOutOfRange {
                seconds,
                capacity: self.capacity,
            });
        }
        Ok(self.add(NodeKind::Delay, seconds))
    }

    fn create_gain(&mut self, gain: f32) -> Result<NodeId, ContextError> {
        self.check()?;
        Ok(self.add(NodeKind::Gain, gain))
    }

    fn set_delay_time(&mut self, node: NodeId, seconds: f32) -> Result<(), ContextError> {
        self.set(node, NodeKind::Delay, seconds)
    }

    fn set_gain(&mut self, node: NodeId, gain: f32) -> Result<(), ContextError> {
        self.set(node, NodeKind::Gain, gain)
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), ContextError> {
        self.check()?;
        for node in [from, to] {
            if !self.nodes.contains_key(&node) {
                return Err(ContextError::UnknownNode(node));
            }
        }
        if !self.has_edge(from, to) {
            self.edges.push((from, to));
        }
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) {
        self.calls += 1;
        self.edges.retain(|&(from, to)| from != node && to != node);
    }

    fn release(&mut self, node: NodeId) {
        self.calls += 1;
        if node == SINK || node == SOURCE {
            return;
        }
        self.edges.retain(|&(from, to)| from != node && to != node);
        self.nodes.remove(&node);
    }

    fn close(&mut self) {
        self.closed = true;
        self.edges.clear();
        self.nodes.retain(|&id, _| id == SINK || id == SOURCE);
    }
}
