//! Audio-thread half of the engine.

/*
Rendering a Graph
=================

Every block, the renderer walks its nodes in topological order: a node is
only processed after everything feeding it has produced its output.

    source ──→ d1 ──→ d2 ──→ g2 ──→ sink
                 └──→ g1 ─────────────↗

A node's input is the sum of its predecessors' outputs for the block. The
order is recomputed (Kahn's algorithm) only when the edges change, using
buffers sized ahead of time.

Node ids index straight into the slot table. The table holds one slot per
node the largest valid graph can have, and the control side never hands
out an id past it, so nothing here grows.


Realtime Rules
--------------

  - No locks. Edits arrive through a single-producer ring.
  - No allocations. Every table is sized when the engine opens.
  - No frees. Removed nodes are pushed back to the control thread, which
    drops them there.
  - No logging. Anything worth saying is said by the control side.
*/

use rtrb::{Consumer, Producer};

use crate::{
    dsp::mix::sum_into,
    engine::{message::GraphCommand, node::RenderNode, SINK, SOURCE},
    graph::NodeId,
    MAX_BLOCK_SIZE,
};

pub struct Renderer {
    nodes: Vec<Option<Box<RenderNode>>>,
    edges: Vec<(NodeId, NodeId)>,
    order: Vec<usize>,
    in_degree: Vec<usize>,
    order_dirty: bool,
    commands: Consumer<GraphCommand>,
    recycled: Producer<Box<RenderNode>>,
    capture: Consumer<f32>,
    mix: Vec<f32>,
    ramp_samples: u32,
}

impl Renderer {
    pub(crate) fn new(
        commands: Consumer<GraphCommand>,
        recycled: Producer<Box<RenderNode>>,
        capture: Consumer<f32>,
        ramp_samples: u32,
        node_slots: usize,
    ) -> Self {
        let node_slots = node_slots.max(SOURCE.index() + 1);
        let mut nodes: Vec<Option<Box<RenderNode>>> = Vec::with_capacity(node_slots);
        nodes.resize_with(node_slots, || None);
        nodes[SINK.index()] = Some(Box::new(RenderNode::sink()));
        nodes[SOURCE.index()] = Some(Box::new(RenderNode::source()));

        Self {
            nodes,
            edges: Vec::with_capacity(node_slots * 2),
            order: Vec::with_capacity(node_slots),
            in_degree: vec![0; node_slots],
            order_dirty: true,
            commands,
            recycled,
            capture,
            mix: vec![0.0; MAX_BLOCK_SIZE],
            ramp_samples,
        }
    }

    /// Render mono output. Any length is accepted; work is done in chunks of
    /// at most [`MAX_BLOCK_SIZE`] frames.
    pub fn render(&mut self, out: &mut [f32]) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_block(chunk);
        }
    }

    /// Live nodes, including the source and the sink.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes the renderer can hold at once.
    pub fn node_slots(&self) -> usize {
        self.nodes.len()
    }

    fn render_block(&mut self, out: &mut [f32]) {
        self.apply_commands();
        if self.order_dirty {
            self.rebuild_order();
            self.order_dirty = false;
        }

        let frames = out.len();
        for k in 0..self.order.len() {
            let idx = self.order[k];

            let mix = &mut self.mix[..frames];
            mix.fill(0.0);
            for &(from, to) in &self.edges {
                if to.index() != idx {
                    continue;
                }
                if let Some(upstream) = self.nodes[from.index()].as_deref() {
                    sum_into(mix, upstream.output(frames));
                }
            }

            if let Some(node) = self.nodes[idx].as_deref_mut() {
                node.process(mix, &mut self.capture);
            }
        }

        match self.nodes[SINK.index()].as_deref() {
            Some(sink) => out.copy_from_slice(sink.output(frames)),
            None => out.fill(0.0),
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                GraphCommand::Insert { id, node } => match self.nodes.get_mut(id.index()) {
                    Some(slot) => {
                        if let Some(old) = slot.replace(node) {
                            self.recycle(old);
                        }
                        self.order_dirty = true;
                    }
                    // Past the table; the control side refuses these ids.
                    None => self.recycle(node),
                },
                GraphCommand::Remove(id) => {
                    if id == SINK || id == SOURCE {
                        continue;
                    }
                    self.drop_edges(id);
                    if let Some(old) = self.nodes.get_mut(id.index()).and_then(Option::take) {
                        self.recycle(old);
                    }
                    self.order_dirty = true;
                }
                GraphCommand::Connect { from, to } => {
                    if self.is_live(from) && self.is_live(to) && !self.edges.contains(&(from, to)) {
                        self.edges.push((from, to));
                        self.order_dirty = true;
                    }
                }
                GraphCommand::Disconnect(id) => {
                    self.drop_edges(id);
                    self.order_dirty = true;
                }
                GraphCommand::SetGain { id, gain } => {
                    let ramp_samples = self.ramp_samples;
                    if let Some(node) = self.node_mut(id) {
                        node.set_gain(gain, ramp_samples);
                    }
                }
                GraphCommand::SetDelay { id, samples } => {
                    if let Some(node) = self.node_mut(id) {
                        node.set_delay(samples);
                    }
                }
                GraphCommand::Clear => {
                    self.edges.clear();
                    for idx in 2..self.nodes.len() {
                        if let Some(old) = self.nodes[idx].take() {
                            self.recycle(old);
                        }
                    }
                    self.order_dirty = true;
                }
            }
        }
    }

    fn is_live(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.index()), Some(Some(_)))
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut RenderNode> {
        self.nodes.get_mut(id.index()).and_then(|slot| slot.as_deref_mut())
    }

    fn drop_edges(&mut self, id: NodeId) {
        self.edges.retain(|&(from, to)| from != id && to != id);
    }

    fn recycle(&mut self, node: Box<RenderNode>) {
        // The return ring is sized to hold every node that can be retired
        // between two drains.
        let pushed = self.recycled.push(node);
        debug_assert!(pushed.is_ok(), "node return ring overflowed");
    }

    /// Kahn's algorithm over live nodes. Nodes caught in a cycle are left out
    /// of the order and never processed.
    fn rebuild_order(&mut self) {
        self.order.clear();
        self.in_degree.fill(0);

        for &(from, to) in &self.edges {
            if self.nodes[from.index()].is_some() {
                self.in_degree[to.index()] += 1;
            }
        }

        for (idx, slot) in self.nodes.iter().enumerate() {
            if slot.is_some() && self.in_degree[idx] == 0 {
                self.order.push(idx);
            }
        }

        let mut head = 0;
        while head < self.order.len() {
            let idx = self.order[head];
            head += 1;
            for &(from, to) in &self.edges {
                if from.index() != idx {
                    continue;
                }
                let target = to.index();
                self.in_degree[target] -= 1;
                if self.in_degree[target] == 0 && self.nodes[target].is_some() {
                    self.order.push(target);
                }
            }
        }
    }
}
