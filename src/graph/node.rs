use crate::error::ContextError;

/// Opaque handle to a node living inside an [`AudioContext`].
///
/// Handles say nothing about what kind of node they point at; only the
/// context that issued one can interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u32 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// What a node does to the signal passing through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Live input (microphone).
    Source,
    /// Delays its input by at most the context's delay capacity.
    Delay,
    /// Multiplies its input by a gain factor.
    Gain,
    /// Final destination; everything audible converges here.
    Sink,
}

/// Processing-context capability the echo graph is built against.
///
/// A context owns its nodes. Callers only hold [`NodeId`]s and ask the
/// context to create, wire, retune and release them. Parameter writes may be
/// deferred (scheduled for the next audio block) by the implementation.
pub trait AudioContext {
    /// Longest delay, in seconds, one delay node can hold.
    fn delay_capacity(&self) -> f32;

    /// The single implicit output node.
    fn sink(&self) -> NodeId;

    fn create_delay(&mut self, seconds: f32) -> Result<NodeId, ContextError>;

    fn create_gain(&mut self, gain: f32) -> Result<NodeId, ContextError>;

    fn set_delay_time(&mut self, node: NodeId, seconds: f32) -> Result<(), ContextError>;

    fn set_gain(&mut self, node: NodeId, gain: f32) -> Result<(), ContextError>;

    /// Route `from`'s output into `to`'s input.
    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), ContextError>;

    /// Remove every connection touching `node`. Unknown or already
    /// disconnected nodes are ignored.
    fn disconnect(&mut self, node: NodeId);

    /// Drop a node the caller no longer needs. Implies `disconnect`.
    fn release(&mut self, node: NodeId);

    /// Shut the context down. Further calls fail with `Closed`.
    fn close(&mut self);
}
