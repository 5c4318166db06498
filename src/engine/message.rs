use crate::{engine::node::RenderNode, graph::NodeId};

/// Topology and parameter edits sent from the control thread to the renderer.
///
/// Nodes travel boxed so the renderer only moves a pointer into its slot
/// table; allocation happens on the sending side.
pub enum GraphCommand {
    Insert { id: NodeId, node: Box<RenderNode> },
    Remove(NodeId),
    Connect { from: NodeId, to: NodeId },
    /// Drop every edge touching the node.
    Disconnect(NodeId),
    SetGain { id: NodeId, gain: f32 },
    SetDelay { id: NodeId, samples: usize },
    /// Drop every node except the source and the sink.
    Clear,
}

impl GraphCommand {
    pub fn name(&self) -> &'static str {
        match self {
            GraphCommand::Insert { .. } => "insert",
            GraphCommand::Remove(_) => "remove",
            GraphCommand::Connect { .. } => "connect",
            GraphCommand::Disconnect(_) => "disconnect",
            GraphCommand::SetGain { .. } => "set_gain",
            GraphCommand::SetDelay { .. } => "set_delay",
            GraphCommand::Clear => "clear",
        }
    }
}
