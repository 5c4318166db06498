//! Echo-chain construction over an abstract processing context.
//!
//! The graph layer never touches samples. It asks an [`AudioContext`] for
//! delay and gain nodes, wires them into one of the echo [`Topology`]s and
//! hands back an [`EchoGraph`] that can be retuned in place or torn down.
//! The `engine` module provides a context that actually renders audio.

/// Echo graph construction, live retuning and teardown.
pub mod builder;
/// Node handles and the processing-context trait.
pub mod node;
/// Splitting long delays across capacity-bounded nodes.
pub mod segment;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::{EchoChainBuilder, EchoGraph, EchoParams, RepeatChain, Topology};
pub use node::{AudioContext, NodeId, NodeKind};
