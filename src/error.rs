//! Error types for graph construction, capture and session control.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors produced by [`EchoSession`](crate::session::EchoSession) and the
/// [`EchoChainBuilder`](crate::graph::builder::EchoChainBuilder).
#[derive(Debug, Error)]
pub enum EchoError {
    /// Malformed build input or configuration value. Raised before any node
    /// is created.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The microphone (or the processing context) could not be obtained.
    #[error("audio capture unavailable: {0}")]
    CaptureUnavailable(#[from] CaptureError),

    /// A start or stop is already in flight.
    #[error("another start/stop operation is in progress")]
    OperationInProgress,

    /// A node creation or connection failed mid-build. Every node created
    /// before the failure has already been rolled back.
    #[error("graph build failed after {created} nodes: {source}")]
    PartialBuild {
        created: usize,
        #[source]
        source: ContextError,
    },

    /// A live parameter write on an existing graph failed.
    #[error("audio context error: {0}")]
    Context(#[from] ContextError),
}

/// Failures while acquiring a source capability or opening a context for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("permission to record was denied")]
    PermissionDenied,

    #[error("no input device available")]
    NoDevice,

    /// The device exists but could not be opened or configured.
    #[error("input device error: {0}")]
    Device(String),

    /// The source was acquired but no processing context could be opened.
    #[error("processing context unavailable: {0}")]
    ContextUnavailable(String),

    /// Whoever was resolving the acquisition went away without answering.
    #[error("capture request was abandoned")]
    Abandoned,
}

/// Failures reported by an [`AudioContext`](crate::graph::AudioContext).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContextError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("delay of {seconds}s exceeds node capacity of {capacity}s")]
    DelayOutOfRange { seconds: f32, capacity: f32 },

    #[error("connecting {from:?} -> {to:?} would form a cycle")]
    Cycle { from: NodeId, to: NodeId },

    /// The command queue to the audio thread is full.
    #[error("command queue full")]
    QueueFull,

    #[error("context is closed")]
    Closed,

    /// The render tables were sized up front and this edit would not fit.
    #[error("engine has room for {limit} {what}")]
    LimitReached { what: &'static str, limit: usize },

    #[error("backend error: {0}")]
    Backend(String),
}
