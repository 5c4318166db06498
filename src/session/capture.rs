//! Capabilities a session is started with: a media source that hands out
//! microphone captures, and a provider that opens a processing context for
//! one.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::{error::CaptureError, graph::AudioContext, graph::NodeId};

/// Hands out live input captures.
///
/// Acquisition may be slow (a permission prompt, a device waking up), so it
/// returns a [`PendingCapture`] instead of blocking.
pub trait MediaSource {
    type Capture;

    fn acquire(&mut self) -> PendingCapture<Self::Capture>;

    /// Give a capture back. Called exactly once for every capture the
    /// session received.
    fn release(&mut self, capture: Self::Capture);
}

/// Opens a processing context fed by a capture.
pub trait ContextProvider<Cap> {
    type Context: AudioContext;

    /// Returns the context and the node carrying the capture's signal.
    fn open(&mut self, capture: &mut Cap) -> Result<(Self::Context, NodeId), CaptureError>;
}

/// A capture that may not have resolved yet.
///
/// Backed by a one-shot channel. If the [`CaptureResolver`] is dropped
/// without answering, the capture resolves to [`CaptureError::Abandoned`].
#[derive(Debug)]
pub struct PendingCapture<T> {
    rx: Receiver<Result<T, CaptureError>>,
}

/// The answering half of a [`PendingCapture`].
#[derive(Debug)]
pub struct CaptureResolver<T> {
    tx: Sender<Result<T, CaptureError>>,
}

/// A linked resolver and pending capture.
pub fn pending_capture<T>() -> (CaptureResolver<T>, PendingCapture<T>) {
    let (tx, rx) = bounded(1);
    (CaptureResolver { tx }, PendingCapture { rx })
}

impl<T> PendingCapture<T> {
    /// Already granted.
    pub fn ready(capture: T) -> Self {
        let (resolver, pending) = pending_capture();
        let _ = resolver.tx.send(Ok(capture));
        pending
    }

    /// Already refused.
    pub fn failed(err: CaptureError) -> Self {
        let (resolver, pending) = pending_capture();
        resolver.deny(err);
        pending
    }

    /// Non-blocking check. `None` while still pending.
    pub fn try_resolve(&self) -> Option<Result<T, CaptureError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CaptureError::Abandoned)),
        }
    }

    /// Block until resolved.
    pub fn wait(self) -> Result<T, CaptureError> {
        self.rx.recv().unwrap_or(Err(CaptureError::Abandoned))
    }

    /// Block for at most `timeout`. `None` if still pending afterwards.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, CaptureError>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(CaptureError::Abandoned)),
        }
    }
}

impl<T> CaptureResolver<T> {
    /// Hand over the capture. Gives it back if nobody is waiting any more.
    pub fn grant(self, capture: T) -> Result<(), T> {
        match self.tx.send(Ok(capture)) {
            Ok(()) => Ok(()),
            Err(err) => match err.into_inner() {
                Ok(capture) => Err(capture),
                Err(_) => Ok(()),
            },
        }
    }

    pub fn deny(self, err: CaptureError) {
        let _ = self.tx.send(Err(err));
    }
}
