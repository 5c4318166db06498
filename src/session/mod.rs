//! Start/stop lifecycle and live parameter edits for one echo session.

/// Media-source and context-provider capabilities.
pub mod capture;
pub mod config;
/// The session state machine.
pub mod controller;
pub mod observer;
pub mod state;


pub use capture::{pending_capture, CaptureResolver, ContextProvider, MediaSource, PendingCapture};
pub use config::EchoConfig;
pub use controller::EchoSession;
pub use observer::{Observer, SubscriptionId};
pub use state::{SessionState, StateChange};
