use std::fmt;

use crate::{dsp::decay::DecayPolicy, graph::Topology};

/// Where a session is in its start/stop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Waiting on the microphone.
    Starting,
    Recording,
    /// Tearing the graph down.
    Stopping,
}

impl SessionState {
    /// A start or stop is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Stopping)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Recording => "recording",
            SessionState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// One observable change, published after the session has acted on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateChange {
    State(SessionState),
    Recording(bool),
    DelayTime(f32),
    RepeatCount(usize),
    Gain(f32),
    Topology(Topology),
    Decay(DecayPolicy),
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateChange::State(state) => write!(f, "state: {state}"),
            StateChange::Recording(on) => write!(f, "recording: {on}"),
            StateChange::DelayTime(seconds) => write!(f, "delay: {seconds:.2}s"),
            StateChange::RepeatCount(repeats) => write!(f, "repeats: {repeats}"),
            StateChange::Gain(gain) => write!(f, "gain: {gain:.2}"),
            StateChange::Topology(topology) => write!(f, "topology: {topology:?}"),
            StateChange::Decay(policy) => {
                write!(f, "decay: ratio {:.2}, floor {}dB", policy.ratio, policy.floor_db)
            }
        }
    }
}
