use crate::{
    dsp::decay::DecayPolicy, error::EchoError, graph::Topology, MAX_DELAY_TIME, MAX_REPEATS,
};

/// User-facing echo settings. Lives as long as the session that owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EchoConfig {
    /// Seconds between repeats.
    pub delay_time: f32,
    pub repeat_count: usize,
    /// Master volume; the first repeat plays at exactly this gain.
    pub output_gain: f32,
    pub topology: Topology,
    pub decay: DecayPolicy,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            delay_time: 2.0,
            repeat_count: 3,
            output_gain: 1.0,
            topology: Topology::default(),
            decay: DecayPolicy::default(),
        }
    }
}

impl EchoConfig {
    pub fn with_delay_time(mut self, seconds: f32) -> Self {
        self.delay_time = seconds;
        self
    }

    pub fn with_repeat_count(mut self, repeats: usize) -> Self {
        self.repeat_count = repeats;
        self
    }

    pub fn with_output_gain(mut self, gain: f32) -> Self {
        self.output_gain = gain;
        self
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_decay(mut self, decay: DecayPolicy) -> Self {
        self.decay = decay;
        self
    }

    pub fn validate(&self) -> Result<(), EchoError> {
        check_delay_time(self.delay_time)?;
        check_repeat_count(self.repeat_count)?;
        check_output_gain(self.output_gain)?;
        self.decay.validate()
    }
}

pub(crate) fn check_delay_time(seconds: f32) -> Result<(), EchoError> {
    if seconds.is_finite() && seconds > 0.0 && seconds <= MAX_DELAY_TIME {
        Ok(())
    } else {
        Err(EchoError::InvalidParameter(format!(
            "delay_time must be in (0, {MAX_DELAY_TIME}] seconds, got {seconds}"
        )))
    }
}

pub(crate) fn check_repeat_count(repeats: usize) -> Result<(), EchoError> {
    if (1..=MAX_REPEATS).contains(&repeats) {
        Ok(())
    } else {
        Err(EchoError::InvalidParameter(format!(
            "repeat_count must be in 1..={MAX_REPEATS}, got {repeats}"
        )))
    }
}

pub(crate) fn check_output_gain(gain: f32) -> Result<(), EchoError> {
    if gain.is_finite() && gain >= 0.0 {
        Ok(())
    } else {
        Err(EchoError::InvalidParameter(format!(
            "output_gain must be >= 0, got {gain}"
        )))
    }
}
