//! Gain application and click-free gain changes.

/*
Gain
====

Gain is a multiplier applied to every sample of a signal.

    gain > 1.0  →  louder (amplification)
    gain = 1.0  →  unchanged (unity gain)
    gain < 1.0  →  quieter (attenuation)
    gain = 0.0  →  silence


Attenuation in Decibels
-----------------------

Human hearing is logarithmic: we perceive loudness ratios, not differences.

    dB = 20 × log₁₀(amplitude_ratio)

    ×1.0   =   0 dB  (unity)
    ×0.5   =  -6 dB  (noticeably quieter)
    ×0.1   = -20 dB  (much quieter)
    ×0.001 = -60 dB  (at the edge of audibility)


Zipper Noise
------------

Jumping a gain from 1.0 to 0.2 between two samples puts a step into the
waveform, which is heard as a click. Dragging a volume control produces a
stream of such steps ("zipper noise").

The fix is to ramp: move from the current gain to the target over a few
milliseconds, one small step per sample.

    target = 0.2, ramp = 4 samples
    gains:   1.0 → 0.8 → 0.6 → 0.4 → 0.2 → 0.2 → ...

10 ms is short enough to feel instant and long enough to be inaudible.
*/

/// Multiply a signal by a constant gain factor (in-place).
#[inline]
pub fn apply_gain(signal: &mut [f32], gain: f32) {
    for sample in signal.iter_mut() {
        *sample *= gain;
    }
}

/// Convert a linear amplitude ratio to decibels.
#[inline]
pub fn to_db(gain: f32) -> f32 {
    20.0 * gain.log10()
}

/// Convert decibels to a linear amplitude ratio.
#[inline]
pub fn from_db(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// A gain that glides linearly to new targets instead of jumping.
#[derive(Debug, Clone, Copy)]
pub struct GainRamp {
    current: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl GainRamp {
    /// Start settled at `gain`.
    pub fn new(gain: f32) -> Self {
        Self {
            current: gain,
            target: gain,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Glide to `target` over `ramp_samples` samples (0 = jump).
    pub fn set_target(&mut self, target: f32, ramp_samples: u32) {
        self.target = target;
        if ramp_samples == 0 {
            self.current = target;
            self.step = 0.0;
            self.remaining = 0;
        } else {
            self.step = (target - self.current) / ramp_samples as f32;
            self.remaining = ramp_samples;
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }

    /// Apply the (possibly moving) gain to a block in-place.
    pub fn process(&mut self, signal: &mut [f32]) {
        if self.remaining == 0 {
            apply_gain(signal, self.current);
            return;
        }

        for sample in signal.iter_mut() {
            if self.remaining > 0 {
                self.current += self.step;
                self.remaining -= 1;
                if self.remaining == 0 {
                    // land exactly, no accumulated float error
                    self.current = self.target;
                }
            }
            *sample *= self.current;
        }
    }
}
