//! Per-repeat volume decay curves.

/*
Echo Decay
==========

Each repeat of an echo should sound quieter than the one before, the way a
shout fades across a valley.


Equal Steps Are Ratios
----------------------

Subtracting a fixed amount per repeat sounds wrong: the first steps are
barely noticed and the last ones drop off a cliff.

    linear:   1.0, 0.75, 0.5, 0.25, 0.0     (last repeat vanishes)

Hearing is logarithmic (see amplify.rs), so an even fade multiplies by a
constant ratio r per repeat, which is a constant number of decibels:

    gain[i] = r^i

    r = 0.6:  1.0, 0.6, 0.36, 0.216, 0.13   (≈ -4.4 dB per repeat)


Keeping Long Tails Audible
--------------------------

A fixed ratio underflows for many repeats: 0.6^30 ≈ 2e-7 (-134 dB), so the
back half of a 30-repeat echo would be silent nodes burning CPU.

The curve therefore has a floor. If the last repeat would land below it,
the ratio is stretched so the last repeat sits exactly on the floor:

    r = max(ratio, floor^(1 / (repeats - 1)))

    repeats = 3,  ratio 0.6, floor -60 dB  →  r = 0.6     (0.36 ≫ 0.001)
    repeats = 30, ratio 0.6, floor -60 dB  →  r ≈ 0.788   (last = 0.001)

The curve always starts at 1.0, never increases, and never reaches 0.
*/

use crate::{dsp::amplify::from_db, error::EchoError};

/// Shape of the per-repeat decay curve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecayPolicy {
    /// Gain ratio between consecutive repeats, in (0, 1].
    pub ratio: f32,
    /// Quietest level the last repeat may reach, in dB (negative).
    pub floor_db: f32,
}

impl DecayPolicy {
    pub const DEFAULT_RATIO: f32 = 0.6;
    pub const DEFAULT_FLOOR_DB: f32 = -60.0;

    pub fn new(ratio: f32, floor_db: f32) -> Result<Self, EchoError> {
        let policy = Self { ratio, floor_db };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), EchoError> {
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(EchoError::InvalidParameter(format!(
                "decay ratio must be in (0, 1], got {}",
                self.ratio
            )));
        }
        if !(self.floor_db.is_finite() && self.floor_db < 0.0) {
            return Err(EchoError::InvalidParameter(format!(
                "decay floor must be a finite negative dB value, got {}",
                self.floor_db
            )));
        }
        Ok(())
    }

    /// Effective per-repeat ratio for `repeat_count` repeats.
    pub fn ratio_for(&self, repeat_count: usize) -> f32 {
        if repeat_count <= 1 {
            return self.ratio;
        }
        let floor = from_db(self.floor_db);
        let stretched = floor.powf(1.0 / (repeat_count - 1) as f32);
        self.ratio.max(stretched)
    }

    /// Build the multiplier for each of `repeat_count` repeats.
    pub fn generate(&self, repeat_count: usize) -> DecayMap {
        let r = self.ratio_for(repeat_count);
        let gains = (0..repeat_count).map(|i| r.powi(i as i32)).collect();
        DecayMap { gains }
    }
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            ratio: Self::DEFAULT_RATIO,
            floor_db: Self::DEFAULT_FLOOR_DB,
        }
    }
}

/// Gain multiplier per repeat, loudest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecayMap {
    gains: Vec<f32>,
}

impl DecayMap {
    /// Decay map for `repeat_count` repeats under the default policy.
    pub fn generate(repeat_count: usize) -> Self {
        DecayPolicy::default().generate(repeat_count)
    }

    pub fn len(&self) -> usize {
        self.gains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gains.is_empty()
    }

    pub fn get(&self, repeat: usize) -> Option<f32> {
        self.gains.get(repeat).copied()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.gains
    }
}

impl From<Vec<f32>> for DecayMap {
    fn from(gains: Vec<f32>) -> Self {
        Self { gains }
    }
}
