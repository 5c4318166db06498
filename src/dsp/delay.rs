//! Bounded time-domain delay line.

/*
Delay Lines
===========

A delay line remembers the last N samples of a signal and plays them back
later. It is the only piece of memory an echo needs.

  write_pos     Where the next incoming sample is stored. Advances by one
                every sample and wraps around the end of the buffer.

  read_pos      write_pos minus the delay, wrapped. The sample found there
                was written `delay` samples ago.

    buffer:  [ s5 | s6 | s7 | s0 | s1 | s2 | s3 | s4 ]
                          ^write            ^read (delay = 4)


Bounded Capacity
----------------

A delay line is allocated once for its maximum delay. Asking for more than
that is clamped, never reallocated: the audio thread must not allocate.
Longer delays are built by chaining several lines in series, each holding
at most its capacity:

    2.5s at 1s capacity:   [1.0s] ──→ [1.0s] ──→ [0.5s]

The chained delays add up exactly because each stage sees the previous
stage's output as its input.
*/

/// Convert a duration in seconds to a whole number of samples.
#[inline]
pub fn seconds_to_samples(seconds: f32, sample_rate: f32) -> usize {
    (seconds.max(0.0) * sample_rate).round() as usize
}

pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Allocate a line able to delay by up to `max_delay_samples`.
    pub fn with_max_delay(max_delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay_samples + 1],
            write_pos: 0,
        }
    }

    /// Longest delay (in samples) this line can produce.
    pub fn max_delay(&self) -> usize {
        self.buffer.len() - 1
    }

    pub fn next_sample(&mut self, sample: f32, delay_samples: usize) -> f32 {
        let len = self.buffer.len();
        let delay_samples = delay_samples.min(len - 1);

        self.buffer[self.write_pos] = sample;

        let read_pos = (self.write_pos + len - delay_samples) % len;

        let delayed = self.buffer[read_pos];

        self.write_pos = (self.write_pos + 1) % len;

        delayed
    }

    pub fn render(&mut self, buffer: &mut [f32], delay_samples: usize) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, delay_samples);
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
