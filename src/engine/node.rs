use rtrb::Consumer;

use crate::{
    dsp::{amplify::GainRamp, delay::DelayLine},
    graph::NodeKind,
    MAX_BLOCK_SIZE,
};

pub(crate) enum Processor {
    Source,
    Sink,
    Delay { line: DelayLine, samples: usize },
    Gain(GainRamp),
}

/// A node as the renderer sees it: a processor plus its output buffer.
///
/// Built on the control thread, so every buffer is already allocated by the
/// time the renderer receives it.
pub struct RenderNode {
    processor: Processor,
    out: Vec<f32>,
}

impl RenderNode {
    fn with(processor: Processor) -> Self {
        Self {
            processor,
            out: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub(crate) fn source() -> Self {
        Self::with(Processor::Source)
    }

    pub(crate) fn sink() -> Self {
        Self::with(Processor::Sink)
    }

    pub(crate) fn delay(max_samples: usize, samples: usize) -> Self {
        Self::with(Processor::Delay {
            line: DelayLine::with_max_delay(max_samples),
            samples: samples.min(max_samples),
        })
    }

    pub(crate) fn gain(gain: f32) -> Self {
        Self::with(Processor::Gain(GainRamp::new(gain)))
    }

    pub fn kind(&self) -> NodeKind {
        match self.processor {
            Processor::Source => NodeKind::Source,
            Processor::Sink => NodeKind::Sink,
            Processor::Delay { .. } => NodeKind::Delay,
            Processor::Gain(_) => NodeKind::Gain,
        }
    }

    pub(crate) fn output(&self, frames: usize) -> &[f32] {
        &self.out[..frames]
    }

    pub(crate) fn set_gain(&mut self, gain: f32, ramp_samples: u32) {
        if let Processor::Gain(ramp) = &mut self.processor {
            ramp.set_target(gain, ramp_samples);
        }
    }

    pub(crate) fn set_delay(&mut self, delay_samples: usize) {
        if let Processor::Delay { line, samples } = &mut self.processor {
            *samples = delay_samples.min(line.max_delay());
        }
    }

    /// Fill this node's output from the summed input of its predecessors.
    /// The source ignores `input` and reads the capture ring instead.
    pub(crate) fn process(&mut self, input: &[f32], capture: &mut Consumer<f32>) {
        let frames = input.len();
        let out = &mut self.out[..frames];

        match &mut self.processor {
            Processor::Source => {
                // Underrun plays silence rather than stalling the graph.
                for sample in out.iter_mut() {
                    *sample = capture.pop().unwrap_or(0.0);
                }
            }
            Processor::Sink => out.copy_from_slice(input),
            Processor::Delay { line, samples } => {
                out.copy_from_slice(input);
                line.render(out, *samples);
            }
            Processor::Gain(ramp) => {
                out.copy_from_slice(input);
                ramp.process(out);
            }
        }
    }
}
