//! cpal glue: the microphone as a media source, the speakers plus the render
//! engine as a processing context.

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};

use saavy_echo::{
    dsp::mix::hard_clip,
    engine::{self, EngineContext},
    graph::{AudioContext, NodeId},
    session::{ContextProvider, EchoConfig, EchoSession, MediaSource, PendingCapture},
    CaptureError, ContextError, DEFAULT_DELAY_CAPACITY, MAX_BLOCK_SIZE,
};

/// Microphone samples buffered between the input and output callbacks.
const CAPTURE_RING_SECONDS: f32 = 0.5;

pub type DeviceSession = EchoSession<Microphone, Speakers>;

/// Open the default devices and wrap them in an idle session.
pub fn open_session(config: EchoConfig) -> EyreResult<DeviceSession> {
    let host = cpal::default_host();
    let output = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let output_config = output
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = output_config.sample_rate().0;
    let channels = output_config.channels() as usize;

    println!("=== saavy-echo ===");
    println!("Output: {}", output.name().unwrap_or_else(|_| "unknown".into()));
    println!("Sample rate: {} Hz", sample_rate);
    println!("Channels: {}", channels);
    println!();

    let microphone = Microphone { host, sample_rate };
    let speakers = Speakers {
        device: output,
        config: output_config.into(),
        delay_capacity: DEFAULT_DELAY_CAPACITY,
    };
    EchoSession::new(microphone, speakers, config).wrap_err("invalid echo configuration")
}

/// A running input stream and the ring it fills with mono samples.
pub struct MicCapture {
    stream: cpal::Stream,
    tap: Option<Consumer<f32>>,
}

/// Default input device, opened at the output's sample rate so the engine
/// never has to resample.
pub struct Microphone {
    host: cpal::Host,
    sample_rate: u32,
}

impl Microphone {
    fn open(&self) -> Result<MicCapture, CaptureError> {
        let device = self
            .host
            .default_input_device()
            .ok_or(CaptureError::NoDevice)?;
        let rate = cpal::SampleRate(self.sample_rate);
        let supported = device
            .supported_input_configs()
            .map_err(|err| CaptureError::Device(err.to_string()))?
            .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
            .find(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
            .ok_or_else(|| {
                CaptureError::Device(format!("input cannot run at {} Hz as f32", self.sample_rate))
            })?;
        let config: cpal::StreamConfig = supported.with_sample_rate(rate).into();
        let channels = config.channels as usize;

        let ring = (CAPTURE_RING_SECONDS * self.sample_rate as f32) as usize;
        let (mut producer, consumer) = RingBuffer::<f32>::new(ring.max(MAX_BLOCK_SIZE));

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _| {
                    // Downmix to mono; drop samples when the engine falls behind.
                    for frame in data.chunks(channels) {
                        let sample = frame.iter().sum::<f32>() / channels as f32;
                        let _ = producer.push(sample);
                    }
                },
                |err| tracing::error!(error = %err, "input stream error"),
                None,
            )
            .map_err(|err| match err {
                cpal::BuildStreamError::DeviceNotAvailable => CaptureError::NoDevice,
                other => CaptureError::Device(other.to_string()),
            })?;
        stream
            .play()
            .map_err(|err| CaptureError::Device(err.to_string()))?;

        tracing::info!(channels, sample_rate = self.sample_rate, "microphone open");
        Ok(MicCapture {
            stream,
            tap: Some(consumer),
        })
    }
}

impl MediaSource for Microphone {
    type Capture = MicCapture;

    fn acquire(&mut self) -> PendingCapture<MicCapture> {
        match self.open() {
            Ok(capture) => PendingCapture::ready(capture),
            Err(err) => PendingCapture::failed(err),
        }
    }

    fn release(&mut self, capture: MicCapture) {
        if let Err(err) = capture.stream.pause() {
            tracing::warn!(error = %err, "failed to pause input stream");
        }
        tracing::info!("microphone released");
    }
}

/// Default output device. Each session gets a fresh engine and stream.
pub struct Speakers {
    device: cpal::Device,
    config: cpal::StreamConfig,
    delay_capacity: f32,
}

impl ContextProvider<MicCapture> for Speakers {
    type Context = DeviceContext;

    fn open(&mut self, capture: &mut MicCapture) -> Result<(DeviceContext, NodeId), CaptureError> {
        let tap = capture
            .tap
            .take()
            .ok_or_else(|| CaptureError::ContextUnavailable("capture already in use".into()))?;

        let sample_rate = self.config.sample_rate.0 as f32;
        let channels = self.config.channels as usize;
        let (engine, mut renderer) = engine::open(sample_rate, self.delay_capacity, tap);
        let mut mono = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _| {
                    let total_frames = data.len() / channels;
                    let mut frames_written = 0;

                    while frames_written < total_frames {
                        let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                        let block = &mut mono[..frames];
                        renderer.render(block);
                        hard_clip(block);

                        // Mono to all channels
                        let out_off = frames_written * channels;
                        for (i, &s) in block.iter().enumerate() {
                            for ch in 0..channels {
                                data[out_off + i * channels + ch] = s;
                            }
                        }

                        frames_written += frames;
                    }
                },
                |err| tracing::error!(error = %err, "output stream error"),
                None,
            )
            .map_err(|err| CaptureError::ContextUnavailable(err.to_string()))?;
        stream
            .play()
            .map_err(|err| CaptureError::ContextUnavailable(err.to_string()))?;

        let source = engine.source();
        Ok((DeviceContext { engine, stream }, source))
    }
}

/// The engine's control half plus the output stream driving its renderer.
pub struct DeviceContext {
    engine: EngineContext,
    stream: cpal::Stream,
}

impl AudioContext for DeviceContext {
    fn delay_capacity(&self) -> f32 {
        self.engine.delay_capacity()
    }

    fn sink(&self) -> NodeId {
        self.engine.sink()
    }

    fn create_delay(&mut self, seconds: f32) -> Result<NodeId, ContextError> {
        self.engine.create_delay(seconds)
    }

    fn create_gain(&mut self, gain: f32) -> Result<NodeId, ContextError> {
        self.engine.create_gain(gain)
    }

    fn set_delay_time(&mut self, node: NodeId, seconds: f32) -> Result<(), ContextError> {
        self.engine.set_delay_time(node, seconds)
    }

    fn set_gain(&mut self, node: NodeId, gain: f32) -> Result<(), ContextError> {
        self.engine.set_gain(node, gain)
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), ContextError> {
        self.engine.connect(from, to)
    }

    fn disconnect(&mut self, node: NodeId) {
        self.engine.disconnect(node)
    }

    fn release(&mut self, node: NodeId) {
        self.engine.release(node)
    }

    fn close(&mut self) {
        self.engine.close();
        if let Err(err) = self.stream.pause() {
            tracing::warn!(error = %err, "failed to pause output stream");
        }
    }
}
