use std::mem;

use tracing::{debug, info, warn};

use crate::{
    dsp::decay::{DecayMap, DecayPolicy},
    error::{CaptureError, EchoError},
    graph::{AudioContext, EchoChainBuilder, EchoGraph, EchoParams, NodeId, Topology},
    session::{
        capture::{ContextProvider, MediaSource, PendingCapture},
        config::{check_delay_time, check_output_gain, check_repeat_count, EchoConfig},
        observer::{Observer, Observers, SubscriptionId},
        state::{SessionState, StateChange},
    },
};

/// Drives one live echo: acquires the microphone, builds the echo graph,
/// applies live edits and tears everything down again.
///
/// Edits made while idle only update the configuration; the next start
/// builds from it. While recording, gain and decay edits (and delay edits
/// that keep the same number of segments) retune the running graph in
/// place. Anything that changes the node layout tears the graph down and
/// builds a new one on the same context and source.
pub struct EchoSession<M, P>
where
    M: MediaSource,
    P: ContextProvider<M::Capture>,
{
    media: M,
    provider: P,
    config: EchoConfig,
    decay: DecayMap,
    state: SessionState,
    phase: Phase<M::Capture, P::Context>,
    observers: Observers,
}

enum Phase<Cap, Ctx> {
    Idle,
    Starting {
        pending: PendingCapture<Cap>,
        cancelled: bool,
    },
    Active(Active<Cap, Ctx>),
}

struct Active<Cap, Ctx> {
    capture: Cap,
    context: Ctx,
    graph: EchoGraph,
}

fn build_graph<C: AudioContext + ?Sized>(
    config: &EchoConfig,
    decay: &DecayMap,
    ctx: &mut C,
    source: NodeId,
) -> Result<EchoGraph, EchoError> {
    let params = EchoParams {
        delay_time: config.delay_time,
        repeat_count: config.repeat_count,
        output_gain: config.output_gain,
        decay,
    };
    EchoChainBuilder::new(config.topology).build(ctx, source, &params)
}

impl<M, P> EchoSession<M, P>
where
    M: MediaSource,
    P: ContextProvider<M::Capture>,
{
    pub fn new(media: M, provider: P, config: EchoConfig) -> Result<Self, EchoError> {
        config.validate()?;
        Ok(Self {
            media,
            provider,
            decay: config.decay.generate(config.repeat_count),
            config,
            state: SessionState::Idle,
            phase: Phase::Idle,
            observers: Observers::default(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn config(&self) -> &EchoConfig {
        &self.config
    }

    pub fn decay_map(&self) -> &DecayMap {
        &self.decay
    }

    /// The live graph, while recording.
    pub fn graph(&self) -> Option<&EchoGraph> {
        match &self.phase {
            Phase::Active(active) => Some(&active.graph),
            _ => None,
        }
    }

    /// The open processing context, while recording.
    pub fn context(&self) -> Option<&P::Context> {
        match &self.phase {
            Phase::Active(active) => Some(&active.context),
            _ => None,
        }
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn subscribe<O>(&mut self, observer: O) -> SubscriptionId
    where
        O: Observer + Send + 'static,
    {
        self.observers.subscribe(Box::new(observer))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Acquire the microphone and start echoing. Blocks until the capture
    /// resolves. A no-op while already recording.
    pub fn start(&mut self) -> Result<(), EchoError> {
        self.begin_start()?;
        self.wait_start()
    }

    /// Request the microphone without waiting for it. Follow with
    /// [`poll_start`](Self::poll_start) or [`wait_start`](Self::wait_start).
    pub fn begin_start(&mut self) -> Result<(), EchoError> {
        if self.state.is_busy() {
            return Err(EchoError::OperationInProgress);
        }
        if self.state == SessionState::Recording {
            return Ok(());
        }

        debug!("requesting capture");
        let pending = self.media.acquire();
        self.phase = Phase::Starting {
            pending,
            cancelled: false,
        };
        self.set_state(SessionState::Starting);
        Ok(())
    }

    /// Finish a start if the capture has resolved. Returns `Ok(false)` while
    /// it is still pending and `Ok(true)` once no start is outstanding.
    pub fn poll_start(&mut self) -> Result<bool, EchoError> {
        let result = match &self.phase {
            Phase::Starting { pending, .. } => match pending.try_resolve() {
                Some(result) => result,
                None => return Ok(false),
            },
            _ => return Ok(true),
        };
        let cancelled = matches!(self.phase, Phase::Starting { cancelled: true, .. });
        self.phase = Phase::Idle;
        self.finish_start(result, cancelled).map(|()| true)
    }

    /// Block until an outstanding start completes.
    pub fn wait_start(&mut self) -> Result<(), EchoError> {
        match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Starting { pending, cancelled } => self.finish_start(pending.wait(), cancelled),
            other => {
                self.phase = other;
                Ok(())
            }
        }
    }

    /// Stop echoing and give the microphone back. A no-op while idle.
    ///
    /// While a start is outstanding this only marks it cancelled: the capture
    /// is released as soon as it arrives and the session returns to idle.
    pub fn stop(&mut self) -> Result<(), EchoError> {
        match self.state {
            SessionState::Idle => Ok(()),
            SessionState::Stopping => Err(EchoError::OperationInProgress),
            SessionState::Starting => {
                if let Phase::Starting { cancelled, .. } = &mut self.phase {
                    *cancelled = true;
                }
                info!("stop requested while starting");
                Ok(())
            }
            SessionState::Recording => {
                self.shutdown();
                Ok(())
            }
        }
    }

    /// Start when idle, stop otherwise.
    pub fn toggle(&mut self) -> Result<(), EchoError> {
        match self.state {
            SessionState::Idle => self.start(),
            _ => self.stop(),
        }
    }

    pub fn set_delay_time(&mut self, seconds: f32) -> Result<(), EchoError> {
        check_delay_time(seconds)?;
        self.config.delay_time = seconds;
        let result = self.apply_delay_time();
        self.observers.publish(StateChange::DelayTime(seconds));
        result
    }

    pub fn set_repeat_count(&mut self, repeats: usize) -> Result<(), EchoError> {
        check_repeat_count(repeats)?;
        if repeats == self.config.repeat_count {
            return Ok(());
        }
        self.config.repeat_count = repeats;
        self.decay = self.config.decay.generate(repeats);
        let result = if self.config.topology.depends_on_repeats() {
            self.rebuild("repeat count changed")
        } else {
            Ok(())
        };
        self.observers.publish(StateChange::RepeatCount(repeats));
        result
    }

    pub fn set_gain(&mut self, gain: f32) -> Result<(), EchoError> {
        check_output_gain(gain)?;
        self.config.output_gain = gain;
        let result = self.apply_gains();
        self.observers.publish(StateChange::Gain(gain));
        result
    }

    pub fn set_topology(&mut self, topology: Topology) -> Result<(), EchoError> {
        if topology == self.config.topology {
            return Ok(());
        }
        self.config.topology = topology;
        let result = self.rebuild("topology changed");
        self.observers.publish(StateChange::Topology(topology));
        result
    }

    pub fn set_decay_policy(&mut self, policy: DecayPolicy) -> Result<(), EchoError> {
        policy.validate()?;
        self.config.decay = policy;
        self.decay = policy.generate(self.config.repeat_count);
        let result = self.apply_gains();
        self.observers.publish(StateChange::Decay(policy));
        result
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            self.state = state;
            self.observers.publish(StateChange::State(state));
        }
    }

    fn finish_start(
        &mut self,
        result: Result<M::Capture, CaptureError>,
        cancelled: bool,
    ) -> Result<(), EchoError> {
        let mut capture = match result {
            Ok(capture) => capture,
            Err(err) if cancelled => {
                debug!(error = %err, "cancelled start resolved without a capture");
                self.set_state(SessionState::Idle);
                return Ok(());
            }
            Err(err) => {
                warn!(error = %err, "capture unavailable");
                self.set_state(SessionState::Idle);
                return Err(err.into());
            }
        };

        if cancelled {
            info!("start was cancelled; releasing capture");
            self.media.release(capture);
            self.set_state(SessionState::Idle);
            return Ok(());
        }

        let (mut context, source) = match self.provider.open(&mut capture) {
            Ok(opened) => opened,
            Err(err) => {
                warn!(error = %err, "could not open processing context");
                self.media.release(capture);
                self.set_state(SessionState::Idle);
                return Err(err.into());
            }
        };

        let graph = match build_graph(&self.config, &self.decay, &mut context, source) {
            Ok(graph) => graph,
            Err(err) => {
                warn!(error = %err, "echo graph build failed");
                context.close();
                self.media.release(capture);
                self.set_state(SessionState::Idle);
                return Err(err);
            }
        };

        info!(
            delay_time = self.config.delay_time,
            repeat_count = self.config.repeat_count,
            topology = ?self.config.topology,
            nodes = graph.node_count(),
            "echo session recording"
        );
        self.phase = Phase::Active(Active {
            capture,
            context,
            graph,
        });
        self.set_state(SessionState::Recording);
        self.observers.publish(StateChange::Recording(true));
        Ok(())
    }

    fn apply_delay_time(&mut self) -> Result<(), EchoError> {
        let Phase::Active(active) = &mut self.phase else {
            return Ok(());
        };
        match active.graph.retime(&mut active.context, self.config.delay_time) {
            Ok(true) => {
                debug!(delay_time = self.config.delay_time, "delay retimed in place");
                Ok(())
            }
            Ok(false) => self.rebuild("delay segment count changed"),
            Err(err) => {
                warn!(error = %err, "in-place retime failed; rebuilding");
                self.rebuild("delay retime failed")
            }
        }
    }

    fn apply_gains(&mut self) -> Result<(), EchoError> {
        let Phase::Active(active) = &mut self.phase else {
            return Ok(());
        };
        match active
            .graph
            .set_output_gain(&mut active.context, self.config.output_gain, &self.decay)
        {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(error = %err, "in-place gain rewrite failed; rebuilding");
                self.rebuild("gain rewrite failed")
            }
        }
    }

    /// Replace the live graph with one built from the current configuration.
    /// A failed build stops the session.
    fn rebuild(&mut self, reason: &'static str) -> Result<(), EchoError> {
        let Phase::Active(active) = &mut self.phase else {
            return Ok(());
        };

        let source = active.graph.source();
        active.graph.teardown(&mut active.context);
        match build_graph(&self.config, &self.decay, &mut active.context, source) {
            Ok(graph) => {
                debug!(reason, nodes = graph.node_count(), "echo graph rebuilt");
                active.graph = graph;
                Ok(())
            }
            Err(err) => {
                warn!(reason, error = %err, "rebuild failed; stopping session");
                self.shutdown();
                Err(err)
            }
        }
    }

    fn shutdown(&mut self) {
        self.set_state(SessionState::Stopping);
        if let Phase::Active(mut active) = mem::replace(&mut self.phase, Phase::Idle) {
            active.graph.teardown(&mut active.context);
            active.context.close();
            self.media.release(active.capture);
        }
        self.set_state(SessionState::Idle);
        self.observers.publish(StateChange::Recording(false));
        info!("echo session stopped");
    }
}

impl<M, P> Drop for EchoSession<M, P>
where
    M: MediaSource,
    P: ContextProvider<M::Capture>,
{
    fn drop(&mut self) {
        match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Active(active) => {
                self.phase = Phase::Active(active);
                self.shutdown();
            }
            Phase::Starting { pending, .. } => {
                if let Some(Ok(capture)) = pending.try_resolve() {
                    self.media.release(capture);
                }
            }
            Phase::Idle => {}
        }
    }
}
