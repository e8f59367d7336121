use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, SystemTime};

use acqsync_frame::{Marker, SampleBlock};
use acqsync_marker::{
    BlockWindow, ListenerConfig, MarkerListener, MergeMode, StaleMarker, Synchronizer,
    TimedMarker, DEFAULT_SETTLE_DELAY,
};
use acqsync_store::{SessionMetadata, SessionPaths, SessionSink};
use tracing::{debug, info, warn, Span};

use crate::amplifier::Amplifier;
use crate::error::{Result, SessionError};

/// Configuration for an acquisition session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Marker listener settings.
    pub listener: ListenerConfig,
    /// Pause before each marker merge.
    pub settle_delay: Duration,
    /// Latency measurement mode: device markers are dropped and network
    /// markers are reported with their receive time in
    /// [`MergedBlock::network_timestamps`] instead of being placed on samples.
    pub debug_network_only: bool,
    /// Span all session and listener events are recorded in.
    pub span: Span,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            debug_network_only: false,
            span: Span::none(),
        }
    }
}

/// Lifecycle of a session. A stopped session cannot be restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
        })
    }
}

/// One block of samples with its merged markers.
#[derive(Debug, Clone)]
pub struct MergedBlock {
    pub samples: SampleBlock,
    /// Device and network markers, ascending by offset within `samples`.
    pub markers: Vec<Marker>,
    /// Index of the block's first row within the session.
    pub first_sample: u64,
    /// Network markers that arrived too late and were moved to offset 0.
    pub stale: Vec<StaleMarker>,
    /// Network markers with their receive time. Only filled when
    /// `debug_network_only` is set.
    pub network_timestamps: Vec<TimedMarker>,
}

impl MergedBlock {
    /// Whether `markers[index]` is a network marker clamped to the first
    /// sample.
    pub fn is_stale(&self, index: usize) -> bool {
        self.stale.iter().any(|stale| stale.index == index)
    }
}

/// Resources held while a session is running.
struct Active {
    sync: Synchronizer,
    listener: MarkerListener,
    sink: Option<SessionSink>,
    received: u64,
    block_start: SystemTime,
}

enum Stage {
    Idle,
    Running(Box<Active>),
    Stopped,
}

impl Stage {
    fn state(&self) -> SessionState {
        match self {
            Stage::Idle => SessionState::Idle,
            Stage::Running(_) => SessionState::Running,
            Stage::Stopped => SessionState::Stopped,
        }
    }
}

/// An amplifier wrapped with network marker merging and optional recording.
pub struct Acquisition<A> {
    amp: A,
    config: SessionConfig,
    stage: Stage,
}

impl<A: Amplifier> Acquisition<A> {
    pub fn new(amp: A, config: SessionConfig) -> Self {
        Self {
            amp,
            config,
            stage: Stage::Idle,
        }
    }

    /// Start the session.
    ///
    /// With `persist`, the files `<persist>.eeg`, `.marker` and `.meta` are
    /// created first; if any of them exists the session fails before the
    /// listener or the amplifier is touched. Then the marker listener is
    /// started and the amplifier is started last.
    pub fn start(&mut self, persist: Option<&Path>) -> Result<()> {
        if !matches!(self.stage, Stage::Idle) {
            return Err(self.invalid("start"));
        }
        let span = self.config.span.clone();
        let _enter = span.enter();

        let sink = match persist {
            Some(base) => {
                let metadata = SessionMetadata::new(
                    self.amp.channels(),
                    self.amp.sampling_frequency(),
                    self.amp.name(),
                );
                Some(SessionSink::create(
                    SessionPaths::from_base(base),
                    &metadata,
                )?)
            }
            None => None,
        };

        let mode = if self.config.debug_network_only {
            MergeMode::NetworkOnly
        } else {
            MergeMode::Combined
        };
        let sync = Synchronizer::new(self.amp.sampling_frequency())
            .with_settle_delay(self.config.settle_delay)
            .with_mode(mode);

        let listener = match MarkerListener::spawn(
            self.config.listener.clone(),
            sync.queue().sender(),
            span.clone(),
        ) {
            Ok(listener) => listener,
            Err(err) => {
                discard(sink);
                return Err(err.into());
            }
        };

        let block_start = SystemTime::now();
        if let Err(err) = self.amp.start() {
            if let Err(stop_err) = listener.shutdown() {
                warn!(error = %stop_err, "marker listener did not stop cleanly");
            }
            discard(sink);
            return Err(err.into());
        }

        info!(
            amp = self.amp.name(),
            marker_addr = %listener.local_addr(),
            persist = ?persist,
            ?mode,
            "acquisition started"
        );
        self.stage = Stage::Running(Box::new(Active {
            sync,
            listener,
            sink,
            received: 0,
            block_start,
        }));
        Ok(())
    }

    /// Fetch the next block from the amplifier and merge pending markers
    /// into it. When recording, the block is written before it is returned.
    pub fn poll(&mut self) -> Result<MergedBlock> {
        let active = match &mut self.stage {
            Stage::Running(active) => active,
            other => {
                return Err(SessionError::InvalidState {
                    operation: "poll",
                    state: other.state(),
                })
            }
        };
        let _enter = self.config.span.enter();

        let mut samples = self.amp.get_data()?;
        let block_end = SystemTime::now();
        let window = BlockWindow::new(active.block_start, block_end);
        active.block_start = block_end;

        let device_markers = samples.take_markers();
        let outcome = active.sync.synchronize(window, device_markers);

        let first_sample = active.received;
        if let Some(sink) = active.sink.as_mut() {
            sink.write_block(&samples, &outcome.markers, first_sample)?;
        }
        active.received += samples.len() as u64;

        if !outcome.markers.is_empty() || !outcome.timestamps.is_empty() {
            debug!(
                first_sample,
                markers = outcome.markers.len(),
                stale = outcome.stale.len(),
                timestamped = outcome.timestamps.len(),
                "merged markers into block"
            );
        }
        Ok(MergedBlock {
            samples,
            markers: outcome.markers,
            first_sample,
            stale: outcome.stale,
            network_timestamps: outcome.timestamps,
        })
    }

    /// Stop the amplifier, the marker listener and the recording, in that
    /// order.
    ///
    /// All three are attempted even if one fails; the first failure is
    /// returned. The session is stopped afterwards either way.
    pub fn stop(&mut self) -> Result<()> {
        let active = match std::mem::replace(&mut self.stage, Stage::Stopped) {
            Stage::Running(active) => active,
            other => {
                self.stage = other;
                return Err(self.invalid("stop"));
            }
        };
        let span = self.config.span.clone();
        let _enter = span.enter();
        let Active {
            listener,
            sink,
            received,
            ..
        } = *active;

        let amp_result = self.amp.stop().map_err(SessionError::from);
        let listener_result = listener.shutdown().map_err(SessionError::from);
        let sink_result = match sink {
            Some(sink) => sink.close().map_err(SessionError::from),
            None => Ok(()),
        };

        for err in [&amp_result, &listener_result, &sink_result]
            .into_iter()
            .filter_map(|result| result.as_ref().err())
        {
            warn!(error = %err, "failed to release session resource");
        }
        info!(samples = received, "acquisition stopped");

        amp_result.and(listener_result).and(sink_result)
    }

    /// Pass settings to the amplifier. Only allowed before the session starts.
    pub fn configure(&mut self, config: A::Config) -> Result<()> {
        if !matches!(self.stage, Stage::Idle) {
            return Err(self.invalid("configure"));
        }
        Ok(self.amp.configure(config)?)
    }

    pub fn channels(&self) -> Vec<String> {
        self.amp.channels()
    }

    pub fn sampling_frequency(&self) -> f64 {
        self.amp.sampling_frequency()
    }

    pub fn state(&self) -> SessionState {
        self.stage.state()
    }

    /// Address the marker listener is bound to, while running.
    pub fn marker_addr(&self) -> Option<SocketAddr> {
        match &self.stage {
            Stage::Running(active) => Some(active.listener.local_addr()),
            _ => None,
        }
    }

    /// Samples delivered since the session started.
    pub fn samples_received(&self) -> u64 {
        match &self.stage {
            Stage::Running(active) => active.received,
            _ => 0,
        }
    }

    pub fn amplifier(&self) -> &A {
        &self.amp
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            operation,
            state: self.stage.state(),
        }
    }
}

impl<A> std::fmt::Debug for Acquisition<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquisition")
            .field("state", &self.stage.state())
            .finish()
    }
}

fn discard(sink: Option<SessionSink>) {
    if let Some(sink) = sink {
        if let Err(err) = sink.discard() {
            warn!(error = %err, "failed to remove session files");
        }
    }
}
