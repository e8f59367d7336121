use std::time::{Duration, SystemTime};

use acqsync_frame::Marker;
use tracing::{debug, warn};

use crate::marker::TimedMarker;
use crate::queue::MarkerQueue;

/// Pause before draining the queue so markers sent right at the block
/// boundary have reached it. Trades a little latency for fewer deferrals.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_micros(200);

/// Wall-clock span covered by one acquisition block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
    /// Time the previous block ended (this block's first sample).
    pub start: SystemTime,
    /// Time this block was received.
    pub end: SystemTime,
}

impl BlockWindow {
    pub fn new(start: SystemTime, end: SystemTime) -> Self {
        Self { start, end }
    }
}

/// How queued network markers are handled in a merged block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Device and network markers together, placed on samples.
    #[default]
    Combined,
    /// Latency measurement: device markers are discarded and every queued
    /// network marker is returned with its receive time, unconverted and
    /// never deferred.
    NetworkOnly,
}

/// A network marker that arrived before the block it was assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleMarker {
    /// Position of the clamped marker in [`MergeOutcome::markers`].
    pub index: usize,
    pub label: String,
    /// How far the marker's timestamp lies before the block start.
    pub lateness: Duration,
}

/// Result of merging one block's markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Markers of this block, ascending by offset.
    pub markers: Vec<Marker>,
    /// Network markers newer than the block end, left for the next block.
    pub deferred: Vec<TimedMarker>,
    /// Network markers clamped to offset 0.
    pub stale: Vec<StaleMarker>,
    /// Network markers with their receive time, in arrival order. Only
    /// filled in [`MergeMode::NetworkOnly`].
    pub timestamps: Vec<TimedMarker>,
}

/// Convert queued network markers into offsets within `window` and merge them
/// with the block's device markers.
///
/// A marker newer than `window.end` is deferred, not dropped. A marker older
/// than `window.start` lands on the first sample and is reported as stale.
/// Otherwise the offset is `floor((timestamp - start) * sampling_frequency)`.
///
/// In [`MergeMode::NetworkOnly`] none of this applies: every queued marker
/// is consumed and returned in [`MergeOutcome::timestamps`].
pub fn merge_block(
    window: BlockWindow,
    sampling_frequency: f64,
    device_markers: Vec<Marker>,
    queued: Vec<TimedMarker>,
    mode: MergeMode,
) -> MergeOutcome {
    if mode == MergeMode::NetworkOnly {
        if !device_markers.is_empty() {
            debug!(
                count = device_markers.len(),
                "discarding device markers in network-only mode"
            );
        }
        return MergeOutcome {
            timestamps: queued,
            ..MergeOutcome::default()
        };
    }

    let mut outcome = MergeOutcome::default();
    // Second element is the lateness of a clamped network marker.
    let mut merged: Vec<(Marker, Option<Duration>)> = device_markers
        .into_iter()
        .map(|marker| (marker, None))
        .collect();

    for marker in queued {
        if marker.timestamp > window.end {
            outcome.deferred.push(marker);
            continue;
        }

        match marker.timestamp.duration_since(window.start) {
            // `as` truncates toward zero and saturates.
            Ok(dt) => {
                let offset = (dt.as_secs_f64() * sampling_frequency) as u64;
                merged.push((Marker::new(offset, marker.label), None));
            }
            Err(err) => {
                let lateness = err.duration();
                warn!(
                    label = %marker.label,
                    lateness_ms = lateness.as_secs_f64() * 1000.0,
                    "marker is older than current block, setting it to first sample"
                );
                merged.push((Marker::new(0, marker.label), Some(lateness)));
            }
        }
    }

    if !outcome.deferred.is_empty() {
        debug!(
            count = outcome.deferred.len(),
            "deferring markers newer than current block"
        );
    }

    merged.sort_by(|a, b| a.0.cmp(&b.0));
    outcome.markers.reserve(merged.len());
    for (index, (marker, lateness)) in merged.into_iter().enumerate() {
        if let Some(lateness) = lateness {
            outcome.stale.push(StaleMarker {
                index,
                label: marker.label.clone(),
                lateness,
            });
        }
        outcome.markers.push(marker);
    }
    outcome
}

/// Per-cycle marker synchronization against the session's marker queue.
#[derive(Debug)]
pub struct Synchronizer {
    queue: MarkerQueue,
    sampling_frequency: f64,
    settle_delay: Duration,
    mode: MergeMode,
}

impl Synchronizer {
    pub fn new(sampling_frequency: f64) -> Self {
        Self {
            queue: MarkerQueue::new(),
            sampling_frequency,
            settle_delay: DEFAULT_SETTLE_DELAY,
            mode: MergeMode::Combined,
        }
    }

    /// Override the settle delay.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Override the merge mode.
    pub fn with_mode(mut self, mode: MergeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Queue the listener feeds.
    pub fn queue(&self) -> &MarkerQueue {
        &self.queue
    }

    pub fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    /// Merge the queued network markers into the block spanning `window`.
    ///
    /// Deferred markers go back into the queue; they are still listed in the
    /// returned outcome.
    pub fn synchronize(&self, window: BlockWindow, device_markers: Vec<Marker>) -> MergeOutcome {
        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }

        let queued = self.queue.drain();
        let outcome = merge_block(
            window,
            self.sampling_frequency,
            device_markers,
            queued,
            self.mode,
        );
        self.queue.requeue(outcome.deferred.iter().cloned());
        outcome
    }
}
