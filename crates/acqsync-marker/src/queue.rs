use crossbeam_channel::{Receiver, Sender};

use crate::error::{MarkerError, Result};
use crate::marker::TimedMarker;

/// Producer handle for a [`MarkerQueue`], given to the listener.
#[derive(Debug, Clone)]
pub struct MarkerSender {
    tx: Sender<TimedMarker>,
}

impl MarkerSender {
    /// Enqueue a received marker.
    pub fn send(&self, marker: TimedMarker) -> Result<()> {
        self.tx.send(marker).map_err(|_| MarkerError::QueueClosed)
    }
}

/// FIFO of received markers shared between the listener and the acquisition
/// loop.
///
/// The consumer drains everything at once and may hand back markers that
/// belong to a later block.
#[derive(Debug)]
pub struct MarkerQueue {
    tx: Sender<TimedMarker>,
    rx: Receiver<TimedMarker>,
}

impl MarkerQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Producer handle for this queue.
    pub fn sender(&self) -> MarkerSender {
        MarkerSender {
            tx: self.tx.clone(),
        }
    }

    /// Take every marker currently queued, oldest first.
    pub fn drain(&self) -> Vec<TimedMarker> {
        self.rx.try_iter().collect()
    }

    /// Put markers back at the end of the queue.
    pub fn requeue(&self, markers: impl IntoIterator<Item = TimedMarker>) {
        for marker in markers {
            // Cannot fail: `self.rx` keeps the channel open.
            let _ = self.tx.send(marker);
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for MarkerQueue {
    fn default() -> Self {
        Self::new()
    }
}
