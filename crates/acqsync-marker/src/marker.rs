use std::time::SystemTime;

/// A marker label stamped with the wall-clock time it was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedMarker {
    pub timestamp: SystemTime,
    pub label: String,
}

impl TimedMarker {
    pub fn new(timestamp: SystemTime, label: impl Into<String>) -> Self {
        Self {
            timestamp,
            label: label.into(),
        }
    }

    /// Stamp a label with the current time.
    pub fn now(label: impl Into<String>) -> Self {
        Self::new(SystemTime::now(), label)
    }
}
