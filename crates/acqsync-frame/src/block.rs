use crate::error::{FrameError, Result};

/// A labelled event at a sample offset.
///
/// Inside a [`SampleBlock`] the offset is relative to the block's first row.
/// Ordering is by offset, then label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Marker {
    pub offset: u64,
    pub label: String,
}

impl Marker {
    pub fn new(offset: u64, label: impl Into<String>) -> Self {
        Self {
            offset,
            label: label.into(),
        }
    }
}

/// Samples produced by one acquisition cycle, row-major (sample × channel),
/// together with the markers the device itself embedded in them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleBlock {
    channels: usize,
    data: Vec<f32>,
    markers: Vec<Marker>,
}

impl SampleBlock {
    /// Empty block with `channels` values per row.
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            data: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Block holding a single row.
    pub fn from_row(row: Vec<f32>) -> Self {
        Self {
            channels: row.len(),
            data: row,
            markers: Vec::new(),
        }
    }

    /// Append one sample row.
    pub fn push_row(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.channels {
            return Err(FrameError::RowWidth {
                got: row.len(),
                expected: self.channels,
            });
        }
        self.data.extend_from_slice(row);
        Ok(())
    }

    /// Attach a device-native marker.
    pub fn push_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    /// Values per row.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of sample rows.
    pub fn len(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / self.channels
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate rows in acquisition order.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on zero; an empty block has no rows either way.
        self.data.chunks_exact(self.channels.max(1))
    }

    /// Flat row-major sample data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Device-native markers, offsets relative to this block.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Split into samples and device markers.
    pub fn take_markers(&mut self) -> Vec<Marker> {
        std::mem::take(&mut self.markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_order_by_offset_then_label() {
        let mut markers = vec![
            Marker::new(5, "net"),
            Marker::new(2, "b"),
            Marker::new(2, "a"),
        ];
        markers.sort();
        assert_eq!(
            markers,
            vec![Marker::new(2, "a"), Marker::new(2, "b"), Marker::new(5, "net")]
        );
    }

    #[test]
    fn rows_follow_push_order() {
        let mut block = SampleBlock::new(3);
        block.push_row(&[1.0, 2.0, 3.0]).unwrap();
        block.push_row(&[4.0, 5.0, 6.0]).unwrap();

        assert_eq!(block.len(), 2);
        let rows: Vec<&[f32]> = block.rows().collect();
        assert_eq!(rows, vec![&[1.0, 2.0, 3.0][..], &[4.0, 5.0, 6.0][..]]);
        assert_eq!(block.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn rejects_row_of_wrong_width() {
        let mut block = SampleBlock::new(2);
        let err = block.push_row(&[1.0]).unwrap_err();
        assert!(matches!(err, FrameError::RowWidth { got: 1, expected: 2 }));
        assert!(block.is_empty());
    }

    #[test]
    fn empty_block_without_channels() {
        let block = SampleBlock::new(0);
        assert_eq!(block.len(), 0);
        assert_eq!(block.rows().count(), 0);
    }

    #[test]
    fn take_markers_leaves_samples() {
        let mut block = SampleBlock::from_row(vec![0.5; 4]);
        block.push_marker(Marker::new(0, "device"));

        let markers = block.take_markers();
        assert_eq!(markers, vec![Marker::new(0, "device")]);
        assert!(block.markers().is_empty());
        assert_eq!(block.len(), 1);
        assert_eq!(block.channels(), 4);
    }
}
