use bytes::BytesMut;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Reassembles delimiter-separated text messages from a byte stream.
///
/// Each connection owns one assembler. Chunks are appended as they arrive;
/// once the buffer holds at least one delimiter, everything up to the last
/// delimiter is split into messages and the tail stays buffered until a later
/// chunk completes it.
#[derive(Debug)]
pub struct MessageAssembler {
    buf: BytesMut,
    delimiter: u8,
}

impl MessageAssembler {
    /// Create an assembler splitting on `delimiter`.
    pub fn new(delimiter: u8) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            delimiter,
        }
    }

    /// Append a chunk and return every message it completed, in order.
    ///
    /// Empty messages between consecutive delimiters are returned as empty
    /// strings. Invalid UTF-8 is replaced, never rejected.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let Some(last) = self.buf.iter().rposition(|&b| b == self.delimiter) else {
            return Vec::new();
        };

        let complete = self.buf.split_to(last + 1);
        complete[..last]
            .split(|&b| b == self.delimiter)
            .map(|message| String::from_utf8_lossy(message).into_owned())
            .collect()
    }

    /// Number of buffered bytes still waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// The delimiter this assembler splits on.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_payload_with_three_messages() {
        let mut assembler = MessageAssembler::new(b'\n');
        assert_eq!(assembler.push(b"A\nB\nC\n"), vec!["A", "B", "C"]);
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn tail_waits_for_delimiter() {
        let mut assembler = MessageAssembler::new(b'\n');

        assert_eq!(assembler.push(b"A\nB"), vec!["A"]);
        assert_eq!(assembler.pending(), 1);

        // "B" is only complete once "C\n" arrives, and they belong together.
        assert_eq!(assembler.push(b"C\n"), vec!["BC"]);
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn no_delimiter_emits_nothing() {
        let mut assembler = MessageAssembler::new(b'\n');
        assert!(assembler.push(b"partial").is_empty());
        assert!(assembler.push(b" message").is_empty());
        assert_eq!(assembler.pending(), 15);
        assert_eq!(assembler.push(b"\n"), vec!["partial message"]);
    }

    #[test]
    fn empty_messages_are_kept() {
        let mut assembler = MessageAssembler::new(b'\n');
        assert_eq!(assembler.push(b"\n\nx\n"), vec!["", "", "x"]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut assembler = MessageAssembler::new(b'\n');
        let text = "reiz-\u{00e4}\n".as_bytes();
        let (head, tail) = text.split_at(6);

        assert!(assembler.push(head).is_empty());
        assert_eq!(assembler.push(tail), vec!["reiz-\u{00e4}"]);
    }

    #[test]
    fn custom_delimiter() {
        let mut assembler = MessageAssembler::new(b';');
        assert_eq!(assembler.delimiter(), b';');
        assert_eq!(assembler.push(b"a;b\n;c"), vec!["a", "b\n"]);
        assert_eq!(assembler.pending(), 1);
    }
}
