//! Line framing for the serial read loop
//!
//! Bytes arrive in arbitrary chunks; a line is emitted only when its `\n`
//! terminator has been seen, so chunk boundaries never split or merge lines.

/// Default cap on an unterminated line
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

/// Accumulates raw bytes and yields complete, lossily decoded lines
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_line_len: usize,
    /// Skipping the tail of an overlong line until its terminator
    discarding: bool,
}

impl LineBuffer {
    pub fn new(max_line_len: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_len: max_line_len.max(1),
            discarding: false,
        }
    }

    /// Append a chunk and return every line it completes, in order.
    ///
    /// A trailing `\r` is stripped; invalid UTF-8 becomes U+FFFD. A line
    /// longer than the cap is dropped whole, however it is split across chunks.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let segment = &rest[..pos];
            rest = &rest[pos + 1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if self.pending.len() + segment.len() > self.max_line_len {
                log::warn!(
                    "Discarding {} byte serial line over the {} byte limit",
                    self.pending.len() + segment.len(),
                    self.max_line_len
                );
                self.pending.clear();
                continue;
            }

            self.pending.extend_from_slice(segment);
            lines.push(decode_line(&self.pending));
            self.pending.clear();
        }

        if !self.discarding {
            self.pending.extend_from_slice(rest);
            if self.pending.len() > self.max_line_len {
                log::warn!(
                    "Discarding unterminated serial input over the {} byte limit",
                    self.max_line_len
                );
                self.pending.clear();
                self.discarding = true;
            }
        }

        lines
    }

    /// Drop the buffered fragment, returning how many bytes were discarded
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.discarding = false;
        dropped
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
