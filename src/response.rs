//! Accumulation and cleanup of device responses

/// Raw payload capacity of a single response
pub const RESPONSE_CAPACITY: usize = 255;

/// Bytes of one response, capped at [RESPONSE_CAPACITY]
///
/// Bytes arriving after the buffer is full are counted and dropped.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    data: Vec<u8>,
    dropped: usize,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(RESPONSE_CAPACITY),
            dropped: 0,
        }
    }

    /// Append as much of `bytes` as still fits
    pub fn extend(&mut self, bytes: &[u8]) {
        let room = RESPONSE_CAPACITY - self.data.len();
        let (kept, dropped) = bytes.split_at(room.min(bytes.len()));
        self.data.extend_from_slice(kept);
        self.dropped += dropped.len();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes that did not fit
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn normalize(&self) -> String {
        normalize(&self.data)
    }
}

/// Turn raw response bytes into a single trimmed line of text
///
/// The payload ends at the first NUL. Line feeds become spaces, then runs of spaces and carriage
/// returns are stripped from both ends.
///
/// ```
/// assert_eq!(serial_device::normalize(b"hello\nworld  "), "hello world");
/// ```
pub fn normalize(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let folded: Vec<u8> = bytes[..end]
        .iter()
        .map(|&b| if b == b'\n' { b' ' } else { b })
        .collect();

    String::from_utf8_lossy(&folded)
        .trim_matches(|c| c == ' ' || c == '\r')
        .to_owned()
}
