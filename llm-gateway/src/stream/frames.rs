//! Line framing for `text/event-stream` and NDJSON bodies.

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// JSON payload text, not yet parsed.
    Data(String),
    /// `data: [DONE]` sentinel.
    Done,
}

/// Reassembles lines from arbitrarily split byte chunks.
///
/// Buffering bytes rather than strings keeps multi-byte characters intact
/// when a chunk boundary lands inside one.
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: Vec<u8>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns the frames of every completed line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(bytes);
        let mut frames = Vec::new();
        while let Some(nl) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=nl).collect();
            if let Some(frame) = parse_line(&String::from_utf8_lossy(&line)) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Frame of a trailing line without a newline, if any.
    pub fn finish(&mut self) -> Option<Frame> {
        let line = std::mem::take(&mut self.buf);
        parse_line(&String::from_utf8_lossy(&line))
    }
}

fn parse_line(line: &str) -> Option<Frame> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    if let Some(rest) = line.strip_prefix("data:") {
        let rest = rest.trim();
        return match rest {
            "" => None,
            "[DONE]" => Some(Frame::Done),
            _ => Some(Frame::Data(rest.to_string())),
        };
    }
    // Ollama's native endpoints stream bare JSON lines.
    if line.starts_with('{') {
        return Some(Frame::Data(line.to_string()));
    }
    // `event:`, `id:`, `retry:` carry nothing the decoders need.
    None
}
