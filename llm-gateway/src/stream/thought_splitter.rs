//! In-band `<thought>...</thought>` splitter for the answer channel.
//!
//! Frame boundaries may cut a tag anywhere, so the longest suffix of the
//! scanned text that could still start the awaited tag is held back until the
//! next chunk arrives.

const OPEN_TAG: &str = "<thought>";
const CLOSE_TAG: &str = "</thought>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SplitState {
    #[default]
    Outside,
    InsideThought,
}

/// A classified piece of answer-channel text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Answer(String),
    Thought(String),
}

/// Per-stream splitter state. Not shared between streams.
#[derive(Debug, Default)]
pub struct ThoughtSplitter {
    state: SplitState,
    carry: String,
}

impl ThoughtSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one chunk and returns every segment that is already certain.
    pub fn push(&mut self, chunk: &str) -> Vec<Segment> {
        let mut text = std::mem::take(&mut self.carry);
        text.push_str(chunk);

        let mut out = Vec::new();
        let mut rest = text.as_str();
        loop {
            let tag = match self.state {
                SplitState::Outside => OPEN_TAG,
                SplitState::InsideThought => CLOSE_TAG,
            };
            match find_ignore_case(rest, tag) {
                Some(pos) => {
                    push_segment(&mut out, self.state, &rest[..pos]);
                    rest = &rest[pos + tag.len()..];
                    self.state = match self.state {
                        SplitState::Outside => SplitState::InsideThought,
                        SplitState::InsideThought => SplitState::Outside,
                    };
                }
                None => {
                    // Held bytes are ASCII tag characters, so `cut` is a char boundary.
                    let cut = rest.len() - partial_tag_suffix(rest, tag);
                    push_segment(&mut out, self.state, &rest[..cut]);
                    self.carry = rest[cut..].to_string();
                    break;
                }
            }
        }
        out
    }

    /// Flushes held-back text. An unterminated thought is still reported.
    pub fn finish(&mut self) -> Option<Segment> {
        let carry = std::mem::take(&mut self.carry);
        let state = std::mem::take(&mut self.state);
        let mut out = Vec::with_capacity(1);
        push_segment(&mut out, state, &carry);
        out.pop()
    }
}

fn push_segment(out: &mut Vec<Segment>, state: SplitState, text: &str) {
    if text.is_empty() {
        return;
    }
    out.push(match state {
        SplitState::Outside => Segment::Answer(text.to_string()),
        SplitState::InsideThought => Segment::Thought(text.to_string()),
    });
}

fn find_ignore_case(haystack: &str, tag: &str) -> Option<usize> {
    let tag = tag.as_bytes();
    haystack
        .as_bytes()
        .windows(tag.len())
        .position(|w| w.eq_ignore_ascii_case(tag))
}

/// Length of the longest proper prefix of `tag` that `text` ends with.
fn partial_tag_suffix(text: &str, tag: &str) -> usize {
    let text = text.as_bytes();
    let tag = tag.as_bytes();
    (1..tag.len())
        .rev()
        .find(|&k| k <= text.len() && text[text.len() - k..].eq_ignore_ascii_case(&tag[..k]))
        .unwrap_or(0)
}
