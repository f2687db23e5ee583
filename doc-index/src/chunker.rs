//! Paragraph-aware chunking.
//!
//! Short paragraphs are packed together up to the target length; a paragraph
//! longer than the target is sliced into overlapping fixed-length windows.
//! Lengths are measured in characters.

use tracing::debug;

use crate::normalize::{normalize_text, paragraphs};

/// Splits `text` into ordered, trimmed, non-empty chunks.
///
/// `target` is clamped to at least 1 and `overlap` to below `target`.
/// Empty or whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, target: usize, overlap: usize) -> Vec<String> {
    let target = target.max(1);
    let step = target - overlap.min(target - 1);

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for para in paragraphs(&normalize_text(text)) {
        let para_len = para.chars().count();

        if para_len > target {
            push_chunk(&mut chunks, &mut current, &mut current_len);
            slice_windows(&para, target, step, &mut chunks);
            continue;
        }

        if current_len == 0 {
            current = para;
            current_len = para_len;
        } else if current_len + 2 + para_len <= target {
            current.push_str("\n\n");
            current.push_str(&para);
            current_len += 2 + para_len;
        } else {
            push_chunk(&mut chunks, &mut current, &mut current_len);
            current = para;
            current_len = para_len;
        }
    }
    push_chunk(&mut chunks, &mut current, &mut current_len);

    debug!(
        "chunker::chunk_text input_chars={} chunks={} target={target} overlap={}",
        text.len(),
        chunks.len(),
        target - step
    );
    chunks
}

fn push_chunk(chunks: &mut Vec<String>, current: &mut String, current_len: &mut usize) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
    *current_len = 0;
}

fn slice_windows(para: &str, target: usize, step: usize, chunks: &mut Vec<String>) {
    let chars: Vec<char> = para.chars().collect();
    let mut start = 0usize;
    loop {
        let end = (start + target).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let window = window.trim();
        if !window.is_empty() {
            chunks.push(window.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
}
