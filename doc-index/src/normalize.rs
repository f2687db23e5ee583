//! Text normalization applied before chunking.

/// Unifies line endings to `\n` and trims trailing whitespace on each line.
///
/// Line structure is preserved, so blank-line paragraph boundaries survive.
pub fn normalize_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, line) in s.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.trim_end());
    }
    out
}

/// Splits normalized text into trimmed, non-empty paragraphs separated by blank lines.
pub fn paragraphs(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in s.split('\n') {
        if line.trim().is_empty() {
            flush(&mut current, &mut out);
        } else {
            current.push(line);
        }
    }
    flush(&mut current, &mut out);
    out
}

fn flush(current: &mut Vec<&str>, out: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    let para = current.join("\n");
    let para = para.trim();
    if !para.is_empty() {
        out.push(para.to_string());
    }
    current.clear();
}
