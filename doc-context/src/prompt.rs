//! Context rendering and chat message composition.

use llm_gateway::{ChatTurn, Role};

/// Default system instructions for document question answering.
pub const DEFAULT_SYSTEM: &str = "You are a careful reading assistant. Answer questions about the \
document using the provided context as ground truth. Quote or paraphrase the relevant passages, \
say so plainly when the context does not contain the answer, and keep answers concise.";

/// Appended to a truncated excerpt.
const TRUNCATION_MARK: &str = " […]";

/// Whole document, in chunk order.
pub fn render_full(title: &str, chunks: &[String]) -> String {
    let mut out = title_line(title);
    out.push_str(&chunks.join("\n\n"));
    out
}

/// Selected chunks as labelled excerpts in document order.
///
/// `indices` must be sorted. Labels read `Excerpt <chunk>/<total chunks>`.
/// Excerpt text is cut once `budget` characters are used; the first excerpt
/// is always present, even if truncated.
pub fn render_excerpts(
    title: &str,
    chunks: &[String],
    indices: &[usize],
    budget: usize,
    full_length: usize,
) -> (String, usize) {
    let mut out = title_line(title);
    let total = chunks.len();
    let mut used = 0usize;
    let mut rendered = 0usize;

    for &i in indices {
        let Some(text) = chunks.get(i) else { continue };
        let remaining = budget.saturating_sub(used);
        if remaining == 0 && rendered > 0 {
            break;
        }

        out.push_str(&format!("[Excerpt {}/{}]\n", i + 1, total));
        let len = text.chars().count();
        rendered += 1;
        if len <= remaining {
            out.push_str(text);
            out.push_str("\n\n");
            used += len;
            continue;
        }

        let keep = remaining.max(1);
        out.extend(text.chars().take(keep));
        out.push_str(TRUNCATION_MARK);
        out.push_str("\n\n");
        break;
    }

    out.push_str(&format!(
        "(Source document length: {full_length} characters; {rendered} of {total} passages shown.)"
    ));
    (out, rendered)
}

fn title_line(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        String::new()
    } else {
        format!("Document: {title}\n\n")
    }
}

/// Builds the message list for one question.
///
/// Order: system prompt, context block, the last `history_turns` user and
/// assistant turns, then the question (with the image part when attached).
pub fn compose_messages(
    system_override: Option<&str>,
    context: &str,
    history: &[ChatTurn],
    history_turns: usize,
    question: &str,
    image_url: Option<&str>,
) -> Vec<ChatTurn> {
    let system = system_override
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SYSTEM);

    let recent: Vec<&ChatTurn> = history
        .iter()
        .filter(|t| t.role != Role::System)
        .collect();
    let skip = recent.len().saturating_sub(history_turns);

    let mut messages = Vec::with_capacity(3 + recent.len() - skip);
    messages.push(ChatTurn::system(system));
    messages.push(ChatTurn::system(format!(
        "Context from the document:\n\n{context}"
    )));
    messages.extend(recent.into_iter().skip(skip).cloned());
    messages.push(match image_url {
        Some(url) => ChatTurn::user_with_image(question.trim(), url),
        None => ChatTurn::user(question.trim()),
    });
    messages
}
