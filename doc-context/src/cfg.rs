//! Retrieval configuration loaded from environment variables.

use doc_index::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_EMBED_BATCH, IndexConfig};
use tracing::warn;

pub const DEFAULT_FULL_CONTEXT_MAX_CHARS: usize = 500_000;
pub const DEFAULT_MAX_EXCERPTS: usize = 4;
pub const DEFAULT_CHAR_BUDGET: usize = 8000;
pub const DEFAULT_IMAGE_CHAR_BUDGET: usize = 3000;
pub const DEFAULT_HISTORY_TURNS: usize = 6;

/// Knobs for context assembly and message composition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievalConfig {
    /// Send the whole document when it fits `full_context_max_chars` and no image is attached.
    pub force_full_context: bool,
    pub full_context_max_chars: usize,
    /// Cap on excerpts in a retrieved context.
    pub max_excerpts: usize,
    /// Character budget for excerpt text.
    pub char_budget: usize,
    /// Budget used instead of `char_budget` when an image is attached.
    pub image_char_budget: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Number of recent transcript turns forwarded to the model.
    pub history_turns: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            force_full_context: true,
            full_context_max_chars: DEFAULT_FULL_CONTEXT_MAX_CHARS,
            max_excerpts: DEFAULT_MAX_EXCERPTS,
            char_budget: DEFAULT_CHAR_BUDGET,
            image_char_budget: DEFAULT_IMAGE_CHAR_BUDGET,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            history_turns: DEFAULT_HISTORY_TURNS,
        }
    }
}

impl RetrievalConfig {
    /// Build from `RAG_*` environment variables; unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            force_full_context: parse("RAG_FORCE_FULL_CONTEXT", d.force_full_context),
            full_context_max_chars: parse("RAG_FULL_CONTEXT_MAX_CHARS", d.full_context_max_chars),
            max_excerpts: parse("RAG_MAX_EXCERPTS", d.max_excerpts),
            char_budget: parse("RAG_CHAR_BUDGET", d.char_budget),
            image_char_budget: parse("RAG_IMAGE_CHAR_BUDGET", d.image_char_budget),
            chunk_size: parse("RAG_CHUNK_SIZE", d.chunk_size),
            chunk_overlap: parse("RAG_CHUNK_OVERLAP", d.chunk_overlap),
            history_turns: parse("RAG_HISTORY_TURNS", d.history_turns),
        }
    }

    /// Index settings for [`doc_index::DocumentRegistry`].
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            embed_batch: DEFAULT_EMBED_BATCH,
        }
    }

    /// Character budget for one question.
    pub fn budget_for(&self, has_image: bool) -> usize {
        if has_image {
            self.image_char_budget
        } else {
            self.char_budget
        }
    }
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> T {
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().unwrap_or_else(|_| {
            warn!("cfg::parse ignoring invalid {k}={v:?}");
            dflt
        }),
        _ => dflt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_budgets() {
        let cfg = RetrievalConfig::default();
        assert!(cfg.force_full_context);
        assert_eq!(cfg.budget_for(false), 8000);
        assert_eq!(cfg.budget_for(true), 3000);
        assert_eq!(cfg.index_config(), IndexConfig::default());
    }

    #[test]
    fn unparsable_values_fall_back() {
        // Variable names unique to this test; no other test touches them.
        unsafe {
            std::env::set_var("DOC_CONTEXT_TEST_PARSE_BAD", "many");
            std::env::set_var("DOC_CONTEXT_TEST_PARSE_OK", " 12 ");
        }
        assert_eq!(parse("DOC_CONTEXT_TEST_PARSE_BAD", 4usize), 4);
        assert_eq!(parse("DOC_CONTEXT_TEST_PARSE_OK", 4usize), 12);
        assert!(!parse("DOC_CONTEXT_TEST_PARSE_MISSING", false));
    }
}
