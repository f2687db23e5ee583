//! Context assembly for one question.

use doc_index::{DocumentIndex, EmbeddingsProvider};
use tracing::{debug, instrument};

use crate::{
    api_types::{BuiltContext, ContextMode, RetrievalQuery},
    cfg::RetrievalConfig,
    prompt::{render_excerpts, render_full},
    select::{fuse_scores, pad_neighbors, select_ranked},
};

/// Builds the context string handed to the model.
///
/// Never fails. Missing embeddings or an unembeddable query degrade to
/// lexical ranking, and a query matching nothing degrades to the first
/// chunks of the document.
#[instrument(
    skip_all,
    fields(doc = %doc.id(), chunks = doc.len(), image = query.has_attached_image)
)]
pub async fn build_context(
    doc: &DocumentIndex,
    query: &RetrievalQuery,
    cfg: &RetrievalConfig,
    provider: &dyn EmbeddingsProvider,
) -> BuiltContext {
    if cfg.force_full_context
        && !query.has_attached_image
        && doc.full_length() <= cfg.full_context_max_chars
    {
        debug!(
            "retrieve::build_context full document chars={}",
            doc.full_length()
        );
        return BuiltContext {
            text: render_full(doc.title(), doc.chunks()),
            mode: ContextMode::Full,
            excerpts: Vec::new(),
        };
    }

    let lexical = doc.lexical_scores(&query.raw_text);
    let semantic = doc.semantic_scores(provider, &query.raw_text).await;
    let scored = fuse_scores(&lexical, semantic.as_deref());

    let cap = cfg.max_excerpts.max(1);
    let picked = select_ranked(&scored, cap);
    let indices = pad_neighbors(&picked, doc.len(), cap);

    let (text, rendered) = render_excerpts(
        doc.title(),
        doc.chunks(),
        &indices,
        cfg.budget_for(query.has_attached_image),
        doc.full_length(),
    );
    debug!(
        "retrieve::build_context semantic={} picked={:?} rendered={rendered}",
        semantic.is_some(),
        indices
    );

    let mut excerpts = indices;
    excerpts.truncate(rendered);
    BuiltContext {
        text,
        mode: ContextMode::Retrieved,
        excerpts,
    }
}
