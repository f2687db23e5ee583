//! Score fusion, capped selection and neighbour padding.

use doc_index::{ScoredChunk, min_max_normalize};
use tracing::{debug, warn};

/// Weight of each signal when both lexical and semantic scores are present.
pub const LEXICAL_WEIGHT: f32 = 0.5;
pub const SEMANTIC_WEIGHT: f32 = 0.5;

/// Number of leading chunks used when nothing scores above zero.
pub const FALLBACK_CHUNKS: usize = 2;

/// Normalizes each signal to `[0, 1]` and fuses them.
///
/// Without a usable semantic vector the fused score is exactly the normalized
/// lexical score.
pub fn fuse_scores(lexical: &[f32], semantic: Option<&[f32]>) -> Vec<ScoredChunk> {
    let lex = min_max_normalize(lexical);
    let sem = match semantic {
        Some(s) if s.len() == lex.len() => Some(min_max_normalize(s)),
        Some(s) => {
            warn!(
                "select::fuse_scores semantic={} lexical={} length mismatch, lexical only",
                s.len(),
                lex.len()
            );
            None
        }
        None => None,
    };

    lex.iter()
        .enumerate()
        .map(|(index, l)| {
            let fused_score = match &sem {
                Some(s) => LEXICAL_WEIGHT * l + SEMANTIC_WEIGHT * s[index],
                None => *l,
            };
            ScoredChunk { index, fused_score }
        })
        .collect()
}

/// Picks chunk indices by descending fused score.
///
/// Stops at `cap` or at the first non-positive score. When nothing qualifies
/// the first [`FALLBACK_CHUNKS`] chunks are returned. Result is in rank order.
pub fn select_ranked(scored: &[ScoredChunk], cap: usize) -> Vec<usize> {
    let cap = cap.max(1);
    let mut ranked = scored.to_vec();
    ranked.sort_by(|a, b| {
        b.fused_score
            .total_cmp(&a.fused_score)
            .then(a.index.cmp(&b.index))
    });

    let picked: Vec<usize> = ranked
        .iter()
        .take_while(|c| c.fused_score > 0.0)
        .take(cap)
        .map(|c| c.index)
        .collect();

    if picked.is_empty() {
        debug!("select::select_ranked nothing scored, first {FALLBACK_CHUNKS} chunks");
        return (0..scored.len().min(FALLBACK_CHUNKS).min(cap)).collect();
    }
    picked
}

/// Adds each picked chunk's predecessor then successor until `cap` is reached.
///
/// Returns indices sorted in document order.
pub fn pad_neighbors(picked: &[usize], n_chunks: usize, cap: usize) -> Vec<usize> {
    let mut out: Vec<usize> = picked.iter().copied().filter(|i| *i < n_chunks).collect();
    out.dedup();

    for &i in picked {
        if out.len() >= cap {
            break;
        }
        let neighbours = [i.checked_sub(1), i.checked_add(1).filter(|j| *j < n_chunks)];
        for j in neighbours.into_iter().flatten() {
            if out.len() >= cap {
                break;
            }
            if !out.contains(&j) {
                out.push(j);
            }
        }
    }

    out.sort_unstable();
    out
}
