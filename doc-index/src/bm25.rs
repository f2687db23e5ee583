//! Okapi BM25 over a [`LexicalIndex`].

use crate::lexical::LexicalIndex;

pub const K1: f64 = 1.2;
pub const B: f64 = 0.75;

/// `ln(1 + (N - df + 0.5) / (df + 0.5))`, always positive.
pub fn idf(n_chunks: usize, doc_freq: usize) -> f64 {
    let n = n_chunks as f64;
    let df = doc_freq as f64;
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
}

/// Scores every chunk against deduplicated `terms`, in chunk order.
///
/// A chunk containing none of the terms scores exactly `0.0`.
pub fn bm25_scores(index: &LexicalIndex, terms: &[String]) -> Vec<f32> {
    let n = index.len();
    let avg_len = if index.avg_len > 0.0 { index.avg_len } else { 1.0 };

    let idfs: Vec<(&str, f64)> = terms
        .iter()
        .filter_map(|t| index.doc_freq.get(t).map(|&df| (t.as_str(), idf(n, df))))
        .collect();

    index
        .stats
        .iter()
        .map(|stats| {
            let len_norm = 1.0 - B + B * stats.token_count as f64 / avg_len;
            idfs.iter()
                .filter_map(|(term, idf)| {
                    stats.term_freq.get(*term).map(|&tf| {
                        let tf = f64::from(tf);
                        idf * tf * (K1 + 1.0) / (tf + K1 * len_norm)
                    })
                })
                .sum::<f64>() as f32
        })
        .collect()
}
