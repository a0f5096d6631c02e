//! Hybrid retrieval query path (C3 §4.3 `query`): fuse BM25 and dense
//! cosine scores by convex combination, with independent min-max
//! normalization and a stable tie-break on `chunk_id`.

use esg_core::ids::ChunkId;

use crate::bm25::Bm25Index;
use crate::embeddings::{cosine, EmbeddingIndex};
use crate::RetrievalError;

#[derive(Clone, Debug)]
pub struct RankedChunk {
    pub chunk_id: ChunkId,
    pub bm25_score: f64,
    pub semantic_score: f64,
    pub fused_score: f64,
}

fn min_max_normalize(scores: &mut [(ChunkId, f64)]) {
    let (min, max) = scores.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(mn, mx), (_, s)| {
        (mn.min(*s), mx.max(*s))
    });
    let span = max - min;
    for (_, s) in scores.iter_mut() {
        *s = if span > 0.0 { (*s - min) / span } else { 0.0 };
    }
}

/// Query a hybrid index: tokenize `q`, score lexically via BM25, embed `q`
/// via the (already-built) dense index's own query-embedding vector, fuse
/// with `alpha`, sort descending by fused score with ties broken by
/// `chunk_id` ascending (stable), and return the first `k`.
pub fn query(
    bm25: &Bm25Index,
    dense: &EmbeddingIndex,
    query_text_canonical: &str,
    query_vector: &[f32],
    k: usize,
    alpha: f64,
) -> Result<Vec<RankedChunk>, RetrievalError> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(RetrievalError::BadAlpha(alpha));
    }
    if bm25.is_empty() || dense.vectors.is_empty() {
        return Err(RetrievalError::Index("index is empty".into()));
    }

    let mut bm25_scores = bm25.score_query(query_text_canonical);
    min_max_normalize(&mut bm25_scores);
    let bm25_by_id: std::collections::HashMap<ChunkId, f64> = bm25_scores.into_iter().collect();

    let mut semantic_scores: Vec<(ChunkId, f64)> = dense
        .meta
        .chunk_ids
        .iter()
        .zip(dense.vectors.iter())
        .map(|(id, vec)| {
            let chunk_id = ChunkId::try_from(id.as_str()).expect("persisted chunk id is well-formed");
            (chunk_id, cosine(vec, query_vector))
        })
        .collect();
    min_max_normalize(&mut semantic_scores);

    let mut ranked: Vec<RankedChunk> = semantic_scores
        .into_iter()
        .map(|(chunk_id, semantic_score)| {
            let bm25_score = *bm25_by_id.get(&chunk_id).unwrap_or(&0.0);
            let fused_score = alpha * bm25_score + (1.0 - alpha) * semantic_score;
            RankedChunk {
                chunk_id,
                bm25_score,
                semantic_score,
                fused_score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.as_str().cmp(b.chunk_id.as_str()))
    });

    let effective_k = k.min(ranked.len());
    ranked.truncate(effective_k);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_alpha_outside_unit_interval() {
        let chunks: Vec<(&ChunkId, &str)> = vec![];
        let bm25 = Bm25Index::build(chunks, Default::default());
        let dense = EmbeddingIndex {
            meta: crate::embeddings::IndexMeta {
                model_id: "m".into(),
                dim: 1,
                seed: 0,
                deterministic_timestamp: "2025-10-28T06:00:00Z".into(),
                text_sha_all: "x".into(),
                chunk_ids: vec![],
            },
            vectors: vec![],
        };
        let result = query(&bm25, &dense, "q", &[1.0], 5, 1.5);
        assert!(matches!(result, Err(RetrievalError::BadAlpha(_))));
    }
}
