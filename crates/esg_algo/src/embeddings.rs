//! Dense embeddings for a silver chunk set, produced through the
//! content-addressed cache (C2) and persisted as a binary matrix plus a
//! JSON sidecar (C3 §4.3 `build_index`).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use esg_core::ids::ChunkId;
use esg_io::cache::Cache;
use esg_io::hasher::sha256_hex;
use esg_io::IoError;

use crate::RetrievalError;

/// Sidecar metadata written next to `embeddings.bin`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexMeta {
    pub model_id: String,
    pub dim: usize,
    pub seed: u64,
    pub deterministic_timestamp: String,
    pub text_sha_all: String,
    pub chunk_ids: Vec<String>,
}

/// An in-memory dense index: one L2-normalized vector per chunk, in the
/// same order as `meta.chunk_ids`.
pub struct EmbeddingIndex {
    pub meta: IndexMeta,
    pub vectors: Vec<Vec<f32>>,
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Build (or the caller may instead load) a dense index for a set of
/// silver chunks, calling `embed` once per chunk's canonical text through
/// the cache `embed` closure supplies.
pub fn build_index(
    cache: &Cache,
    model_id: &str,
    seed: u64,
    deterministic_timestamp: &str,
    chunks: &[(ChunkId, String)],
    embed_live: impl Fn(&str) -> Result<Vec<f32>, IoError>,
) -> Result<EmbeddingIndex, RetrievalError> {
    if chunks.is_empty() {
        return Err(RetrievalError::Index("cannot index an empty chunk set".into()));
    }

    let params = serde_json::json!({ "seed": seed });
    let mut vectors = Vec::with_capacity(chunks.len());
    let mut hashes = Vec::with_capacity(chunks.len());

    for (_, canonical_text) in chunks {
        let input = serde_json::json!({ "text": canonical_text });
        let raw: Vec<f32> = cache
            .get_or_call(model_id, "embedding", &params, &input, || embed_live(canonical_text))
            .map_err(|e| RetrievalError::Index(e.to_string()))?;
        let mut v = raw;
        l2_normalize(&mut v);
        hashes.push(sha256_hex(canonical_text.as_bytes()));
        vectors.push(v);
    }

    let dim = vectors[0].len();
    if vectors.iter().any(|v| v.len() != dim) {
        return Err(RetrievalError::Index("embedding dimension mismatch across chunks".into()));
    }

    hashes.sort();
    let text_sha_all = sha256_hex(hashes.join("").as_bytes());

    let meta = IndexMeta {
        model_id: model_id.to_string(),
        dim,
        seed,
        deterministic_timestamp: deterministic_timestamp.to_string(),
        text_sha_all,
        chunk_ids: chunks.iter().map(|(c, _)| c.as_str().to_string()).collect(),
    };

    Ok(EmbeddingIndex { meta, vectors })
}

/// Persist `embeddings.bin` (raw row-major float32 `[N×D]`) and `meta.json`.
pub fn write_index(dir: &Path, index: &EmbeddingIndex) -> Result<(), RetrievalError> {
    fs::create_dir_all(dir).map_err(|e| RetrievalError::Index(e.to_string()))?;

    let mut bytes = Vec::with_capacity(index.vectors.len() * index.meta.dim * 4);
    for row in &index.vectors {
        for x in row {
            bytes.extend_from_slice(&x.to_le_bytes());
        }
    }
    fs::write(dir.join("embeddings.bin"), &bytes).map_err(|e| RetrievalError::Index(e.to_string()))?;

    let meta_value = serde_json::to_value(&index.meta).map_err(|e| RetrievalError::Index(e.to_string()))?;
    esg_io::canonical_json::write_canonical_file(&dir.join("meta.json"), &meta_value)
        .map_err(|e| RetrievalError::Index(e.to_string()))?;
    Ok(())
}

/// Load a previously written index from disk.
pub fn read_index(dir: &Path) -> Result<EmbeddingIndex, RetrievalError> {
    let meta_bytes = fs::read(dir.join("meta.json")).map_err(|e| RetrievalError::Index(e.to_string()))?;
    let meta: IndexMeta = serde_json::from_slice(&meta_bytes).map_err(|e| RetrievalError::Index(e.to_string()))?;

    let bin = fs::read(dir.join("embeddings.bin")).map_err(|e| RetrievalError::Index(e.to_string()))?;
    let expected_len = meta.chunk_ids.len() * meta.dim * 4;
    if bin.len() != expected_len {
        return Err(RetrievalError::Index(format!(
            "embeddings.bin size {} does not match N*D*4 = {}",
            bin.len(),
            expected_len
        )));
    }

    let mut vectors = Vec::with_capacity(meta.chunk_ids.len());
    for chunk in bin.chunks_exact(meta.dim * 4) {
        let row = chunk
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        vectors.push(row);
    }

    Ok(EmbeddingIndex { meta, vectors })
}

/// Dot product of two L2-normalized vectors == cosine similarity.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_normalized_vectors_is_one() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize(&mut v);
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-6);
    }
}
