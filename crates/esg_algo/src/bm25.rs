//! BM25-Okapi lexical index over a silver chunk table's canonical text
//! (C3 §4.3). Tokenization is whitespace-split over already-canonicalized
//! text (lowercased, whitespace-normalized by `esg_store::clean`).

use std::collections::HashMap;

use esg_core::ids::ChunkId;

#[derive(Clone, Copy, Debug)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params { k1: 1.5, b: 0.75 }
    }
}

struct Doc {
    chunk_id: ChunkId,
    term_counts: HashMap<String, u32>,
    len: usize,
}

/// An in-memory BM25 index, rebuilt per query session and discarded
/// (§5 Memory).
pub struct Bm25Index {
    params: Bm25Params,
    docs: Vec<Doc>,
    doc_freq: HashMap<String, u32>,
    avg_doc_len: f64,
}

pub fn tokenize(canonical_text: &str) -> Vec<&str> {
    canonical_text.split_whitespace().collect()
}

impl Bm25Index {
    pub fn build<'a>(
        chunks: impl IntoIterator<Item = (&'a ChunkId, &'a str)>,
        params: Bm25Params,
    ) -> Self {
        let mut docs = Vec::new();
        let mut doc_freq: HashMap<String, u32> = HashMap::new();
        let mut total_len = 0usize;

        for (chunk_id, canonical_text) in chunks {
            let tokens = tokenize(canonical_text);
            let mut term_counts: HashMap<String, u32> = HashMap::new();
            for tok in &tokens {
                *term_counts.entry((*tok).to_string()).or_insert(0) += 1;
            }
            for term in term_counts.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            total_len += tokens.len();
            docs.push(Doc {
                chunk_id: chunk_id.clone(),
                term_counts,
                len: tokens.len(),
            });
        }

        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f64 / docs.len() as f64
        };

        Bm25Index {
            params,
            docs,
            doc_freq,
            avg_doc_len,
        }
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = *self.doc_freq.get(term).unwrap_or(&0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Raw (unnormalized) BM25 score per chunk, in index order.
    pub fn score_query(&self, query_canonical: &str) -> Vec<(ChunkId, f64)> {
        let terms: Vec<String> = tokenize(query_canonical)
            .into_iter()
            .map(|t| t.to_string())
            .collect();

        self.docs
            .iter()
            .map(|doc| {
                let mut score = 0.0;
                for term in &terms {
                    let tf = *doc.term_counts.get(term).unwrap_or(&0) as f64;
                    if tf == 0.0 {
                        continue;
                    }
                    let idf = self.idf(term);
                    let denom = tf
                        + self.params.k1
                            * (1.0 - self.params.b
                                + self.params.b * (doc.len as f64 / self.avg_doc_len.max(1.0)));
                    score += idf * (tf * (self.params.k1 + 1.0)) / denom;
                }
                (doc.chunk_id.clone(), score)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(n: u32) -> ChunkId {
        let org: esg_core::ids::OrgId = "ORG".parse().unwrap();
        let doc = esg_core::ids::DocId::new(&org, 2025);
        ChunkId::new(&doc, 1, n)
    }

    #[test]
    fn exact_term_match_scores_higher_than_no_match() {
        let c0 = cid(0);
        let c1 = cid(1);
        let chunks = vec![
            (&c0, "climate strategy and emissions targets"),
            (&c1, "unrelated text about quarterly revenue"),
        ];
        let idx = Bm25Index::build(chunks, Bm25Params::default());
        let scores = idx.score_query("climate emissions");
        let score_of = |id: &ChunkId| scores.iter().find(|(c, _)| c == id).unwrap().1;
        assert!(score_of(&c0) > score_of(&c1));
    }
}
