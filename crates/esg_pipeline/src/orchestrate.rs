//! Matrix Orchestrator (C6 §4.6): per-doc run protocol, triple-replay
//! determinism check, authenticity gates, and artifact emission.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use esg_algo::bm25::{Bm25Index, Bm25Params};
use esg_algo::embeddings::{self, EmbeddingIndex};
use esg_algo::evidence::{select_evidence, EvidenceRecord};
use esg_algo::fusion::{self, RankedChunk};
use esg_algo::scorer::{score_theme, ThemeScore};
use esg_core::ids::{ChunkId, DocId};
use esg_core::rubric::Rubric;
use esg_core::tokens::Theme;
use esg_io::cache::Cache;
use esg_io::config::EngineConfig;
use esg_io::hasher::trace_id_from_params;
use esg_io::IoError;
use esg_report::{narrate, ThemeNarrationInput};
use esg_store::clean::canonicalize;
use esg_store::columnar::read_chunk_table;
use esg_store::types::Chunk;

use crate::artifacts::{
    Attestation, AttestationEntry, DeterminismReport, DocContractEntry, DocGates, DocVerdict,
    EvidenceAuditReport, EvidenceAuditRow, FrameworkTokensReport, FrameworkTokensRow, GateStatus,
    OutputContract, ThemeScoreEntry, TopkVsEvidenceReport, TopkVsEvidenceRow,
};
use crate::gates::{determinism_gate, evidence_gate, offline_gate, parity_gate, provenance_gate};
use crate::PipelineError;

const TOP_K: usize = 50;
const ALPHA: f64 = 0.6;
const EMBEDDING_MODEL_ID: &str = "ibm/slate-125m-english-rtrvr";
const NARRATIVE_MODEL_ID: &str = "esg-narrative-editor/grounded-v1";
const FRAMEWORK_TOKENS: [&str; 4] = ["GRI", "SASB", "TCFD", "ISSB"];

fn theme_query(theme: Theme) -> &'static str {
    match theme {
        Theme::Tsp => "ESG transition strategy and planning climate targets",
        Theme::Osp => "ESG oversight and strategic positioning governance climate",
        Theme::Dm => "ESG disclosure maturity reporting scope",
        Theme::Ghg => "ESG climate strategy and GHG emissions targets",
        Theme::Rd => "ESG reporting disclosure framework alignment GRI SASB TCFD ISSB",
        Theme::Ei => "ESG engagement and incentives stakeholder climate",
        Theme::Rmm => "ESG risk management governance strategy risk management metrics and targets",
    }
}

fn detect_framework_tokens(texts: &[&str]) -> Vec<String> {
    FRAMEWORK_TOKENS
        .iter()
        .filter(|tok| texts.iter().any(|t| t.to_uppercase().contains(*tok)))
        .map(|t| t.to_string())
        .collect()
}

/// All of the per-theme intermediate state a single scoring pass produces,
/// kept around so the orchestrator can build every artifact without
/// recomputing.
struct ThemePass {
    score: ThemeScore,
    evidence: Vec<EvidenceRecord>,
    fused_topk: Vec<RankedChunk>,
}

/// Load silver chunks for `doc_id`, build the BM25 + dense indexes, and run
/// every theme once. Pure given `(rubric, silver, indexes)` — this is the
/// function invoked three times for the determinism check.
#[allow(clippy::too_many_arguments)]
fn score_all_themes(
    doc_id: &DocId,
    rubric: &Rubric,
    bm25: &Bm25Index,
    dense: &EmbeddingIndex,
    chunk_lookup: &HashMap<ChunkId, Chunk>,
    cache: &Cache,
    embed_live: &impl Fn(&str) -> Result<Vec<f32>, IoError>,
) -> Result<Vec<ThemePass>, PipelineError> {
    let mut passes = Vec::with_capacity(rubric.themes.len());

    for descriptor in &rubric.themes {
        let theme = descriptor.theme;
        let query_raw = theme_query(theme);
        let query_canonical = canonicalize(query_raw);

        let params = serde_json::json!({ "seed": dense.meta.seed });
        let input = serde_json::json!({ "text": query_canonical });
        let query_vector: Vec<f32> = cache
            .get_or_call(EMBEDDING_MODEL_ID, "embedding", &params, &input, || embed_live(&query_canonical))
            .map_err(PipelineError::Io)?;

        let fused = fusion::query(bm25, dense, &query_canonical, &query_vector, TOP_K, ALPHA)
            .map_err(|e| PipelineError::Retrieval(e.to_string()))?;

        let selection = select_evidence(doc_id, theme, &fused, chunk_lookup, &descriptor.keywords, descriptor.evidence_min);
        let score = score_theme(theme, &selection.evidence, rubric).map_err(|e| PipelineError::Rubric(e.to_string()))?;

        if let Some(reason) = &score.reason {
            tracing::warn!(
                doc_id = %doc_id,
                stage = "score",
                theme = ?theme,
                evidence_count = selection.evidence.len(),
                reason = %reason,
                "evidence gate downgraded theme score"
            );
        }

        passes.push(ThemePass {
            score,
            evidence: selection.evidence,
            fused_topk: fused,
        });
    }

    Ok(passes)
}

fn build_output_contract(
    doc_id: &DocId,
    rubric: &Rubric,
    passes: &[ThemePass],
    model_version: &str,
    deterministic_timestamp: &str,
) -> Result<OutputContract, PipelineError> {
    let trace_params = serde_json::json!({
        "doc_id": doc_id.as_str(),
        "rubric_version": rubric.version.as_str(),
        "deterministic_timestamp": deterministic_timestamp,
    });
    let trace_id = trace_id_from_params(&trace_params)?;

    Ok(OutputContract {
        trace_id,
        doc_id: doc_id.as_str().to_string(),
        scores: passes.iter().map(|p| ThemeScoreEntry::from(&p.score)).collect(),
        model_version: model_version.to_string(),
        rubric_version: rubric.version.as_str().to_string(),
        deterministic_timestamp: deterministic_timestamp.to_string(),
    })
}

pub struct DocRunOutcome {
    pub doc_id: String,
    pub gates: DocGates,
    pub verdict: DocVerdict,
    pub attestation: Attestation,
}

/// Run the full per-doc protocol: load silver, build/load indexes, score
/// every theme three times, verify, and write every artifact under
/// `artifacts_root/matrix/<doc_id>/…`.
pub fn run_doc(
    config: &EngineConfig,
    cache: &Cache,
    rubric: &Rubric,
    doc_id: &DocId,
    silver_path: &Path,
    index_dir: &Path,
    embed_live: impl Fn(&str) -> Result<Vec<f32>, IoError>,
    narrate_live: impl Fn(&str) -> Result<String, IoError>,
) -> Result<DocRunOutcome, PipelineError> {
    let rows = read_chunk_table(silver_path).map_err(|e| PipelineError::Store(e.to_string()))?;
    if rows.is_empty() {
        return Err(PipelineError::Store(format!("empty silver table for {doc_id}")));
    }

    let chunk_lookup: HashMap<ChunkId, Chunk> = rows.iter().map(|r| (r.chunk.chunk_id.clone(), r.chunk.clone())).collect();
    let bm25_pairs: Vec<(&ChunkId, &str)> = rows.iter().map(|r| (&r.chunk.chunk_id, r.text_canonical.as_str())).collect();
    let bm25 = Bm25Index::build(bm25_pairs, Bm25Params::default());

    let dense = if index_dir.join("meta.json").exists() {
        tracing::info!(doc_id = %doc_id, stage = "index", "loading existing dense index");
        embeddings::read_index(index_dir).map_err(|e| PipelineError::Retrieval(e.to_string()))?
    } else {
        tracing::info!(doc_id = %doc_id, stage = "index", chunk_count = rows.len(), "building dense index");
        let chunks_for_index: Vec<(ChunkId, String)> =
            rows.iter().map(|r| (r.chunk.chunk_id.clone(), r.text_canonical.clone())).collect();
        let index = embeddings::build_index(
            cache,
            EMBEDDING_MODEL_ID,
            config.seed,
            &config.deterministic_timestamp,
            &chunks_for_index,
            &embed_live,
        )
        .map_err(|e| PipelineError::Retrieval(e.to_string()))?;
        embeddings::write_index(index_dir, &index).map_err(|e| PipelineError::Retrieval(e.to_string()))?;
        index
    };

    let mut hashes = Vec::with_capacity(3);
    let mut last_passes: Option<Vec<ThemePass>> = None;
    let mut output_paths = Vec::with_capacity(3);

    for run_no in 1..=3 {
        let passes = score_all_themes(doc_id, rubric, &bm25, &dense, &chunk_lookup, cache, &embed_live)?;
        let output = build_output_contract(doc_id, rubric, &passes, EMBEDDING_MODEL_ID, &config.deterministic_timestamp)?;

        let run_dir = config
            .artifacts_root
            .join("matrix")
            .join(doc_id.as_str())
            .join("baseline")
            .join(format!("run_{run_no}"));
        std::fs::create_dir_all(&run_dir).map_err(|e| PipelineError::Io(IoError::Path(e.to_string())))?;
        let output_path = run_dir.join("output.json");
        let hash = output.write(&output_path)?;
        hashes.push(hash);
        output_paths.push(output_path);
        last_passes = Some(passes);
    }

    let passes = last_passes.expect("loop runs exactly three times");
    let determinism_report = DeterminismReport::from_hashes([hashes[0].clone(), hashes[1].clone(), hashes[2].clone()]);
    let baseline_dir = config.artifacts_root.join("matrix").join(doc_id.as_str()).join("baseline");
    let determinism_path = baseline_dir.join("determinism_report.json");
    let determinism_hash = determinism_report.write(&determinism_path)?;

    let validation_dir = config.artifacts_root.join("matrix").join(doc_id.as_str()).join("pipeline_validation");

    let topk_rows: Vec<TopkVsEvidenceRow> = passes
        .iter()
        .map(|p| {
            let evidence_ids: Vec<ChunkId> = p.evidence.iter().map(|e| e.chunk_id.clone()).collect();
            let topk_ids: Vec<ChunkId> = p.fused_topk.iter().map(|r| r.chunk_id.clone()).collect();
            TopkVsEvidenceRow::compute(p.score.theme, &evidence_ids, &topk_ids)
        })
        .collect();
    let topk_report = TopkVsEvidenceReport { rows: topk_rows };
    let topk_hash = topk_report.write(&validation_dir.join("demo_topk_vs_evidence.json"))?;

    let audit_rows: Vec<EvidenceAuditRow> = passes
        .iter()
        .map(|p| {
            let unique_pages: std::collections::HashSet<u32> = p.evidence.iter().map(|e| e.page_no).collect();
            let pass = match p.score.stage {
                Some(0) | None => true,
                Some(_) => p.evidence.len() >= rubric.descriptor(p.score.theme).map(|d| d.evidence_min).unwrap_or(2) && unique_pages.len() >= 2,
            };
            EvidenceAuditRow {
                theme: p.score.theme,
                evidence_count: p.evidence.len(),
                unique_pages: unique_pages.len(),
                pass,
            }
        })
        .collect();
    let evidence_report = EvidenceAuditReport { rows: audit_rows };
    let evidence_hash = evidence_report.write(&validation_dir.join("evidence_audit.json"))?;

    let framework_rows: Vec<FrameworkTokensRow> = passes
        .iter()
        .map(|p| {
            let texts: Vec<&str> = p.evidence.iter().map(|e| e.quote.as_str()).collect();
            FrameworkTokensRow {
                theme: p.score.theme,
                framework_tokens: detect_framework_tokens(&texts),
            }
        })
        .collect();
    let framework_report = FrameworkTokensReport { rows: framework_rows };
    let framework_hash = framework_report.write(&validation_dir.join("rd_sources.json"))?;

    let narration_inputs: Vec<ThemeNarrationInput<'_>> = passes
        .iter()
        .map(|p| ThemeNarrationInput {
            score: &p.score,
            descriptor: p.score.descriptor.as_str(),
            evidence: p.evidence.as_slice(),
        })
        .collect();
    tracing::info!(doc_id = %doc_id, stage = "narrate", theme_count = narration_inputs.len(), "composing grounded narrative");
    let narrative = narrate(
        cache,
        NARRATIVE_MODEL_ID,
        doc_id,
        &config.deterministic_timestamp,
        &narration_inputs,
        &narrate_live,
    )
    .map_err(|e| {
        tracing::error!(doc_id = %doc_id, stage = "narrate", error = %e, "narrative generation failed");
        PipelineError::Report(e.to_string())
    })?;
    let narrative_path = config.artifacts_root.join("matrix").join(doc_id.as_str()).join("narrative.json");
    let narrative_hash = crate::artifacts::write_narrative(&narrative_path, &narrative)?;

    let determinism_status = determinism_gate(&determinism_report);
    let parity_status = parity_gate(&topk_report);
    let evidence_status = evidence_gate(&evidence_report);
    let provenance_status = provenance_gate(doc_id.as_str(), &passes.iter().flat_map(|p| p.evidence.clone()).collect::<Vec<_>>(), |id| {
        chunk_lookup.get(&ChunkId::try_from(id).ok()?).map(|c| c.text.clone())
    });
    let offline_status = offline_gate(config.offline_replay, 0);

    let gates = DocGates {
        determinism: determinism_status,
        parity: parity_status,
        evidence: evidence_status,
        provenance: provenance_status,
        offline: offline_status,
    };

    let verdict = if determinism_status == GateStatus::Fail || provenance_status == GateStatus::Fail {
        DocVerdict::Fail
    } else if gates.all_pass() {
        DocVerdict::Ok
    } else {
        DocVerdict::Revise
    };

    let mut entries = vec![
        AttestationEntry { artifact: "baseline/determinism_report.json".into(), sha256: determinism_hash },
        AttestationEntry { artifact: "pipeline_validation/demo_topk_vs_evidence.json".into(), sha256: topk_hash },
        AttestationEntry { artifact: "pipeline_validation/evidence_audit.json".into(), sha256: evidence_hash },
        AttestationEntry { artifact: "pipeline_validation/rd_sources.json".into(), sha256: framework_hash },
        AttestationEntry { artifact: "narrative.json".into(), sha256: narrative_hash },
    ];
    for (run_no, hash) in hashes.iter().enumerate() {
        entries.push(AttestationEntry {
            artifact: format!("baseline/run_{}/output.json", run_no + 1),
            sha256: hash.clone(),
        });
    }

    let attestation = Attestation {
        doc_id: doc_id.as_str().to_string(),
        model_version: format!("{EMBEDDING_MODEL_ID}+{NARRATIVE_MODEL_ID}"),
        rubric_version: rubric.version.as_str().to_string(),
        seed: config.seed,
        deterministic_timestamp: config.deterministic_timestamp.clone(),
        entries,
    };
    attestation.write(&config.artifacts_root.join("matrix").join(doc_id.as_str()).join("attestation.json"))?;
    tracing::info!(doc_id = %doc_id, stage = "gates", gates = ?gates, verdict = ?verdict, "doc run complete");

    Ok(DocRunOutcome {
        doc_id: doc_id.as_str().to_string(),
        gates,
        verdict,
        attestation,
    })
}

pub fn to_contract_entry(outcome: &DocRunOutcome) -> DocContractEntry {
    DocContractEntry {
        doc_id: outcome.doc_id.clone(),
        gates: outcome.gates.clone(),
        verdict: outcome.verdict,
        first_failing_gate: outcome.gates.first_failing_gate().map(str::to_string),
    }
}

pub fn silver_path_for(config: &EngineConfig, doc_id: &DocId, org_id: &esg_core::ids::OrgId, fiscal_year: u16) -> PathBuf {
    config
        .data_root
        .join("silver")
        .join(format!("org_id={org_id}"))
        .join(format!("year={fiscal_year}"))
        .join(format!("{}_chunks.parquet", doc_id.as_str()))
}

pub fn index_dir_for(config: &EngineConfig, doc_id: &DocId) -> PathBuf {
    config.data_root.join("index").join(doc_id.as_str())
}
