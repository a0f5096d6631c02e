//! `ingest`: PDF bytes -> page-anchored chunks -> bronze layer (C1 §4.1).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use esg_core::ids::{ChunkId, DocId, OrgId, Sha256};
use esg_io::canonical_json::write_canonical_file;
use esg_io::hasher::sha256_hex;

use crate::clean::{canonicalize, classify, clean_raw_text, non_printable_fraction, split_into_chunks, CleanStatus};
use crate::columnar::{write_chunk_table, ChunkRow};
use crate::types::{Chunk, ChunkStatus, IngestionManifest, ManifestChunkEntry};
use crate::StoreError;

const UNASSIGNED_PARTITION: &str = "UNASSIGNED";

/// Extract text per page, split into paragraph-sized chunks, clean and
/// hash each, write one Parquet partition per theme hint plus the
/// canonical-JSON ingestion manifest, and return that manifest.
///
/// Theme hints are not known at ingestion time in this engine (assignment
/// is the scorer's job downstream); every chunk therefore currently lands
/// in the `UNASSIGNED` partition. The partitioning scheme stays
/// theme-keyed regardless, so a future upstream hinting pass needs no
/// schema change.
pub fn ingest(
    bronze_root: &Path,
    doc_id: &DocId,
    org_id: &OrgId,
    fiscal_year: u16,
    pdf_bytes: &[u8],
) -> Result<IngestionManifest, StoreError> {
    let source_sha256 = Sha256::try_from(sha256_hex(pdf_bytes).as_str())
        .map_err(|e| StoreError::Canon(e.to_string()))?;

    let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        .map_err(|e| StoreError::Ingestion(format!("pdf extraction failed: {e}")))?;
    if pages.is_empty() {
        return Err(StoreError::Ingestion("PDF produced no pages".into()));
    }

    let mut partitions: BTreeMap<String, Vec<ChunkRow>> = BTreeMap::new();
    let mut manifest_entries = Vec::new();
    let mut skipped_pages = Vec::new();
    let mut min_page = u32::MAX;
    let mut max_page = 0u32;
    let mut index_in_doc = 0u32;

    for (zero_based, raw_page_text) in pages.iter().enumerate() {
        let page_no = (zero_based as u32) + 1;

        if raw_page_text.trim().is_empty() {
            skipped_pages.push(page_no);
            continue;
        }

        let cleaned_page = clean_raw_text(raw_page_text);
        if cleaned_page.is_empty() {
            skipped_pages.push(page_no);
            continue;
        }

        min_page = min_page.min(page_no);
        max_page = max_page.max(page_no);

        for (char_start, char_end, text) in split_into_chunks(&cleaned_page, None) {
            let npf = non_printable_fraction(raw_page_text);
            let status = match classify(raw_page_text) {
                CleanStatus::Clean => ChunkStatus::Clean,
                CleanStatus::Suspect => ChunkStatus::Suspect,
            };

            let chunk_id = ChunkId::new(doc_id, page_no, index_in_doc);
            index_in_doc += 1;

            let text_canonical = canonicalize(&text);
            let text_sha256 = Sha256::try_from(sha256_hex(text.as_bytes()).as_str())
                .map_err(|e| StoreError::Canon(e.to_string()))?;

            manifest_entries.push(ManifestChunkEntry {
                chunk_id: chunk_id.clone(),
                status,
                non_printable_fraction: npf,
            });

            let chunk = Chunk {
                chunk_id,
                doc_id: doc_id.clone(),
                page_no,
                char_start,
                char_end,
                text,
                text_sha256,
                theme_hint: None,
            };

            partitions
                .entry(UNASSIGNED_PARTITION.to_string())
                .or_default()
                .push(ChunkRow {
                    chunk,
                    text_canonical,
                    status,
                });
        }
    }

    if manifest_entries.is_empty() {
        return Err(StoreError::Ingestion(
            "no chunks passed cleaning for this document".into(),
        ));
    }

    for (theme, rows) in &partitions {
        let path = partition_path(bronze_root, org_id, fiscal_year, theme, doc_id);
        write_chunk_table(&path, rows)?;
    }

    let manifest = IngestionManifest {
        doc_id: doc_id.clone(),
        org_id: org_id.clone(),
        fiscal_year,
        source_sha256,
        chunk_count: manifest_entries.len(),
        page_range: (min_page, max_page),
        chunks: manifest_entries,
        skipped_pages,
    };

    let manifest_path = manifest_path(bronze_root, org_id, fiscal_year, doc_id);
    let manifest_value =
        serde_json::to_value(&manifest).map_err(|e| StoreError::Canon(e.to_string()))?;
    write_canonical_file(&manifest_path, &manifest_value)
        .map_err(|e| StoreError::Io(e.to_string()))?;

    Ok(manifest)
}

fn partition_path(
    bronze_root: &Path,
    org_id: &OrgId,
    fiscal_year: u16,
    theme: &str,
    doc_id: &DocId,
) -> PathBuf {
    bronze_root
        .join(format!("org_id={org_id}"))
        .join(format!("year={fiscal_year}"))
        .join(format!("theme={theme}"))
        .join(format!("{doc_id}.parquet"))
}

fn manifest_path(bronze_root: &Path, org_id: &OrgId, fiscal_year: u16, doc_id: &DocId) -> PathBuf {
    bronze_root
        .join(format!("org_id={org_id}"))
        .join(format!("year={fiscal_year}"))
        .join(format!("{doc_id}.manifest.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_path_matches_on_disk_layout() {
        let org: OrgId = "LSE_HEAD".parse().unwrap();
        let doc = DocId::new(&org, 2025);
        let path = partition_path(Path::new("data/bronze"), &org, 2025, "UNASSIGNED", &doc);
        assert_eq!(
            path,
            PathBuf::from("data/bronze/org_id=LSE_HEAD/year=2025/theme=UNASSIGNED/LSE_HEAD_2025.parquet")
        );
    }
}
