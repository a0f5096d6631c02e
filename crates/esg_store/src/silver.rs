//! `consolidate`: bronze partitions -> one deduplicated silver table per
//! `(org_id, year)` (C1 §4.1).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use esg_core::ids::OrgId;

use crate::columnar::{read_chunk_table, write_chunk_table, ChunkRow};
use crate::StoreError;

/// Walk every `theme=*` partition under `bronze_root/org_id=<O>/year=<Y>/`,
/// stable-sort by `chunk_id`, drop duplicates by `text_sha256` (keep-first),
/// and write the consolidated silver table.
///
/// Idempotent: re-running over the same bronze partitions produces the same
/// silver file, since input order is sorted before dedup, not partition
/// iteration order.
pub fn consolidate(bronze_root: &Path, silver_root: &Path, org_id: &OrgId, fiscal_year: u16) -> Result<PathBuf, StoreError> {
    let year_dir = bronze_root
        .join(format!("org_id={org_id}"))
        .join(format!("year={fiscal_year}"));

    if !year_dir.exists() {
        return Err(StoreError::Ingestion(format!(
            "no bronze partitions found under {}",
            year_dir.display()
        )));
    }

    let mut all_rows: Vec<ChunkRow> = Vec::new();
    for theme_entry in std::fs::read_dir(&year_dir).map_err(|e| StoreError::Io(e.to_string()))? {
        let theme_entry = theme_entry.map_err(|e| StoreError::Io(e.to_string()))?;
        let theme_path = theme_entry.path();
        if !theme_path.is_dir() {
            continue; // manifests live alongside as `<doc_id>.manifest.json`, not a partition
        }
        for file_entry in std::fs::read_dir(&theme_path).map_err(|e| StoreError::Io(e.to_string()))? {
            let file_entry = file_entry.map_err(|e| StoreError::Io(e.to_string()))?;
            let path = file_entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
                all_rows.extend(read_chunk_table(&path)?);
            }
        }
    }

    if all_rows.is_empty() {
        return Err(StoreError::Ingestion(
            "bronze consolidation produced an empty silver table".into(),
        ));
    }

    all_rows.sort_by(|a, b| a.chunk.chunk_id.as_str().cmp(b.chunk.chunk_id.as_str()));

    let mut seen_hashes: BTreeMap<String, ()> = BTreeMap::new();
    let mut deduped = Vec::with_capacity(all_rows.len());
    for row in all_rows {
        let key = row.chunk.text_sha256.as_hex().to_string();
        if seen_hashes.insert(key, ()).is_none() {
            deduped.push(row);
        }
    }

    let silver_path = silver_root
        .join(format!("org_id={org_id}"))
        .join(format!("year={fiscal_year}"))
        .join(format!("{org_id}_{fiscal_year}_chunks.parquet"));
    write_chunk_table(&silver_path, &deduped)?;
    Ok(silver_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silver_path_matches_on_disk_layout() {
        let org: OrgId = "LSE_HEAD".parse().unwrap();
        let path = PathBuf::from("data/silver")
            .join(format!("org_id={org}"))
            .join("year=2025")
            .join(format!("{org}_2025_chunks.parquet"));
        assert_eq!(
            path,
            PathBuf::from("data/silver/org_id=LSE_HEAD/year=2025/LSE_HEAD_2025_chunks.parquet")
        );
    }
}
