//! Columnar (Parquet) read/write for chunk tables. One schema serves both
//! bronze (theme-partitioned, one file per ingest) and silver (one
//! consolidated file per `(org_id, year)`): the chunk-store's single
//! source of structural truth (Design Notes: "JSON-as-Parquet misnomer" —
//! anything with a columnar extension must actually be columnar).

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow_array::{RecordBatch, StringArray, UInt32Array, UInt64Array};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;

use crate::types::{Chunk, ChunkStatus};
use crate::StoreError;
use esg_core::ids::{ChunkId, DocId, Sha256};

fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("chunk_id", DataType::Utf8, false),
        Field::new("doc_id", DataType::Utf8, false),
        Field::new("page_no", DataType::UInt32, false),
        Field::new("char_start", DataType::UInt64, false),
        Field::new("char_end", DataType::UInt64, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("text_canonical", DataType::Utf8, false),
        Field::new("text_sha256", DataType::Utf8, false),
        Field::new("theme_hint", DataType::Utf8, true),
        Field::new("status", DataType::Utf8, false),
    ]))
}

/// A chunk plus the two fields the table needs but the in-memory `Chunk`
/// type doesn't carry: its canonical text and cleaning status.
pub struct ChunkRow {
    pub chunk: Chunk,
    pub text_canonical: String,
    pub status: ChunkStatus,
}

pub fn write_chunk_table(path: &Path, rows: &[ChunkRow]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
    }
    let schema = schema();

    let chunk_id = StringArray::from_iter_values(rows.iter().map(|r| r.chunk.chunk_id.as_str()));
    let doc_id = StringArray::from_iter_values(rows.iter().map(|r| r.chunk.doc_id.as_str()));
    let page_no = UInt32Array::from_iter_values(rows.iter().map(|r| r.chunk.page_no));
    let char_start = UInt64Array::from_iter_values(rows.iter().map(|r| r.chunk.char_start as u64));
    let char_end = UInt64Array::from_iter_values(rows.iter().map(|r| r.chunk.char_end as u64));
    let text = StringArray::from_iter_values(rows.iter().map(|r| r.chunk.text.as_str()));
    let text_canonical = StringArray::from_iter_values(rows.iter().map(|r| r.text_canonical.as_str()));
    let text_sha256 = StringArray::from_iter_values(rows.iter().map(|r| r.chunk.text_sha256.as_hex()));
    let theme_hint = StringArray::from_iter(rows.iter().map(|r| r.chunk.theme_hint.as_deref()));
    let status = StringArray::from_iter_values(rows.iter().map(|r| match r.status {
        ChunkStatus::Clean => "clean",
        ChunkStatus::Suspect => "suspect",
    }));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(chunk_id),
            Arc::new(doc_id),
            Arc::new(page_no),
            Arc::new(char_start),
            Arc::new(char_end),
            Arc::new(text),
            Arc::new(text_canonical),
            Arc::new(text_sha256),
            Arc::new(theme_hint),
            Arc::new(status),
        ],
    )
    .map_err(|e| StoreError::Canon(e.to_string()))?;

    let file = File::create(path).map_err(|e| StoreError::Io(e.to_string()))?;
    let mut writer =
        ArrowWriter::try_new(file, schema, None).map_err(|e| StoreError::Io(e.to_string()))?;
    writer.write(&batch).map_err(|e| StoreError::Io(e.to_string()))?;
    writer.close().map_err(|e| StoreError::Io(e.to_string()))?;
    Ok(())
}

pub fn read_chunk_table(path: &Path) -> Result<Vec<ChunkRow>, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::Io(e.to_string()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| StoreError::Io(e.to_string()))?
        .build()
        .map_err(|e| StoreError::Io(e.to_string()))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| StoreError::Io(e.to_string()))?;
        rows.extend(rows_from_batch(&batch)?);
    }
    Ok(rows)
}

fn rows_from_batch(batch: &RecordBatch) -> Result<Vec<ChunkRow>, StoreError> {
    let col = |name: &str| -> Result<&StringArray, StoreError> {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| StoreError::Canon(format!("missing/invalid column {name}")))
    };
    let chunk_id = col("chunk_id")?;
    let doc_id = col("doc_id")?;
    let text = col("text")?;
    let text_canonical = col("text_canonical")?;
    let text_sha256 = col("text_sha256")?;
    let theme_hint = col("theme_hint")?;
    let status = col("status")?;

    let page_no = batch
        .column_by_name("page_no")
        .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| StoreError::Canon("missing page_no".into()))?;
    let char_start = batch
        .column_by_name("char_start")
        .and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
        .ok_or_else(|| StoreError::Canon("missing char_start".into()))?;
    let char_end = batch
        .column_by_name("char_end")
        .and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
        .ok_or_else(|| StoreError::Canon("missing char_end".into()))?;

    let mut rows = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let chunk = Chunk {
            chunk_id: ChunkId::try_from(chunk_id.value(i))
                .map_err(|e| StoreError::Canon(e.to_string()))?,
            doc_id: DocId::try_from(doc_id.value(i)).map_err(|e| StoreError::Canon(e.to_string()))?,
            page_no: page_no.value(i),
            char_start: char_start.value(i) as usize,
            char_end: char_end.value(i) as usize,
            text: text.value(i).to_string(),
            text_sha256: Sha256::try_from(text_sha256.value(i))
                .map_err(|e| StoreError::Canon(e.to_string()))?,
            theme_hint: if theme_hint.is_null(i) {
                None
            } else {
                Some(theme_hint.value(i).to_string())
            },
        };
        let status_val = if status.value(i) == "suspect" {
            ChunkStatus::Suspect
        } else {
            ChunkStatus::Clean
        };
        rows.push(ChunkRow {
            chunk,
            text_canonical: text_canonical.value(i).to_string(),
            status: status_val,
        });
    }
    Ok(rows)
}
