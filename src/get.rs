//! Document retrieval by id.
//!
//! Fetches a record and its chunks from the metadata store. Used by the
//! `docmill get` CLI command and the `GET /documents/{id}` endpoint.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::ingest::{self, IngestError};
use crate::models::{Chunk, DocumentStatus};

/// Document response shape served by `GET /documents/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentDetail {
    pub id: String,
    pub status: DocumentStatus,
    pub filename: String,
    pub size: i64,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    pub uploaded_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub chunk_count: i64,
}

/// Fetch one document with its chunk count.
pub async fn fetch_document(pool: &SqlitePool, id: &str) -> Result<DocumentDetail, IngestError> {
    let record = ingest::load_record(pool, id)
        .await?
        .ok_or_else(|| IngestError::NotFound(id.to_string()))?;
    let chunk_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE document_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(DocumentDetail {
        id: record.id,
        status: record.status,
        filename: record.filename,
        size: record.size_bytes,
        content_type: record.content_type,
        parse_error: record.parse_error,
        uploaded_at: record.created_at.to_rfc3339(),
        text: record.parsed_text,
        chunk_count,
    })
}

/// All chunks for a document, in index order.
pub async fn load_chunks(pool: &SqlitePool, id: &str) -> Result<Vec<Chunk>, IngestError> {
    let rows = sqlx::query(
        "SELECT chunk_index, text, start_offset, end_offset FROM chunks \
         WHERE document_id = ? ORDER BY chunk_index ASC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Chunk {
            index: row.get("chunk_index"),
            text: row.get("text"),
            start_offset: row.get("start_offset"),
            end_offset: row.get("end_offset"),
        })
        .collect())
}

/// CLI entry point: print one document's record and chunk layout.
pub async fn run_get(config: &Config, id: &str, include_text: bool) -> Result<()> {
    let pool = db::connect(config).await?;

    let record = match ingest::load_record(&pool, id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            pool.close().await;
            eprintln!("Error: document not found: {}", id);
            std::process::exit(1);
        }
        Err(err) => {
            pool.close().await;
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    };
    let chunks = load_chunks(&pool, id).await?;

    println!("--- Document ---");
    println!("id:            {}", record.id);
    println!("filename:      {}", record.filename);
    if record.original_name != record.filename {
        println!("original name: {}", record.original_name);
    }
    println!("status:        {}", record.status);
    println!("size:          {} bytes", record.size_bytes);
    println!("content_type:  {}", record.content_type);
    println!("sha256:        {}", record.sha256);
    if let Some(ref blob_ref) = record.blob_ref {
        println!("blob_ref:      {}", blob_ref);
    }
    println!("created_at:    {}", record.created_at.to_rfc3339());
    println!("updated_at:    {}", record.updated_at.to_rfc3339());
    if let Some(ref cause) = record.parse_error {
        println!("parse_error:   {}", cause);
    }
    println!();

    println!("--- Chunks ({}) ---", chunks.len());
    for chunk in &chunks {
        println!(
            "[chunk {}] {}..{} ({} chars)",
            chunk.index,
            chunk.start_offset,
            chunk.end_offset,
            chunk.end_offset - chunk.start_offset
        );
    }

    if include_text {
        if let Some(ref text) = record.parsed_text {
            println!();
            println!("--- Text ---");
            println!("{}", text);
        }
    }

    pool.close().await;
    Ok(())
}
