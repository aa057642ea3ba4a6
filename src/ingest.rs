//! Ingestion pipeline orchestration.
//!
//! Drives one document through validation → record creation → blob write →
//! text extraction → chunking. Every status transition is committed before
//! the next stage runs, so an interrupted pipeline always leaves a record
//! whose status says exactly how far it got.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::blob::{self, BlobError, BlobStore};
use crate::chunk::chunk_text;
use crate::config::{ChunkingConfig, Config};
use crate::db;
use crate::extract::{self, ExtractError, PdfExtractor, TextExtractor, MIME_PDF};
use crate::models::{Chunk, DocumentRecord, DocumentStatus};

/// Pipeline failure surfaced to callers.
///
/// `InvalidInput` always means nothing was written. `Storage` wraps the blob
/// layer; hitting it after a record exists finalizes that record at
/// `store_failed`. `Invariant` marks states the pipeline is supposed to make
/// impossible, such as a backwards status transition.
#[derive(Debug)]
pub enum IngestError {
    InvalidInput(String),
    NotFound(String),
    Storage(BlobError),
    Invariant(String),
    Db(sqlx::Error),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            IngestError::NotFound(id) => write!(f, "document not found: {}", id),
            IngestError::Storage(err) => write!(f, "{}", err),
            IngestError::Invariant(msg) => write!(f, "internal invariant violation: {}", msg),
            IngestError::Db(err) => write!(f, "metadata store error: {}", err),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Storage(err) => Some(err),
            IngestError::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        IngestError::Db(err)
    }
}

impl From<BlobError> for IngestError {
    fn from(err: BlobError) -> Self {
        IngestError::Storage(err)
    }
}

/// Runs the ingestion pipeline.
///
/// Owns the metadata pool plus the blob and extraction backends behind trait
/// objects, so the HTTP server, the CLI, and tests all drive the same
/// pipeline with interchangeable backends.
pub struct Ingestor {
    pool: SqlitePool,
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn TextExtractor>,
    chunking: ChunkingConfig,
}

impl Ingestor {
    pub fn new(
        pool: SqlitePool,
        blobs: Arc<dyn BlobStore>,
        extractor: Arc<dyn TextExtractor>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            pool,
            blobs,
            extractor,
            chunking,
        }
    }

    /// Ingest one uploaded document through the full pipeline.
    ///
    /// Validation failures reject the upload before any record or blob is
    /// written. Once the record exists the call only fails hard on storage
    /// or database trouble; an extraction failure finalizes the record at
    /// `parse_failed` and still returns it, leaving the stored blob in
    /// place for a later `reingest`.
    pub async fn ingest(
        &self,
        original_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<DocumentRecord, IngestError> {
        let filename = validate_upload(original_name, content_type, bytes)?;

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sha256 = format!("{:x}", hasher.finalize());

        let now = Utc::now();
        let mut record = DocumentRecord {
            id: Uuid::new_v4().to_string(),
            filename,
            original_name: original_name.to_string(),
            size_bytes: bytes.len() as i64,
            content_type: MIME_PDF.to_string(),
            sha256,
            blob_ref: None,
            status: DocumentStatus::Received,
            parsed_text: None,
            parse_error: None,
            created_at: now,
            updated_at: now,
        };
        insert_received(&self.pool, &record).await?;
        info!(
            id = %record.id,
            name = %record.original_name,
            size = record.size_bytes,
            "document received"
        );

        let blob_name = format!("{}/{}", record.id, record.filename);
        match self.blobs.store(&blob_name, bytes).await {
            Ok(blob_ref) => {
                mark_stored(&self.pool, &mut record, blob_ref).await?;
            }
            Err(err) => {
                warn!(id = %record.id, error = %err, "blob write failed");
                mark_store_failed(&self.pool, &mut record).await?;
                return Err(IngestError::Storage(err));
            }
        }

        let text = match self.extractor.extract(bytes, &record.content_type) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                // An extractor handing back whitespace must never produce a
                // "parsed" record with nothing in it.
                let cause = ExtractError::Empty.to_string();
                warn!(id = %record.id, error = %cause, "extraction yielded no text");
                mark_parse_failed(&self.pool, &mut record, &cause).await?;
                return Ok(record);
            }
            Err(err) => {
                let cause = err.to_string();
                warn!(id = %record.id, error = %cause, "extraction failed");
                mark_parse_failed(&self.pool, &mut record, &cause).await?;
                return Ok(record);
            }
        };
        mark_parsed(&self.pool, &mut record, &text).await?;

        let chunks = chunk_text(&text, self.chunking.max_chars, self.chunking.overlap_chars)
            .map_err(|err| IngestError::Invariant(err.to_string()))?;
        attach_chunks(&self.pool, &mut record, &chunks).await?;
        info!(id = %record.id, chunks = chunks.len(), "document chunked");

        Ok(record)
    }

    /// Re-run the pipeline for an existing document from its stored blob.
    ///
    /// Statuses never move backwards, so reprocessing produces a fresh
    /// record over the retained bytes instead of rewinding the old one.
    pub async fn reingest(&self, id: &str) -> Result<DocumentRecord, IngestError> {
        let existing = load_record(&self.pool, id)
            .await?
            .ok_or_else(|| IngestError::NotFound(id.to_string()))?;
        let blob_ref = existing.blob_ref.as_deref().ok_or_else(|| {
            IngestError::InvalidInput(format!(
                "document {} has no stored blob to reingest (status {})",
                id, existing.status
            ))
        })?;
        let bytes = self.blobs.fetch(blob_ref).await?;
        info!(id = %id, blob_ref = %blob_ref, "reingesting from stored blob");
        self.ingest(&existing.original_name, &existing.content_type, &bytes)
            .await
    }

    /// Replace a document's chunks from its stored parsed text.
    ///
    /// Applies the current chunking policy to a `parsed` or `chunked`
    /// record. The chunk set is replaced wholesale in one transaction; a
    /// record that never reached `parsed` has nothing to rechunk.
    pub async fn rechunk(&self, id: &str) -> Result<DocumentRecord, IngestError> {
        let mut record = load_record(&self.pool, id)
            .await?
            .ok_or_else(|| IngestError::NotFound(id.to_string()))?;
        let text = record.parsed_text.clone().ok_or_else(|| {
            IngestError::InvalidInput(format!(
                "document {} has no parsed text to rechunk (status {})",
                id, record.status
            ))
        })?;
        let chunks = chunk_text(&text, self.chunking.max_chars, self.chunking.overlap_chars)
            .map_err(|err| IngestError::Invariant(err.to_string()))?;
        attach_chunks(&self.pool, &mut record, &chunks).await?;
        info!(id = %record.id, chunks = chunks.len(), "document rechunked");
        Ok(record)
    }
}

/// Validate an upload before anything is written.
///
/// Checks run in a fixed order: filename, extension, declared content type,
/// non-empty body, file signature. The first failure wins, so rejections are
/// deterministic for a given input. Returns the sanitized storage filename.
fn validate_upload(
    original_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<String, IngestError> {
    let filename = sanitize_filename(original_name).ok_or_else(|| {
        IngestError::InvalidInput(format!("unusable filename: {:?}", original_name))
    })?;
    if !filename.to_ascii_lowercase().ends_with(".pdf") {
        return Err(IngestError::InvalidInput(format!(
            "unsupported file extension for '{}': only .pdf files are accepted",
            filename
        )));
    }
    if !extract::is_pdf_content_type(content_type) {
        return Err(IngestError::InvalidInput(format!(
            "unsupported content type '{}': expected {}",
            content_type, MIME_PDF
        )));
    }
    if bytes.is_empty() {
        return Err(IngestError::InvalidInput("file is empty".to_string()));
    }
    if !extract::has_pdf_signature(bytes) {
        return Err(IngestError::InvalidInput(
            "file does not start with a PDF signature".to_string(),
        ));
    }
    Ok(filename)
}

/// Reduce a caller-supplied name to a safe base name for storage addressing.
///
/// Uploads from some clients carry full paths; only the final component is
/// kept, with control characters stripped. Returns `None` when nothing
/// usable remains.
fn sanitize_filename(original: &str) -> Option<String> {
    let base = original
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(original);
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return None;
    }
    Some(cleaned.to_string())
}

fn ensure_transition(record: &DocumentRecord, next: DocumentStatus) -> Result<(), IngestError> {
    if !record.status.can_advance_to(next) {
        return Err(IngestError::Invariant(format!(
            "illegal status transition {} -> {} for document {}",
            record.status, next, record.id
        )));
    }
    Ok(())
}

async fn insert_received(pool: &SqlitePool, record: &DocumentRecord) -> Result<(), IngestError> {
    sqlx::query(
        r#"
        INSERT INTO documents
            (id, filename, original_name, size_bytes, content_type, sha256,
             blob_ref, status, parsed_text, parse_error, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.filename)
    .bind(&record.original_name)
    .bind(record.size_bytes)
    .bind(&record.content_type)
    .bind(&record.sha256)
    .bind(&record.blob_ref)
    .bind(record.status.as_str())
    .bind(&record.parsed_text)
    .bind(&record.parse_error)
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Commit `received` → `stored`, recording the blob reference.
///
/// The `blob_ref IS NULL` guard keeps the reference set-once even if two
/// pipelines somehow race on the same id.
async fn mark_stored(
    pool: &SqlitePool,
    record: &mut DocumentRecord,
    blob_ref: String,
) -> Result<(), IngestError> {
    ensure_transition(record, DocumentStatus::Stored)?;
    let now = Utc::now();
    let result = sqlx::query(
        "UPDATE documents SET status = ?, blob_ref = ?, updated_at = ? \
         WHERE id = ? AND status = ? AND blob_ref IS NULL",
    )
    .bind(DocumentStatus::Stored.as_str())
    .bind(&blob_ref)
    .bind(now.to_rfc3339())
    .bind(&record.id)
    .bind(record.status.as_str())
    .execute(pool)
    .await?;
    if result.rows_affected() != 1 {
        return Err(IngestError::Invariant(format!(
            "document {} changed out from under the stored transition",
            record.id
        )));
    }
    record.status = DocumentStatus::Stored;
    record.blob_ref = Some(blob_ref);
    record.updated_at = now;
    Ok(())
}

async fn mark_store_failed(
    pool: &SqlitePool,
    record: &mut DocumentRecord,
) -> Result<(), IngestError> {
    ensure_transition(record, DocumentStatus::StoreFailed)?;
    let now = Utc::now();
    let result =
        sqlx::query("UPDATE documents SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(DocumentStatus::StoreFailed.as_str())
            .bind(now.to_rfc3339())
            .bind(&record.id)
            .bind(record.status.as_str())
            .execute(pool)
            .await?;
    if result.rows_affected() != 1 {
        return Err(IngestError::Invariant(format!(
            "document {} changed out from under the store_failed transition",
            record.id
        )));
    }
    record.status = DocumentStatus::StoreFailed;
    record.updated_at = now;
    Ok(())
}

async fn mark_parsed(
    pool: &SqlitePool,
    record: &mut DocumentRecord,
    text: &str,
) -> Result<(), IngestError> {
    ensure_transition(record, DocumentStatus::Parsed)?;
    let now = Utc::now();
    let result = sqlx::query(
        "UPDATE documents SET status = ?, parsed_text = ?, updated_at = ? \
         WHERE id = ? AND status = ?",
    )
    .bind(DocumentStatus::Parsed.as_str())
    .bind(text)
    .bind(now.to_rfc3339())
    .bind(&record.id)
    .bind(record.status.as_str())
    .execute(pool)
    .await?;
    if result.rows_affected() != 1 {
        return Err(IngestError::Invariant(format!(
            "document {} changed out from under the parsed transition",
            record.id
        )));
    }
    record.status = DocumentStatus::Parsed;
    record.parsed_text = Some(text.to_string());
    record.updated_at = now;
    Ok(())
}

async fn mark_parse_failed(
    pool: &SqlitePool,
    record: &mut DocumentRecord,
    cause: &str,
) -> Result<(), IngestError> {
    ensure_transition(record, DocumentStatus::ParseFailed)?;
    let now = Utc::now();
    let result = sqlx::query(
        "UPDATE documents SET status = ?, parse_error = ?, updated_at = ? \
         WHERE id = ? AND status = ?",
    )
    .bind(DocumentStatus::ParseFailed.as_str())
    .bind(cause)
    .bind(now.to_rfc3339())
    .bind(&record.id)
    .bind(record.status.as_str())
    .execute(pool)
    .await?;
    if result.rows_affected() != 1 {
        return Err(IngestError::Invariant(format!(
            "document {} changed out from under the parse_failed transition",
            record.id
        )));
    }
    record.status = DocumentStatus::ParseFailed;
    record.parse_error = Some(cause.to_string());
    record.updated_at = now;
    Ok(())
}

/// Replace a document's chunk set and commit `chunked` in one transaction.
///
/// Accepts records in `parsed` (first chunking) or `chunked` (rechunk); any
/// failure before commit rolls the whole batch back, so the chunk set is
/// never partially updated.
async fn attach_chunks(
    pool: &SqlitePool,
    record: &mut DocumentRecord,
    chunks: &[Chunk],
) -> Result<(), IngestError> {
    let from = record.status;
    if !(from.can_advance_to(DocumentStatus::Chunked) || from == DocumentStatus::Chunked) {
        return Err(IngestError::Invariant(format!(
            "cannot chunk document {} in status {}",
            record.id, from
        )));
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM chunks WHERE document_id = ?")
        .bind(&record.id)
        .execute(&mut *tx)
        .await?;

    for chunk in chunks {
        sqlx::query(
            "INSERT INTO chunks (document_id, chunk_index, text, start_offset, end_offset) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(chunk.index)
        .bind(&chunk.text)
        .bind(chunk.start_offset)
        .bind(chunk.end_offset)
        .execute(&mut *tx)
        .await?;
    }

    let result = sqlx::query(
        "UPDATE documents SET status = ?, updated_at = ? WHERE id = ? AND status IN (?, ?)",
    )
    .bind(DocumentStatus::Chunked.as_str())
    .bind(now.to_rfc3339())
    .bind(&record.id)
    .bind(DocumentStatus::Parsed.as_str())
    .bind(DocumentStatus::Chunked.as_str())
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() != 1 {
        return Err(IngestError::Invariant(format!(
            "document {} changed out from under the chunk transaction",
            record.id
        )));
    }

    tx.commit().await?;
    record.status = DocumentStatus::Chunked;
    record.updated_at = now;
    Ok(())
}

pub(crate) async fn load_record(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<DocumentRecord>, IngestError> {
    let row = sqlx::query(
        "SELECT id, filename, original_name, size_bytes, content_type, sha256, blob_ref, \
                status, parsed_text, parse_error, created_at, updated_at \
         FROM documents WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(record_from_row).transpose()
}

fn record_from_row(row: SqliteRow) -> Result<DocumentRecord, IngestError> {
    let status: DocumentStatus = row
        .get::<String, _>("status")
        .parse()
        .map_err(IngestError::Invariant)?;
    Ok(DocumentRecord {
        id: row.get("id"),
        filename: row.get("filename"),
        original_name: row.get("original_name"),
        size_bytes: row.get("size_bytes"),
        content_type: row.get("content_type"),
        sha256: row.get("sha256"),
        blob_ref: row.get("blob_ref"),
        status,
        parsed_text: row.get("parsed_text"),
        parse_error: row.get("parse_error"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, IngestError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| IngestError::Invariant(format!("unreadable timestamp '{}': {}", raw, err)))
}

/// CLI: ingest one file, or every `.pdf` under a directory.
pub async fn run_ingest(config: &Config, path: &Path) -> Result<()> {
    let files = collect_pdf_paths(path)?;
    if files.is_empty() {
        bail!("no .pdf files found under {}", path.display());
    }

    let pool = db::connect(config).await?;
    let blobs = blob::open_blob_store(&config.blob).await?;
    let ingestor = Ingestor::new(
        pool.clone(),
        blobs,
        Arc::new(PdfExtractor),
        config.chunking.clone(),
    );

    println!("ingest {}", path.display());
    println!("  files found: {}", files.len());

    let mut chunked = 0usize;
    let mut parse_failures = 0usize;
    let mut failures = 0usize;

    for file in &files {
        let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        match ingestor.ingest(name, MIME_PDF, &bytes).await {
            Ok(record) => match record.status {
                DocumentStatus::Chunked => {
                    chunked += 1;
                    println!("  {} -> {} [chunked]", name, record.id);
                }
                DocumentStatus::ParseFailed => {
                    parse_failures += 1;
                    println!(
                        "  {} -> {} [parse_failed: {}]",
                        name,
                        record.id,
                        record.parse_error.as_deref().unwrap_or("unknown")
                    );
                }
                other => {
                    println!("  {} -> {} [{}]", name, record.id, other);
                }
            },
            Err(err) => {
                failures += 1;
                eprintln!("  {}: {}", name, err);
            }
        }
    }

    println!("  chunked: {}", chunked);
    println!("  parse failures: {}", parse_failures);
    println!("  failed: {}", failures);
    println!("ok");

    pool.close().await;
    if failures > 0 {
        bail!("{} of {} files failed", failures, files.len());
    }
    Ok(())
}

/// CLI: re-run the pipeline for one document from its stored blob.
pub async fn run_reingest(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let blobs = blob::open_blob_store(&config.blob).await?;
    let ingestor = Ingestor::new(
        pool.clone(),
        blobs,
        Arc::new(PdfExtractor),
        config.chunking.clone(),
    );

    let record = ingestor.reingest(id).await?;
    println!("reingest {}", id);
    println!("  new record: {} [{}]", record.id, record.status);
    if let Some(ref cause) = record.parse_error {
        println!("  parse error: {}", cause);
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

/// CLI: re-run chunking for one document under the current policy.
pub async fn run_rechunk(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let blobs = blob::open_blob_store(&config.blob).await?;
    let ingestor = Ingestor::new(
        pool.clone(),
        blobs,
        Arc::new(PdfExtractor),
        config.chunking.clone(),
    );

    let record = ingestor.rechunk(id).await?;
    let chunk_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE document_id = ?")
        .bind(&record.id)
        .fetch_one(&pool)
        .await?;
    println!("rechunk {}", id);
    println!("  status: {}", record.status);
    println!("  chunks: {}", chunk_count);
    println!("ok");

    pool.close().await;
    Ok(())
}

fn collect_pdf_paths(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("no such file or directory: {}", path.display());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_pdf = entry
            .path()
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
