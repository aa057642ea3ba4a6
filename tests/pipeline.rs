//! Pipeline tests against the library with interchangeable backends.
//!
//! These tests prove that the ingestion pipeline commits the right status at
//! every stage, that storage and extraction failures finalize records where
//! the design says they must, and that the HTTP server round-trips the same
//! pipeline.

use async_trait::async_trait;
use docmill::blob::{open_blob_store, BlobError, BlobStore};
use docmill::chunk::expected_chunk_count;
use docmill::config::{ChunkingConfig, Config};
use docmill::db;
use docmill::extract::{ExtractError, PdfExtractor, TextExtractor, MIME_PDF};
use docmill::get::{fetch_document, load_chunks};
use docmill::ingest::{IngestError, Ingestor};
use docmill::migrate;
use docmill::models::DocumentStatus;
use docmill::server::run_server;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

// ─── Test Backends ──────────────────────────────────────────────────

/// Extractor that returns a fixed text for any input.
struct CannedExtractor(String);

impl TextExtractor for CannedExtractor {
    fn extract(&self, _bytes: &[u8], _content_type: &str) -> Result<String, ExtractError> {
        Ok(self.0.clone())
    }
}

/// Extractor that always reports a structurally broken document.
struct FailingExtractor;

impl TextExtractor for FailingExtractor {
    fn extract(&self, _bytes: &[u8], _content_type: &str) -> Result<String, ExtractError> {
        Err(ExtractError::Malformed("synthetic parser breakage".to_string()))
    }
}

/// Blob store whose every operation fails.
struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn store(&self, _name: &str, _bytes: &[u8]) -> Result<String, BlobError> {
        Err(BlobError::Unavailable("synthetic disk failure".to_string()))
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobError> {
        Err(BlobError::NotFound(blob_ref.to_string()))
    }

    async fn probe(&self) -> Result<(), BlobError> {
        Err(BlobError::Unavailable("synthetic disk failure".to_string()))
    }

    fn kind(&self) -> &'static str {
        "failing"
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn test_config(tmp: &TempDir) -> Config {
    let root = tmp.path();
    let config_content = format!(
        r#"
[db]
path = "{}/docmill.sqlite"

[blob]
backend = "filesystem"
root = "{}/blobs"

[chunking]
max_chars = 1000
overlap_chars = 200

[server]
bind = "127.0.0.1:0"
"#,
        root.display(),
        root.display()
    );
    toml::from_str(&config_content).unwrap()
}

fn test_config_with_port(tmp: &TempDir, port: u16) -> Config {
    let root = tmp.path();
    let config_content = format!(
        r#"
[db]
path = "{}/docmill.sqlite"

[blob]
backend = "filesystem"
root = "{}/blobs"

[chunking]
max_chars = 1000
overlap_chars = 200

[server]
bind = "127.0.0.1:{}"
"#,
        root.display(),
        root.display(),
        port
    );
    toml::from_str(&config_content).unwrap()
}

async fn setup_backends(cfg: &Config) -> (sqlx::SqlitePool, Arc<dyn BlobStore>) {
    migrate::run_migrations(cfg).await.unwrap();
    let pool = db::connect(cfg).await.unwrap();
    let blobs = open_blob_store(&cfg.blob).await.unwrap();
    (pool, blobs)
}

/// Bytes that pass upload validation; pair with a canned extractor.
fn stub_pdf() -> &'static [u8] {
    b"%PDF-1.4\nstub body used with canned extractors\n"
}

/// Two-page PDF whose text is `phrase` repeated `count` times, split across
/// the pages. Offsets and stream lengths are computed from the actual bytes
/// so text extraction sees a well-formed document.
fn two_page_pdf(phrase: &str, count: usize) -> Vec<u8> {
    let first = phrase.repeat(count / 2);
    let second = phrase.repeat(count - count / 2);
    let stream1 = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET\n", first);
    let stream2 = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET\n", second);

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 5 0 R /Resources << /Font << /F1 7 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(b"4 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 6 0 R /Resources << /Font << /F1 7 0 R >> >> >> endobj\n");
    let o5 = out.len();
    out.extend_from_slice(format!("5 0 obj << /Length {} >> stream\n", stream1.len()).as_bytes());
    out.extend_from_slice(stream1.as_bytes());
    out.extend_from_slice(b"endstream endobj\n");
    let o6 = out.len();
    out.extend_from_slice(format!("6 0 obj << /Length {} >> stream\n", stream2.len()).as_bytes());
    out.extend_from_slice(stream2.as_bytes());
    out.extend_from_slice(b"endstream endobj\n");
    let o7 = out.len();
    out.extend_from_slice(
        b"7 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 8\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5, o6, o7] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 8 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

// ─── Pipeline Tests ─────────────────────────────────────────────────

/// Prove that a successful run lands at `chunked` with exactly the chunk
/// set the sliding window defines: fixed starts, fixed overlap, and a final
/// chunk that ends at the text's end.
#[tokio::test]
async fn canned_text_reaches_chunked_with_exact_windows() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let (pool, blobs) = setup_backends(&cfg).await;

    let text = "Hello world. ".repeat(500);
    let ingestor = Ingestor::new(
        pool.clone(),
        blobs,
        Arc::new(CannedExtractor(text.clone())),
        cfg.chunking.clone(),
    );

    let record = ingestor
        .ingest("hello.pdf", MIME_PDF, stub_pdf())
        .await
        .unwrap();
    assert_eq!(record.status, DocumentStatus::Chunked);
    assert!(record.blob_ref.is_some());
    assert!(record.parse_error.is_none());
    assert_eq!(record.parsed_text.as_deref(), Some(text.as_str()));

    let chunks = load_chunks(&pool, &record.id).await.unwrap();
    let len = text.chars().count();
    assert_eq!(chunks.len(), expected_chunk_count(len, 1000, 200));
    assert_eq!(chunks[0].start_offset, 0);
    assert_eq!(chunks.last().unwrap().end_offset as usize, len);
    for pair in chunks.windows(2) {
        assert_eq!(
            pair[1].start_offset,
            pair[0].end_offset - 200,
            "consecutive chunks must overlap by exactly 200 chars"
        );
    }

    // Dropping each chunk's leading overlap reassembles the original text.
    let mut rebuilt = chunks[0].text.clone();
    for chunk in &chunks[1..] {
        rebuilt.extend(chunk.text.chars().skip(200));
    }
    assert_eq!(rebuilt, text);

    let detail = fetch_document(&pool, &record.id).await.unwrap();
    assert_eq!(detail.chunk_count, chunks.len() as i64);
    assert_eq!(detail.text.as_deref(), Some(text.as_str()));
}

/// Prove that a blob write failure surfaces as a storage error while the
/// record is finalized at `store_failed` with nothing downstream written.
#[tokio::test]
async fn storage_failure_finalizes_store_failed() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let (pool, _blobs) = setup_backends(&cfg).await;

    let ingestor = Ingestor::new(
        pool.clone(),
        Arc::new(FailingBlobStore),
        Arc::new(CannedExtractor("never reached".to_string())),
        cfg.chunking.clone(),
    );

    let err = ingestor
        .ingest("doomed.pdf", MIME_PDF, stub_pdf())
        .await
        .unwrap_err();
    assert!(
        matches!(err, IngestError::Storage(BlobError::Unavailable(_))),
        "got: {}",
        err
    );

    let (status, blob_ref, parsed_text): (String, Option<String>, Option<String>) =
        sqlx::query_as("SELECT status, blob_ref, parsed_text FROM documents")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "store_failed");
    assert!(blob_ref.is_none());
    assert!(parsed_text.is_none());

    let chunk_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(chunk_count, 0);
}

/// Prove that an extraction failure is not an error to the caller: the
/// record comes back finalized at `parse_failed` with the cause recorded,
/// and the stored blob stays fetchable for a later reingest.
#[tokio::test]
async fn extraction_failure_finalizes_parse_failed_and_keeps_blob() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let (pool, blobs) = setup_backends(&cfg).await;

    let ingestor = Ingestor::new(
        pool.clone(),
        blobs.clone(),
        Arc::new(FailingExtractor),
        cfg.chunking.clone(),
    );

    let record = ingestor
        .ingest("report.pdf", MIME_PDF, stub_pdf())
        .await
        .unwrap();
    assert_eq!(record.status, DocumentStatus::ParseFailed);
    let cause = record.parse_error.as_deref().unwrap();
    assert!(cause.contains("synthetic parser breakage"), "got: {}", cause);
    assert!(record.parsed_text.is_none());

    let blob_ref = record.blob_ref.as_deref().unwrap();
    let bytes = blobs.fetch(blob_ref).await.unwrap();
    assert_eq!(bytes, stub_pdf());

    let chunk_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(chunk_count, 0);
}

/// An extractor handing back only whitespace must land at `parse_failed`,
/// never at `parsed` with empty text.
#[tokio::test]
async fn whitespace_extraction_is_a_parse_failure() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let (pool, blobs) = setup_backends(&cfg).await;

    let ingestor = Ingestor::new(
        pool,
        blobs,
        Arc::new(CannedExtractor("  \n\t  ".to_string())),
        cfg.chunking.clone(),
    );

    let record = ingestor
        .ingest("blank.pdf", MIME_PDF, stub_pdf())
        .await
        .unwrap();
    assert_eq!(record.status, DocumentStatus::ParseFailed);
    assert_eq!(
        record.parse_error.as_deref(),
        Some("no text content found in file")
    );
    assert!(record.parsed_text.is_none());
}

/// Prove that rejected uploads leave no trace: no record, no blob, no chunks.
#[tokio::test]
async fn validation_rejects_without_writing_anything() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let (pool, blobs) = setup_backends(&cfg).await;

    let ingestor = Ingestor::new(
        pool.clone(),
        blobs,
        Arc::new(CannedExtractor("unused".to_string())),
        cfg.chunking.clone(),
    );

    let rejects: Vec<(&str, &str, &[u8])> = vec![
        ("notes.txt", MIME_PDF, stub_pdf()),
        ("report.pdf", "text/plain", stub_pdf()),
        ("report.pdf", MIME_PDF, b""),
        ("report.pdf", MIME_PDF, b"plain text, wrong signature"),
        ("uploads/", MIME_PDF, stub_pdf()),
        ("..", MIME_PDF, stub_pdf()),
    ];
    for (name, content_type, bytes) in rejects {
        let err = ingestor.ingest(name, content_type, bytes).await.unwrap_err();
        assert!(
            matches!(err, IngestError::InvalidInput(_)),
            "{} should be invalid input, got: {}",
            name,
            err
        );
    }

    let doc_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(doc_count, 0);
}

/// Prove that reingest reads the retained bytes back out of the blob store
/// and produces a fresh record, leaving the original untouched.
#[tokio::test]
async fn reingest_mints_a_fresh_record_from_stored_bytes() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let (pool, blobs) = setup_backends(&cfg).await;

    let ingestor = Ingestor::new(
        pool.clone(),
        blobs,
        Arc::new(CannedExtractor("some parsed text".to_string())),
        cfg.chunking.clone(),
    );

    let original = ingestor
        .ingest("report.pdf", MIME_PDF, stub_pdf())
        .await
        .unwrap();
    let fresh = ingestor.reingest(&original.id).await.unwrap();

    assert_ne!(fresh.id, original.id);
    assert_eq!(fresh.status, DocumentStatus::Chunked);
    assert_eq!(fresh.sha256, original.sha256);
    assert_eq!(fresh.size_bytes, original.size_bytes);

    let old = fetch_document(&pool, &original.id).await.unwrap();
    assert_eq!(old.status, DocumentStatus::Chunked);

    let doc_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(doc_count, 2);
}

/// Prove that rechunk under a different policy replaces the chunk set
/// wholesale, with contiguous indexes and no stale rows.
#[tokio::test]
async fn rechunk_replaces_the_chunk_set_wholesale() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let (pool, blobs) = setup_backends(&cfg).await;

    let text = "Hello world. ".repeat(500);
    let ingestor = Ingestor::new(
        pool.clone(),
        blobs.clone(),
        Arc::new(CannedExtractor(text.clone())),
        cfg.chunking.clone(),
    );
    let record = ingestor
        .ingest("hello.pdf", MIME_PDF, stub_pdf())
        .await
        .unwrap();
    let coarse = load_chunks(&pool, &record.id).await.unwrap();

    let fine_policy = ChunkingConfig {
        max_chars: 500,
        overlap_chars: 100,
    };
    let rechunker = Ingestor::new(
        pool.clone(),
        blobs,
        Arc::new(CannedExtractor(text.clone())),
        fine_policy,
    );
    let rechunked = rechunker.rechunk(&record.id).await.unwrap();
    assert_eq!(rechunked.status, DocumentStatus::Chunked);

    let fine = load_chunks(&pool, &record.id).await.unwrap();
    let len = text.chars().count();
    assert_eq!(fine.len(), expected_chunk_count(len, 500, 100));
    assert!(fine.len() > coarse.len());
    for (i, chunk) in fine.iter().enumerate() {
        assert_eq!(chunk.index, i as i64);
        assert!(chunk.text.chars().count() <= 500);
    }
    assert_eq!(fine.last().unwrap().end_offset as usize, len);
}

/// Reprocessing has preconditions: rechunk needs parsed text, reingest
/// needs a stored blob, and both need an existing record.
#[tokio::test]
async fn reprocessing_preconditions_are_enforced() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let (pool, blobs) = setup_backends(&cfg).await;

    // A record that never got past extraction has no text to rechunk.
    let failing = Ingestor::new(
        pool.clone(),
        blobs.clone(),
        Arc::new(FailingExtractor),
        cfg.chunking.clone(),
    );
    let unparsed = failing
        .ingest("report.pdf", MIME_PDF, stub_pdf())
        .await
        .unwrap();
    let err = failing.rechunk(&unparsed.id).await.unwrap_err();
    assert!(matches!(err, IngestError::InvalidInput(_)), "got: {}", err);

    // A record whose blob write failed has no bytes to reingest.
    let storeless = Ingestor::new(
        pool.clone(),
        Arc::new(FailingBlobStore),
        Arc::new(CannedExtractor("unused".to_string())),
        cfg.chunking.clone(),
    );
    storeless
        .ingest("doomed.pdf", MIME_PDF, stub_pdf())
        .await
        .unwrap_err();
    let (failed_id,): (String,) =
        sqlx::query_as("SELECT id FROM documents WHERE status = 'store_failed'")
            .fetch_one(&pool)
            .await
            .unwrap();
    let normal = Ingestor::new(
        pool.clone(),
        blobs,
        Arc::new(CannedExtractor("unused".to_string())),
        cfg.chunking.clone(),
    );
    let err = normal.reingest(&failed_id).await.unwrap_err();
    assert!(matches!(err, IngestError::InvalidInput(_)), "got: {}", err);

    // Unknown ids are not found.
    let err = normal.reingest("no-such-id").await.unwrap_err();
    assert!(matches!(err, IngestError::NotFound(_)));
    let err = normal.rechunk("no-such-id").await.unwrap_err();
    assert!(matches!(err, IngestError::NotFound(_)));
}

/// Prove the real extractor path end to end: a two-page PDF comes out
/// `chunked` with its text intact.
#[tokio::test]
async fn pdf_extraction_reaches_chunked_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let (pool, blobs) = setup_backends(&cfg).await;

    let ingestor = Ingestor::new(
        pool.clone(),
        blobs,
        Arc::new(PdfExtractor),
        cfg.chunking.clone(),
    );

    let pdf = two_page_pdf("Hello world. ", 500);
    let record = ingestor.ingest("hello.pdf", MIME_PDF, &pdf).await.unwrap();
    assert_eq!(record.status, DocumentStatus::Chunked);
    let text = record.parsed_text.as_deref().unwrap();
    assert!(text.contains("Hello world."), "got: {:?}", &text[..80.min(text.len())]);

    let chunks = load_chunks(&pool, &record.id).await.unwrap();
    assert!(
        chunks.len() >= 5,
        "6500 chars of text should span several chunks, got {}",
        chunks.len()
    );
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i as i64);
        assert!(!chunk.text.trim().is_empty());
    }

    let detail = fetch_document(&pool, &record.id).await.unwrap();
    assert_eq!(detail.chunk_count, chunks.len() as i64);
}

// ─── HTTP Tests ─────────────────────────────────────────────────────

/// Prove that an upload round-trips through the HTTP server: 201 with the
/// document envelope, then a GET that returns text and chunk count, a 404
/// for unknown ids, and a healthy /health.
#[tokio::test]
async fn upload_and_fetch_roundtrip_via_http() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, port);
    migrate::run_migrations(&cfg).await.unwrap();

    let cfg_clone = cfg.clone();
    let server_handle = tokio::spawn(async move {
        run_server(&cfg_clone).await.ok();
    });
    wait_for_server(port).await;

    let client = reqwest::Client::new();
    let pdf = two_page_pdf("Hello world. ", 500);

    let part = reqwest::multipart::Part::bytes(pdf.clone())
        .file_name("report.pdf")
        .mime_str("application/pdf")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);
    let resp = client
        .post(format!("http://127.0.0.1:{}/documents", port))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "chunked");
    assert_eq!(body["filename"], "report.pdf");
    assert_eq!(body["content_type"], "application/pdf");
    assert_eq!(body["size"].as_i64().unwrap(), pdf.len() as i64);
    assert!(body["uploaded_at"].as_str().unwrap().contains('T'));
    assert!(body.get("parse_error").is_none());
    let id = body["id"].as_str().unwrap().to_string();

    let resp = client
        .get(format!("http://127.0.0.1:{}/documents/{}", port, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["status"], "chunked");
    assert!(body["chunk_count"].as_i64().unwrap() > 0);
    assert!(body["text"].as_str().unwrap().contains("Hello world."));

    let resp = client
        .get(format!("http://127.0.0.1:{}/documents/no-such-id", port))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    let resp = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["blob_store"], "ok");
    assert!(body["version"].as_str().is_some());

    server_handle.abort();
}

/// Prove the HTTP failure contract: a broken PDF is still accepted (201,
/// `parse_failed`), while invalid uploads and malformed requests get a 400
/// with a typed error body.
#[tokio::test]
async fn upload_failure_modes_via_http() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, port);
    migrate::run_migrations(&cfg).await.unwrap();

    let cfg_clone = cfg.clone();
    let server_handle = tokio::spawn(async move {
        run_server(&cfg_clone).await.ok();
    });
    wait_for_server(port).await;

    let client = reqwest::Client::new();

    // Valid signature, unreadable body: accepted and finalized as parse_failed.
    let part = reqwest::multipart::Part::bytes(b"%PDF-1.4\nnot a real document".to_vec())
        .file_name("broken.pdf")
        .mime_str("application/pdf")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);
    let resp = client
        .post(format!("http://127.0.0.1:{}/documents", port))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "parse_failed");
    assert!(!body["parse_error"].as_str().unwrap().is_empty());
    let id = body["id"].as_str().unwrap().to_string();

    let resp = client
        .get(format!("http://127.0.0.1:{}/documents/{}", port, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["chunk_count"].as_i64().unwrap(), 0);
    assert!(body.get("text").is_none());

    // Wrong file type: rejected outright.
    let part = reqwest::multipart::Part::bytes(b"plain text".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);
    let resp = client
        .post(format!("http://127.0.0.1:{}/documents", port))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid_input");

    // No file part at all.
    let form = reqwest::multipart::Form::new().text("other", "value");
    let resp = client
        .post(format!("http://127.0.0.1:{}/documents", port))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid_input");
    assert!(body["error"]["message"].as_str().unwrap().contains("file"));

    server_handle.abort();
}
