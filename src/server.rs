//! Document ingestion HTTP server.
//!
//! Exposes the pipeline over a small JSON API: multipart upload in,
//! document records out.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/documents` | Upload one PDF (multipart field `file`) |
//! | `GET`  | `/documents/{id}` | Fetch a document record and chunk count |
//! | `GET`  | `/health` | Liveness of the metadata and blob stores |
//!
//! Request bodies are capped at `[server].max_upload_bytes` (10 MiB by
//! default).
//!
//! # Error Contract
//!
//! All error responses share one envelope:
//!
//! ```json
//! { "error": { "code": "invalid_input", "message": "file is empty" } }
//! ```
//!
//! Error codes: `invalid_input` (400), `not_found` (404),
//! `storage_unavailable` (503), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the API is expected to
//! sit behind a gateway that owns authentication.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::blob::{self, BlobError, BlobStore};
use crate::config::Config;
use crate::db;
use crate::extract::PdfExtractor;
use crate::get::{fetch_document, DocumentDetail};
use crate::ingest::{IngestError, Ingestor};
use crate::models::{DocumentRecord, DocumentStatus};

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
struct AppState {
    ingestor: Arc<Ingestor>,
    pool: sqlx::SqlitePool,
    blobs: Arc<dyn BlobStore>,
}

/// Starts the HTTP server.
///
/// Builds the pipeline at the composition root (pool, blob store,
/// extractor), binds to `[server].bind`, and serves until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let pool = db::connect(config).await?;
    let blobs = blob::open_blob_store(&config.blob).await?;
    let ingestor = Arc::new(Ingestor::new(
        pool.clone(),
        blobs.clone(),
        Arc::new(PdfExtractor),
        config.chunking.clone(),
    ));

    let state = AppState {
        ingestor,
        pool,
        blobs,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/documents", post(handle_upload))
        .route("/documents/{id}", get(handle_get_document))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(cors)
        .with_state(state);

    println!("docmill server listening on http://{}", bind_addr);
    info!(bind = %bind_addr, blob_backend = %config.blob.backend, "server starting");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"invalid_input"`, `"not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn invalid_input(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "invalid_input".to_string(),
        message: message.into(),
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Constructs a 503 Service Unavailable error.
fn storage_unavailable(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "storage_unavailable".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 Internal Server Error.
fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps pipeline errors onto the HTTP error contract.
fn map_ingest_error(err: IngestError) -> AppError {
    match err {
        IngestError::InvalidInput(msg) => invalid_input(msg),
        IngestError::NotFound(id) => not_found(format!("document not found: {}", id)),
        IngestError::Storage(BlobError::NotFound(blob_ref)) => {
            not_found(format!("blob not found: {}", blob_ref))
        }
        IngestError::Storage(err) => storage_unavailable(err.to_string()),
        IngestError::Invariant(msg) => internal(format!("internal invariant violation: {}", msg)),
        IngestError::Db(err) => internal(format!("metadata store error: {}", err)),
    }
}

// ============ POST /documents ============

/// JSON response body for `POST /documents`.
#[derive(Serialize)]
struct UploadResponse {
    id: String,
    status: DocumentStatus,
    filename: String,
    size: i64,
    content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_error: Option<String>,
    uploaded_at: String,
}

impl From<&DocumentRecord> for UploadResponse {
    fn from(record: &DocumentRecord) -> Self {
        UploadResponse {
            id: record.id.clone(),
            status: record.status,
            filename: record.filename.clone(),
            size: record.size_bytes,
            content_type: record.content_type.clone(),
            parse_error: record.parse_error.clone(),
            uploaded_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Handler for `POST /documents`.
///
/// Reads the multipart field `file` and runs the full ingestion pipeline on
/// it. Returns `201` with the resulting record; a record that finished at
/// `parse_failed` is still a `201` (the upload itself succeeded, callers
/// inspect `status` and `parse_error`).
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| invalid_input(format!("malformed multipart body: {}", err)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| invalid_input(format!("failed to read upload: {}", err)))?;
        upload = Some((original_name, content_type, bytes.to_vec()));
        break;
    }
    let (original_name, content_type, bytes) =
        upload.ok_or_else(|| invalid_input("multipart field 'file' is required"))?;

    let record = state
        .ingestor
        .ingest(&original_name, &content_type, &bytes)
        .await
        .map_err(map_ingest_error)?;

    Ok((StatusCode::CREATED, Json(UploadResponse::from(&record))))
}

// ============ GET /documents/{id} ============

/// Handler for `GET /documents/{id}`.
async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetail>, AppError> {
    let detail = fetch_document(&state.pool, &id)
        .await
        .map_err(map_ingest_error)?;
    Ok(Json(detail))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// `"ok"` when both probes pass, `"unavailable"` otherwise.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
    /// Metadata store reachability.
    database: String,
    /// Blob store reachability.
    blob_store: String,
}

/// Handler for `GET /health`.
///
/// Probes the metadata store and the blob backend; a failed probe turns the
/// response into a `503` so load balancers stop routing here.
async fn handle_health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.pool)
        .await
    {
        Ok(_) => "ok",
        Err(err) => {
            warn!(error = %err, "database probe failed");
            "unavailable"
        }
    };
    let blob_store = match state.blobs.probe().await {
        Ok(()) => "ok",
        Err(err) => {
            warn!(backend = state.blobs.kind(), error = %err, "blob store probe failed");
            "unavailable"
        }
    };

    let healthy = database == "ok" && blob_store == "ok";
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "unavailable" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.to_string(),
            blob_store: blob_store.to_string(),
        }),
    )
}
