//! Core data models for the ingestion pipeline.
//!
//! These types represent the document records and chunks that flow through
//! the pipeline, shared by the orchestrator, the CLI, and the HTTP server.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a document record.
///
/// Transitions are monotonic and forward-only; a record never reverts to an
/// earlier status. `Chunked`, `ParseFailed`, and `StoreFailed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Received,
    Stored,
    Parsed,
    ParseFailed,
    Chunked,
    StoreFailed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Received => "received",
            DocumentStatus::Stored => "stored",
            DocumentStatus::Parsed => "parsed",
            DocumentStatus::ParseFailed => "parse_failed",
            DocumentStatus::Chunked => "chunked",
            DocumentStatus::StoreFailed => "store_failed",
        }
    }

    /// Whether the pipeline may advance from `self` to `next`.
    pub fn can_advance_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Received, Stored)
                | (Received, StoreFailed)
                | (Stored, Parsed)
                | (Stored, ParseFailed)
                | (Parsed, Chunked)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DocumentStatus::Chunked | DocumentStatus::ParseFailed | DocumentStatus::StoreFailed
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(DocumentStatus::Received),
            "stored" => Ok(DocumentStatus::Stored),
            "parsed" => Ok(DocumentStatus::Parsed),
            "parse_failed" => Ok(DocumentStatus::ParseFailed),
            "chunked" => Ok(DocumentStatus::Chunked),
            "store_failed" => Ok(DocumentStatus::StoreFailed),
            other => Err(format!("unknown document status: {other}")),
        }
    }
}

/// Metadata/state entity tracking one ingested document.
///
/// At most one of `parsed_text` / `parse_error` is ever set. `blob_ref` is
/// set exactly once, when the stored stage succeeds.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub sha256: String,
    pub blob_ref: Option<String>,
    pub status: DocumentStatus,
    pub parsed_text: Option<String>,
    pub parse_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A chunk of a document's parsed text.
///
/// Offsets are character positions into the parsed text, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub index: i64,
    pub text: String,
    pub start_offset: i64,
    pub end_offset: i64,
}
