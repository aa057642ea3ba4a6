//! # docmill
//!
//! A document ingestion and chunking pipeline for PDF files.
//!
//! docmill accepts uploaded PDFs, persists their raw bytes to a blob store
//! (local filesystem or S3-compatible object storage), extracts their text,
//! splits it into bounded overlapping chunks, and tracks every document's
//! progress through the pipeline as a monotonic status machine in SQLite.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────────────────────────┐   ┌───────────┐
//! │  Upload   │──▶│            Pipeline             │──▶│  SQLite   │
//! │ CLI/HTTP  │   │ validate→store→extract→chunk    │   │ documents │
//! └───────────┘   └───────────────┬─────────────────┘   │  chunks   │
//!                                 │                     └───────────┘
//!                                 ▼
//!                          ┌─────────────┐
//!                          │ Blob Store  │
//!                          │   FS / S3   │
//!                          └─────────────┘
//! ```
//!
//! Every document moves through `received` → `stored` → `parsed` →
//! `chunked`, with `store_failed` and `parse_failed` as terminal failure
//! states. Each transition is committed before the next stage runs.
//!
//! ## Quick Start
//!
//! ```bash
//! docmill init                  # create database
//! docmill ingest ./reports      # ingest every PDF under a directory
//! docmill get <id>              # inspect a record and its chunks
//! docmill serve                 # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Document records, chunks, and the status machine |
//! | [`blob`] | Blob store trait and backend selection |
//! | [`blob_fs`] | Local filesystem blob backend |
//! | [`blob_s3`] | S3-compatible blob backend (SigV4) |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`ingest`] | Pipeline orchestration |
//! | [`get`] | Document retrieval |
//! | [`stats`] | Database statistics |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod blob;
pub mod blob_fs;
pub mod blob_s3;
pub mod chunk;
pub mod config;
pub mod db;
pub mod extract;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod server;
pub mod stats;
