//! Database statistics overview.
//!
//! Quick summary of pipeline state: document counts by status, chunk
//! totals, and database size. Used by `docmill stats` to confirm that
//! ingestion runs are landing where they should.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::config::Config;
use crate::db;

struct StatusStats {
    status: String,
    doc_count: i64,
    last_update: Option<String>,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_docs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(&pool)
        .await?;

    let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Docmill Database Stats");
    println!("======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", total_docs);
    println!("  Chunks:      {}", total_chunks);

    // Per-status breakdown
    let status_rows = sqlx::query(
        r#"
        SELECT status, COUNT(*) AS doc_count, MAX(updated_at) AS last_update
        FROM documents
        GROUP BY status
        ORDER BY doc_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let status_stats: Vec<StatusStats> = status_rows
        .iter()
        .map(|row| StatusStats {
            status: row.get("status"),
            doc_count: row.get("doc_count"),
            last_update: row.get("last_update"),
        })
        .collect();

    if !status_stats.is_empty() {
        println!();
        println!("  By status:");
        println!("  {:<14} {:>6}   {}", "STATUS", "DOCS", "LAST UPDATE");
        println!("  {}", "-".repeat(44));

        for s in &status_stats {
            let update_display = match s.last_update.as_deref() {
                Some(raw) => format_ts_relative(raw),
                None => "never".to_string(),
            };
            println!("  {:<14} {:>6}   {}", s.status, s.doc_count, update_display);
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format an RFC 3339 timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(raw: &str) -> String {
    let ts = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => return raw.to_string(),
    };
    let delta = (Utc::now() - ts).num_seconds();

    if delta < 0 {
        return ts.format("%Y-%m-%d %H:%M").to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }
}
