//! SQLite persistence: the assignment snapshot and the stored credentials.
//!
//! The snapshot's assignment list is stored as one JSON text column; the
//! reconciler always rewrites the whole set, so row-per-assignment storage
//! would buy nothing.
use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tracing::{instrument, warn};

use crate::model::Snapshot;

pub type Pool = SqlitePool;

/// A stored username/password pair for the portal account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the
/// parent directory exists. Leaves in-memory URLs untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") {
        return url.to_string();
    }
    if url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);

    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = if let Some(rest) = path_part.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            format!("{}/{}", home.trim_end_matches('/'), rest)
        } else {
            path_part.to_string()
        }
    } else {
        path_part.to_string()
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Load the persisted snapshot. A missing row or an unreadable payload both
/// come back as the empty snapshot so a corrupt store heals on the next save.
#[instrument(skip_all)]
pub async fn load_snapshot(pool: &Pool) -> Result<Snapshot> {
    let row = sqlx::query("SELECT payload, last_updated FROM snapshot WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(Snapshot::default());
    };

    let payload: String = row.get("payload");
    let last_updated: Option<i64> = row.get("last_updated");
    match serde_json::from_str(&payload) {
        Ok(assignments) => Ok(Snapshot {
            assignments,
            last_updated_seconds: last_updated,
        }),
        Err(err) => {
            warn!(%err, "stored snapshot payload unreadable; starting from empty");
            Ok(Snapshot::default())
        }
    }
}

#[instrument(skip_all)]
pub async fn save_snapshot(pool: &Pool, snapshot: &Snapshot) -> Result<()> {
    let payload = serde_json::to_string(&snapshot.assignments)?;
    sqlx::query(
        "INSERT INTO snapshot (id, payload, last_updated) VALUES (1, ?, ?)
         ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, last_updated = excluded.last_updated",
    )
    .bind(payload)
    .bind(snapshot.last_updated_seconds)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load the stored account. Blank username or password counts as absent.
#[instrument(skip_all)]
pub async fn load_credentials(pool: &Pool) -> Result<Option<Credentials>> {
    let row = sqlx::query("SELECT username, password FROM credentials WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|row| {
        let username: String = row.get("username");
        let password: String = row.get("password");
        if username.trim().is_empty() || password.trim().is_empty() {
            None
        } else {
            Some(Credentials { username, password })
        }
    }))
}

#[instrument(skip_all)]
pub async fn save_credentials(pool: &Pool, credentials: &Credentials) -> Result<()> {
    sqlx::query(
        "INSERT INTO credentials (id, username, password) VALUES (1, ?, ?)
         ON CONFLICT(id) DO UPDATE SET username = excluded.username, password = excluded.password",
    )
    .bind(&credentials.username)
    .bind(&credentials.password)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn clear_credentials(pool: &Pool) -> Result<()> {
    sqlx::query("DELETE FROM credentials WHERE id = 1")
        .execute(pool)
        .await?;
    Ok(())
}
