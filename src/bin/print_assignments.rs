//! Dump the persisted assignment snapshot in display order.
use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Parser;
use panda_watch::{config, db, reconcile};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/panda-watch.db", cfg.app.data_dir));
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let snapshot = db::load_snapshot(&pool).await?;
    let now = Utc::now().timestamp();

    if let Some(updated) = snapshot.last_updated_seconds {
        if let Some(when) = Utc.timestamp_opt(updated, 0).single() {
            println!("last updated: {}", when.to_rfc3339());
        }
    }

    for a in reconcile::sort_for_display(&snapshot.assignments, now) {
        let due = match a.due_time_seconds.and_then(|s| Utc.timestamp_opt(s, 0).single()) {
            Some(due) => due.to_rfc3339(),
            None => "no due date".to_string(),
        };
        let mark = if a.is_submitted { "x" } else { " " };
        println!("[{mark}] {due}  {}: {}", a.course_name, a.title);
    }

    Ok(())
}
