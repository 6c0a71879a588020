use anyhow::Result;
use clap::{Parser, Subcommand};
use panda_watch::db::Credentials;
use panda_watch::error::SyncError;
use panda_watch::notify::LogNotifier;
use panda_watch::sync::SyncEngine;
use panda_watch::{config, db, sync};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch the portal, syncing on the configured interval (default)
    Run,
    /// Run exactly one sync cycle and exit
    Sync,
    /// Store portal credentials (password read from PANDA_PASSWORD or stdin)
    Login {
        username: String,
    },
    /// Clear stored portal credentials
    Logout,
    /// Print an example config file and exit
    PrintExampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Run);

    if let Command::PrintExampleConfig = command {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/panda-watch.db", cfg.app.data_dir));
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    match command {
        Command::Run => {
            let engine = SyncEngine::new(cfg.portal.clone());
            let notifier = LogNotifier;
            let interval = Duration::from_secs(cfg.app.poll_interval_secs);
            info!(interval_secs = cfg.app.poll_interval_secs, "starting portal watch");
            loop {
                match sync::run_sync_cycle(&pool, &engine, &notifier).await {
                    Ok(_) => {}
                    Err(err) => match err.downcast_ref::<SyncError>() {
                        Some(SyncError::InvalidCredentials) => {
                            error!("portal rejected the stored credentials; run `panda-watch login` again");
                        }
                        _ => error!(?err, "sync cycle failed"),
                    },
                }
                tokio::time::sleep(interval).await;
            }
        }
        Command::Sync => {
            let engine = SyncEngine::new(cfg.portal.clone());
            let notifier = LogNotifier;
            sync::run_sync_cycle(&pool, &engine, &notifier).await?;
        }
        Command::Login { username } => {
            let password = read_password()?;
            db::save_credentials(&pool, &Credentials { username, password }).await?;
            info!("credentials stored");
        }
        Command::Logout => {
            db::clear_credentials(&pool).await?;
            info!("credentials cleared");
        }
        Command::PrintExampleConfig => unreachable!("handled above"),
    }

    Ok(())
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var("PANDA_PASSWORD") {
        return Ok(password);
    }
    print!("password: ");
    std::io::stdout().flush()?;
    let mut password = String::new();
    std::io::stdin().lock().read_line(&mut password)?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}
