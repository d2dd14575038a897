use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use cakeday_content::{ContentPipeline, FactProvider, ImageGenerator, TextGenerator};
use cakeday_core::{CakedayConfig, SystemClock};
use cakeday_scheduler::CelebrationEngine;
use cakeday_slack::SlackClient;
use cakeday_store::{BirthdayStore, EngineState, Ledger};

#[derive(Parser)]
#[command(name = "cakeday-bot", about = "Workspace birthday and anniversary bot")]
struct Cli {
    /// Path to cakeday.toml (default: ~/.cakeday/cakeday.toml).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cakeday_bot=info,cakeday_scheduler=info,cakeday_slack=info,cakeday_store=info"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = CakedayConfig::load(cli.config.as_deref())?;

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    cakeday_store::db::init_db(&db)?;
    drop(db);

    // Each subsystem gets its own connection for thread safety.
    let store = Arc::new(BirthdayStore::new(rusqlite::Connection::open(&db_path)?)?);
    let ledger = Arc::new(Ledger::new(rusqlite::Connection::open(&db_path)?)?);
    let state = Arc::new(EngineState::new(rusqlite::Connection::open(&db_path)?)?);

    let slack = Arc::new(SlackClient::new(
        config.slack.bot_token.clone(),
        config.slack.celebration_channel.clone(),
    ));

    let schedule = config.schedule.clone();
    let pipeline = Arc::new(build_pipeline(&config));

    let engine = Arc::new(CelebrationEngine::new(
        Arc::clone(&store),
        Arc::clone(&ledger),
        state,
        slack,
        pipeline,
        Arc::new(SystemClock),
        schedule.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine_task = tokio::spawn(engine.run(shutdown_rx.clone()));

    // Daily ledger pruning keeps announcement history bounded.
    let retention_days = schedule.retention_days;
    let prune_ledger = Arc::clone(&ledger);
    let mut prune_shutdown = shutdown_rx;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let cutoff = Utc::now().date_naive() - chrono::Duration::days(retention_days);
                    match prune_ledger.prune(cutoff) {
                        Ok(0) => {}
                        Ok(n) => info!(pruned = n, cutoff = %cutoff, "ledger pruned"),
                        Err(e) => warn!(error = %e, "ledger prune failed"),
                    }
                }
                _ = prune_shutdown.changed() => break,
            }
        }
    });

    info!("cakeday-bot running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    Ok(())
}

/// LLM-backed pipeline when OpenAI is configured, template-only otherwise.
fn build_pipeline(config: &CakedayConfig) -> ContentPipeline {
    let personality = config.schedule.personality.clone();
    if !cakeday_content::templates::PERSONALITIES.contains(&personality.as_str()) {
        warn!(%personality, "unknown personality, fallback templates will use the standard texture");
    }
    let timeout = Duration::from_secs(config.schedule.request_timeout_secs);
    match config.openai {
        Some(ref openai) => {
            let generator = Arc::new(cakeday_content::openai::OpenAiGenerator::new(openai));
            info!(model = %openai.model, images = openai.image_generation, "OpenAI generation enabled");
            let image: Option<Arc<dyn ImageGenerator>> = if openai.image_generation {
                Some(generator.clone())
            } else {
                None
            };
            let facts: Option<Arc<dyn FactProvider>> = if openai.date_facts {
                Some(generator.clone())
            } else {
                None
            };
            ContentPipeline::new(
                Some(generator as Arc<dyn TextGenerator>),
                image,
                facts,
                personality,
                timeout,
            )
        }
        None => {
            info!("no OpenAI key configured, using template messages only");
            ContentPipeline::disabled(personality)
        }
    }
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
