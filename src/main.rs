use std::sync::Arc;

use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use backupwatch::checks::engine::CheckEngine;
use backupwatch::checks::scheduler;
use backupwatch::config::AppConfig;
use backupwatch::db;
use backupwatch::mailbox::ImapFetcher;
use backupwatch::notifications::SummaryMailer;
use backupwatch::web::{self, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "backupwatch.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // --- Config Setup ---
    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = env!("CARGO_PKG_VERSION"), "starting backupwatch");

    // --- Database Pool Setup ---
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    db::init_schema(&db_pool).await?;

    // --- Engine and Notifier Setup ---
    let fetcher = Arc::new(ImapFetcher::new(config.imap.clone()));
    let engine = Arc::new(CheckEngine::new(db_pool.clone(), fetcher));
    let mailer = config
        .smtp
        .clone()
        .map(|smtp| Arc::new(SummaryMailer::new(smtp)));

    let app_state = Arc::new(AppState {
        db_pool,
        config: config.clone(),
        engine,
        mailer,
    });

    // --- Daily Check Scheduler Task ---
    tokio::spawn(scheduler::run_scheduler(app_state.clone()));

    // --- Axum HTTP Server Setup ---
    let router = web::create_axum_router(app_state);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(address = %config.listen_addr, "HTTP server listening");
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
