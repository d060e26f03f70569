//! Financeiro Visual backend entry point.

use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use financeiro_visual::api::{api_router, ApiContext};
use financeiro_visual::config::{self, AppConfig};
use financeiro_visual::db::open_database;
use financeiro_visual::mailer::LogMailer;
use financeiro_visual::pipeline::extractor::GeminiExtractor;
use financeiro_visual::pipeline::gemini::GeminiClient;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        "{} backend starting v{}",
        config::APP_NAME,
        config::APP_VERSION
    );
    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, receipt processing will be rejected");
    }

    cleanup_orphaned_staging(&config);

    let conn = open_database(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "database ready");
    let db = Arc::new(Mutex::new(conn));

    // The blocking HTTP client must be built outside any async context.
    let gemini = Arc::new(GeminiClient::from_config(&config));
    let extractor = Arc::new(GeminiExtractor::new(gemini));
    let mailer = Arc::new(LogMailer);

    let config = Arc::new(config);
    let ctx = ApiContext::new(db, extractor, mailer, config.clone());
    let app = api_router(ctx);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
        tracing::info!(addr = %config.bind_addr, "API server listening");
        axum::serve(listener, app).await
    })?;

    Ok(())
}

/// Remove staging files left behind by a previous crash. Staged uploads only
/// live for the duration of one request, so anything found here is garbage.
fn cleanup_orphaned_staging(config: &AppConfig) {
    let dir = &config.staging_dir;
    if !dir.exists() {
        return;
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "could not scan staging directory");
            return;
        }
    };
    let mut removed = 0u32;
    for entry in entries.flatten() {
        if std::fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!(removed, "cleaned orphaned staging files");
    }
}
