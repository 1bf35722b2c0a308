//! Sitewatch Server Entry Point

use clap::Parser;
use sitewatch::cli::Cli;
use sitewatch::config::MonitorConfig;
use sitewatch::notify::{LogNotifier, Notifier, NullChartRenderer, TelegramNotifier};
use sitewatch::registry::MonitorRegistry;
use sitewatch::report::WeeklyReporter;
use sitewatch::{db, logging};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() {
    // CLIは-h/--helpと-V/--versionのみ
    let _cli = Cli::parse();

    // .envがあれば読み込む（なければ無視）
    dotenvy::dotenv().ok();

    let config = MonitorConfig::from_env();

    // ガードはプロセス終了までファイルライターを生かすために保持する
    let _log_guard = logging::init(config.log_file.as_deref());

    info!("Sitewatch v{}", env!("CARGO_PKG_VERSION"));

    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let notifier: Arc<dyn Notifier> = match (
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
    ) {
        (Some(token), Some(chat_id)) => {
            info!("Telegram notifications enabled");
            Arc::new(TelegramNotifier::new(token, chat_id).expect("Failed to create HTTP client"))
        }
        _ => {
            info!("Telegram not configured, notifications go to the log only");
            Arc::new(LogNotifier)
        }
    };

    let registry = MonitorRegistry::new(db_pool, notifier.clone());
    registry
        .load_all()
        .await
        .expect("Failed to load endpoints from database");
    info!(
        endpoint_count = registry.count().await,
        active_loops = registry.active_loop_count().await,
        "monitoring started"
    );

    let reporter = WeeklyReporter::new(
        registry.clone(),
        notifier,
        Arc::new(NullChartRenderer),
        config.report_weekday,
        config.report_hour,
        config.report_minute,
    );
    let report_cancel = CancellationToken::new();
    let report_handle = reporter.start(report_cancel.clone());

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    info!("shutdown signal received");

    report_cancel.cancel();
    let _ = report_handle.await;
    registry.shutdown().await;

    info!("shutdown complete");
}
