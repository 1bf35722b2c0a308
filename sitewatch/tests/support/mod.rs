//! 統合テスト用の共有ヘルパー

use async_trait::async_trait;
use sitewatch::error::MonitorError;
use sitewatch::notify::Notifier;
use sitewatch::registry::MonitorRegistry;
use sitewatch::types::MonitoredEndpoint;
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// テスト用のSQLiteデータベースプールを作成する
pub async fn create_test_db_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// 送信されたメッセージを記録する通知シンク
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// これまでに送信されたテキストのコピーを返す
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, message: &str) -> Result<(), MonitorError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn send_image_with_caption(
        &self,
        _image: &[u8],
        caption: &str,
    ) -> Result<(), MonitorError> {
        self.messages.lock().unwrap().push(caption.to_string());
        Ok(())
    }
}

/// 記録付き通知シンクを備えたレジストリを作成する
pub async fn create_test_registry() -> (MonitorRegistry, RecordingNotifier) {
    let pool = create_test_db_pool().await;
    let notifier = RecordingNotifier::new();
    let registry = MonitorRegistry::new(pool, Arc::new(notifier.clone()));
    (registry, notifier)
}

/// 最短のチェック間隔を持つテスト用エンドポイント定義
pub fn fast_endpoint(name: &str, url: String) -> MonitoredEndpoint {
    let mut ep = MonitoredEndpoint::new(name.to_string(), url);
    ep.check_interval_secs = 1;
    ep.timeout_secs = 2;
    ep
}

/// 条件が成立するまでポーリングで待つ
///
/// タイムアウトしたらfalseを返す。固定スリープよりテストが安定する。
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
