//! 通知シンクとチャートレンダラの境界
//!
//! 通知の宛先は固定の運用者1名。実装はTelegram Bot API経由の
//! `TelegramNotifier`と、トークン未設定環境向けの`LogNotifier`。

use crate::error::MonitorError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::info;

/// Telegram Bot APIのデフォルトベースURL
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// 通知送信のタイムアウト（秒）
const NOTIFY_TIMEOUT_SECS: u64 = 30;

/// 人間可読なアラート/レポートメッセージの配送先
#[async_trait]
pub trait Notifier: Send + Sync {
    /// テキストメッセージを送信
    async fn send_text(&self, message: &str) -> Result<(), MonitorError>;

    /// キャプション付き画像を送信
    async fn send_image_with_caption(
        &self,
        image: &[u8],
        caption: &str,
    ) -> Result<(), MonitorError>;
}

/// 時系列チャートのレンダラ
///
/// 点列が空の場合は`None`（チャートなし）を返す。
pub trait ChartRenderer: Send + Sync {
    /// 応答時間の時系列からチャート画像を生成
    fn render_time_series(
        &self,
        points: &[(DateTime<Utc>, f64)],
        title: &str,
    ) -> Option<Vec<u8>>;
}

/// Telegram Bot API経由の通知実装
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// トークンとチャットIDから通知クライアントを作成
    pub fn new(token: String, chat_id: String) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .build()
            .map_err(|e| MonitorError::Notification(e.to_string()))?;

        Ok(Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            token,
            chat_id,
        })
    }

    /// APIベースURLを差し替える（テスト用）
    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            self.token,
            method
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, message: &str) -> Result<(), MonitorError> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": message,
            }))
            .send()
            .await
            .map_err(|e| MonitorError::Notification(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(MonitorError::Notification(format!(
                "sendMessage failed: HTTP {}",
                response.status()
            )))
        }
    }

    async fn send_image_with_caption(
        &self,
        image: &[u8],
        caption: &str,
    ) -> Result<(), MonitorError> {
        let photo = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name("chart.png")
            .mime_str("image/png")
            .map_err(|e| MonitorError::Notification(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part("photo", photo);

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MonitorError::Notification(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(MonitorError::Notification(format!(
                "sendPhoto failed: HTTP {}",
                response.status()
            )))
        }
    }
}

/// 通知をログ出力のみで済ませる実装
///
/// Telegramトークン未設定の環境で使用する。
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_text(&self, message: &str) -> Result<(), MonitorError> {
        info!(message, "notification (text)");
        Ok(())
    }

    async fn send_image_with_caption(
        &self,
        image: &[u8],
        caption: &str,
    ) -> Result<(), MonitorError> {
        info!(caption, image_bytes = image.len(), "notification (image)");
        Ok(())
    }
}

/// チャートを生成しないレンダラ
///
/// 画像レンダリング自体は外部コラボレータの責務。差し替えるまで
/// レポートはテキストのみで配送される。
#[derive(Debug, Default)]
pub struct NullChartRenderer;

impl ChartRenderer for NullChartRenderer {
    fn render_time_series(
        &self,
        _points: &[(DateTime<Utc>, f64)],
        _title: &str,
    ) -> Option<Vec<u8>> {
        None
    }
}
