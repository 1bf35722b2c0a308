//! 環境変数による設定管理
//!
//! すべての設定は環境変数から読み込む。未設定の項目には
//! デフォルト値を適用する。

use chrono::Weekday;
use std::str::FromStr;
use tracing::warn;

/// 環境変数を取得し、未設定ならデフォルト値を返す
pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// 環境変数を取得してパースし、未設定またはパース失敗ならデフォルト値を返す
pub fn env_parse_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// 監視サービス全体の設定
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// データベースURL (デフォルト: "sqlite:<HOME>/.sitewatch/monitor.db")
    pub database_url: String,

    /// ログファイルパス（未設定なら標準出力のみ）
    pub log_file: Option<String>,

    /// Telegram Botトークン（未設定ならログ通知にフォールバック）
    pub telegram_bot_token: Option<String>,

    /// Telegram送信先チャットID
    pub telegram_chat_id: Option<String>,

    /// 週次レポートの曜日 (デフォルト: mon)
    pub report_weekday: Weekday,

    /// 週次レポートの時 (デフォルト: 10)
    pub report_hour: u32,

    /// 週次レポートの分 (デフォルト: 0)
    pub report_minute: u32,
}

impl MonitorConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Self {
        let database_url = std::env::var("SITEWATCH_DATABASE_URL").unwrap_or_else(|_| {
            let home = std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .unwrap_or_else(|_| ".".to_string());
            format!("sqlite:{home}/.sitewatch/monitor.db")
        });

        let report_weekday = std::env::var("SITEWATCH_REPORT_WEEKDAY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Weekday::Mon);

        // 範囲外の時刻指定は黙って丸めずデフォルトに戻す
        let mut report_hour: u32 = env_parse_or("SITEWATCH_REPORT_HOUR", 10);
        if report_hour > 23 {
            warn!(value = report_hour, "SITEWATCH_REPORT_HOUR out of range, using default 10");
            report_hour = 10;
        }
        let mut report_minute: u32 = env_parse_or("SITEWATCH_REPORT_MINUTE", 0);
        if report_minute > 59 {
            warn!(value = report_minute, "SITEWATCH_REPORT_MINUTE out of range, using default 0");
            report_minute = 0;
        }

        Self {
            database_url,
            log_file: std::env::var("SITEWATCH_LOG_FILE").ok(),
            telegram_bot_token: std::env::var("SITEWATCH_BOT_TOKEN").ok(),
            telegram_chat_id: std::env::var("SITEWATCH_CHAT_ID").ok(),
            report_weekday,
            report_hour,
            report_minute,
        }
    }
}
