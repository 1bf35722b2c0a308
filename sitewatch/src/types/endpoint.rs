//! エンドポイント型定義
//!
//! 監視対象エンドポイントの定義・ランタイム状態・チェック結果

use crate::error::MonitorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// エンドポイントの健全性状態
///
/// 連続失敗回数から導出される状態機械の状態。
/// `Recovering`はDownから最初の成功を観測した直後の1チェック分だけ
/// 滞在し、次の成功で`Healthy`に遷移する。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// 初期状態（チェック未実施）
    #[default]
    Unknown,
    /// 稼働中
    Healthy,
    /// 連続失敗1〜2回
    Degrading,
    /// 連続失敗3回以上（通知済み）
    Down,
    /// Downから復帰した直後
    Recovering,
}

impl HealthState {
    /// HealthStateを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Degrading => "degrading",
            Self::Down => "down",
            Self::Recovering => "recovering",
        }
    }
}

impl FromStr for HealthState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "healthy" => Self::Healthy,
            "degrading" => Self::Degrading,
            "down" => Self::Down,
            "recovering" => Self::Recovering,
            _ => Self::Unknown,
        })
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 監視対象エンドポイント
///
/// 定義フィールドはDBに永続化される。ランタイムフィールドは
/// レジストリがメモリ上で保持し、当該エンドポイント自身の
/// チェックループのみが書き込む。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredEndpoint {
    /// 一意な名前（レジストリ全体で重複不可）
    pub name: String,
    /// 監視対象URL
    pub url: String,
    /// 監視の有効/無効
    pub enabled: bool,
    /// チェック間隔（秒）
    pub check_interval_secs: u32,
    /// リクエストタイムアウト（秒）
    pub timeout_secs: u32,
    /// 期待するHTTPステータスコード
    pub expected_status: u16,
    /// ダウン時に通知するか
    pub notify_on_down: bool,
    /// 復旧時に通知するか
    pub notify_on_recovery: bool,
    /// 登録日時
    pub registered_at: DateTime<Utc>,
    /// 最終チェック時刻
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
    /// 直近チェックの成否（未チェック時はNone）
    #[serde(default)]
    pub last_status_ok: Option<bool>,
    /// 直近の応答時間（ミリ秒）
    #[serde(default)]
    pub last_response_time_ms: Option<f64>,
    /// 連続失敗回数
    #[serde(default)]
    pub consecutive_failures: u32,
    /// 現在の健全性状態
    #[serde(default)]
    pub state: HealthState,
}

impl MonitoredEndpoint {
    /// 新しいエンドポイントをデフォルト設定で作成
    pub fn new(name: String, url: String) -> Self {
        Self {
            name,
            url,
            enabled: true,
            check_interval_secs: 60,
            timeout_secs: 10,
            expected_status: 200,
            notify_on_down: true,
            notify_on_recovery: true,
            registered_at: Utc::now(),
            last_checked_at: None,
            last_status_ok: None,
            last_response_time_ms: None,
            consecutive_failures: 0,
            state: HealthState::Unknown,
        }
    }

    /// 定義フィールドの妥当性を検証
    ///
    /// 空の名前/URL、0以下の間隔・タイムアウトを拒否する。
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.name.trim().is_empty() {
            return Err(MonitorError::Validation("name must not be empty".into()));
        }
        if self.url.trim().is_empty() {
            return Err(MonitorError::Validation("url must not be empty".into()));
        }
        if self.check_interval_secs == 0 {
            return Err(MonitorError::Validation(
                "check interval must be positive".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(MonitorError::Validation("timeout must be positive".into()));
        }
        Ok(())
    }
}

/// 1回のプローブの分類結果
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// HTTPステータスコード（応答が得られなかった場合はNone）
    pub status_code: Option<u16>,
    /// 成否（応答あり かつ ステータス一致）
    pub is_ok: bool,
    /// 応答時間（ミリ秒）
    pub response_time_ms: f64,
    /// エラー内容（タイムアウト・接続失敗等）
    pub error: Option<String>,
}

/// 永続化されたチェック結果
///
/// 追記専用で、作成後に変更されることはない。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    /// 自動採番ID
    pub id: i64,
    /// エンドポイント名
    pub endpoint_name: String,
    /// チェック実行時刻
    pub checked_at: DateTime<Utc>,
    /// HTTPステータスコード
    pub status_code: Option<u16>,
    /// 成否
    pub is_ok: bool,
    /// 応答時間（ミリ秒）
    pub response_time_ms: Option<f64>,
    /// エラー内容
    pub error: Option<String>,
}
