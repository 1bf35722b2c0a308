//! エラー型定義

use thiserror::Error;

/// 監視エンジン共通のエラー型
#[derive(Debug, Error)]
pub enum MonitorError {
    /// 同名のエンドポイントが既に存在する
    #[error("endpoint already exists: {0}")]
    DuplicateName(String),

    /// エンドポイントが見つからない
    #[error("endpoint not found: {0}")]
    NotFound(String),

    /// 定義フィールドの検証エラー
    #[error("validation failed: {0}")]
    Validation(String),

    /// 指定ウィンドウ内にチェック結果が存在しない
    ///
    /// レポート/エクスポートでは空ウィンドウは想定内の結果であり、
    /// ゼロ埋めサマリーではなくこのエラーで明示する。
    #[error("no monitoring data for the last {0} day(s)")]
    NoData(u32),

    /// データベースエラー
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// CSVエクスポートエラー
    #[error("export error: {0}")]
    Export(String),

    /// 通知送信エラー
    #[error("notification error: {0}")]
    Notification(String),
}
