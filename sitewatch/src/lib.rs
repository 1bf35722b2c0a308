//! Sitewatch
//!
//! HTTPエンドポイントの稼働監視サービス。エンドポイントごとの
//! チェックループ、連続失敗しきい値によるダウン/復旧通知、
//! 稼働率レポートとCSVエクスポートを提供する。

#![warn(missing_docs)]

/// CLIインターフェース
pub mod cli;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// データベースアクセス
pub mod db;

/// エラー型定義
pub mod error;

/// チェック実行と状態遷移
pub mod health;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 通知配送（Telegram等）
pub mod notify;

/// エンドポイント登録管理
pub mod registry;

/// レポート集計・週次配送・CSVエクスポート
pub mod report;

/// 型定義
pub mod types;
