//! ヘルスチェック実行

/// エンドポイントごとのチェックループ
pub mod checker;

/// 障害/復旧状態機械
pub mod state;

pub use state::{AlertKind, DOWN_THRESHOLD};
