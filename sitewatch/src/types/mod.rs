//! 型定義

/// エンドポイント関連の型
pub mod endpoint;

pub use endpoint::{CheckOutcome, CheckRecord, HealthState, MonitoredEndpoint};
