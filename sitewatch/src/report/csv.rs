//! チェック結果のCSVエクスポート
//!
//! 行は(日時, ステータスコード, 成否0/1, 応答時間ms, エラー)を
//! 時刻昇順で出力する。ファイルへの書き出しは呼び出し側の責務。

use crate::db;
use crate::error::MonitorError;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

/// 指定エンドポイントの直近`days`日間のチェック結果をCSVに変換する
///
/// 未知のエンドポイントは`NotFound`、ウィンドウ内に1件もない場合は
/// `NoData`を返す。
pub async fn export_checks(
    pool: &SqlitePool,
    name: &str,
    days: u32,
) -> Result<Vec<u8>, MonitorError> {
    if db::endpoints::get_endpoint(pool, name).await?.is_none() {
        return Err(MonitorError::NotFound(name.to_string()));
    }

    let since = Utc::now() - Duration::days(i64::from(days));
    let checks = db::checks::list_checks_since(pool, name, since).await?;

    if checks.is_empty() {
        return Err(MonitorError::NoData(days));
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["timestamp", "status_code", "is_ok", "response_time_ms", "error"])
        .map_err(|e| MonitorError::Export(format!("csv write failed: {e}")))?;

    for check in checks {
        writer
            .write_record([
                check.checked_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                check
                    .status_code
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
                if check.is_ok { "1" } else { "0" }.to_string(),
                check
                    .response_time_ms
                    .map(|rt| format!("{rt:.0}"))
                    .unwrap_or_default(),
                check.error.unwrap_or_default(),
            ])
            .map_err(|e| MonitorError::Export(format!("csv write failed: {e}")))?;
    }

    writer
        .into_inner()
        .map_err(|e| MonitorError::Export(format!("csv write failed: {e}")))
}
