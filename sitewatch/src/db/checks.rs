//! チェック結果ログのデータベース操作
//!
//! 追記専用のログ。1エンドポイントのチェックは逐次実行されるため、
//! 完了順＝挿入順が保たれる。

use crate::types::{CheckOutcome, CheckRecord};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// チェック結果を記録
pub async fn record_check(
    pool: &SqlitePool,
    endpoint_name: &str,
    checked_at: DateTime<Utc>,
    outcome: &CheckOutcome,
) -> Result<i64, sqlx::Error> {
    let checked_at = checked_at.to_rfc3339();

    let result = sqlx::query(
        r#"
        INSERT INTO checks (
            endpoint_name, checked_at, status_code, is_ok, response_time_ms, error
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(endpoint_name)
    .bind(&checked_at)
    .bind(outcome.status_code.map(|v| v as i32))
    .bind(outcome.is_ok)
    .bind(outcome.response_time_ms)
    .bind(&outcome.error)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// 指定エンドポイントの指定時刻以降のチェック結果を時刻昇順で取得
///
/// エンドポイントによる絞り込みはクエリ層で行う。
pub async fn list_checks_since(
    pool: &SqlitePool,
    endpoint_name: &str,
    since: DateTime<Utc>,
) -> Result<Vec<CheckRecord>, sqlx::Error> {
    let since = since.to_rfc3339();

    let rows = sqlx::query_as::<_, CheckRow>(
        r#"
        SELECT id, endpoint_name, checked_at, status_code, is_ok, response_time_ms, error
        FROM checks
        WHERE endpoint_name = ? AND checked_at >= ?
        ORDER BY checked_at ASC
        "#,
    )
    .bind(endpoint_name)
    .bind(&since)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// 指定エンドポイントのチェック結果件数を取得
pub async fn count_checks(pool: &SqlitePool, endpoint_name: &str) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM checks WHERE endpoint_name = ?")
        .bind(endpoint_name)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

// --- Internal Row Types ---

#[derive(sqlx::FromRow)]
struct CheckRow {
    id: i64,
    endpoint_name: String,
    checked_at: String,
    status_code: Option<i32>,
    is_ok: bool,
    response_time_ms: Option<f64>,
    error: Option<String>,
}

impl From<CheckRow> for CheckRecord {
    fn from(row: CheckRow) -> Self {
        CheckRecord {
            id: row.id,
            endpoint_name: row.endpoint_name,
            checked_at: chrono::DateTime::parse_from_rfc3339(&row.checked_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
            status_code: row.status_code.map(|v| v as u16),
            is_ok: row.is_ok,
            response_time_ms: row.response_time_ms,
            error: row.error,
        }
    }
}
