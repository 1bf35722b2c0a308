//! エンドポイント定義のデータベース操作

use crate::types::MonitoredEndpoint;
use sqlx::SqlitePool;

/// エンドポイント定義を登録
pub async fn create_endpoint(
    pool: &SqlitePool,
    endpoint: &MonitoredEndpoint,
) -> Result<(), sqlx::Error> {
    let registered_at = endpoint.registered_at.to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO endpoints (
            name, url, enabled, check_interval_secs, timeout_secs,
            expected_status, notify_on_down, notify_on_recovery, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&endpoint.name)
    .bind(&endpoint.url)
    .bind(endpoint.enabled)
    .bind(endpoint.check_interval_secs as i32)
    .bind(endpoint.timeout_secs as i32)
    .bind(endpoint.expected_status as i32)
    .bind(endpoint.notify_on_down)
    .bind(endpoint.notify_on_recovery)
    .bind(&registered_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// エンドポイント定義一覧を取得
pub async fn list_endpoints(pool: &SqlitePool) -> Result<Vec<MonitoredEndpoint>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EndpointRow>(
        r#"
        SELECT name, url, enabled, check_interval_secs, timeout_secs,
               expected_status, notify_on_down, notify_on_recovery, created_at
        FROM endpoints
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// 名前でエンドポイント定義を取得
pub async fn get_endpoint(
    pool: &SqlitePool,
    name: &str,
) -> Result<Option<MonitoredEndpoint>, sqlx::Error> {
    let row = sqlx::query_as::<_, EndpointRow>(
        r#"
        SELECT name, url, enabled, check_interval_secs, timeout_secs,
               expected_status, notify_on_down, notify_on_recovery, created_at
        FROM endpoints
        WHERE name = ?
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// エンドポイント定義を更新（名前変更にも対応）
pub async fn update_endpoint(
    pool: &SqlitePool,
    old_name: &str,
    endpoint: &MonitoredEndpoint,
) -> Result<bool, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE endpoints SET
            name = ?, url = ?, enabled = ?, check_interval_secs = ?,
            timeout_secs = ?, expected_status = ?, notify_on_down = ?,
            notify_on_recovery = ?, updated_at = ?
        WHERE name = ?
        "#,
    )
    .bind(&endpoint.name)
    .bind(&endpoint.url)
    .bind(endpoint.enabled)
    .bind(endpoint.check_interval_secs as i32)
    .bind(endpoint.timeout_secs as i32)
    .bind(endpoint.expected_status as i32)
    .bind(endpoint.notify_on_down)
    .bind(endpoint.notify_on_recovery)
    .bind(&now)
    .bind(old_name)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// エンドポイント定義を削除
pub async fn delete_endpoint(pool: &SqlitePool, name: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM endpoints WHERE name = ?")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 有効/無効フラグを更新
pub async fn set_enabled(
    pool: &SqlitePool,
    name: &str,
    enabled: bool,
) -> Result<bool, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query("UPDATE endpoints SET enabled = ?, updated_at = ? WHERE name = ?")
        .bind(enabled)
        .bind(&now)
        .bind(name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 通知フラグを更新
pub async fn set_notify_flags(
    pool: &SqlitePool,
    name: &str,
    notify_on_down: bool,
    notify_on_recovery: bool,
) -> Result<bool, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE endpoints SET
            notify_on_down = ?, notify_on_recovery = ?, updated_at = ?
        WHERE name = ?
        "#,
    )
    .bind(notify_on_down)
    .bind(notify_on_recovery)
    .bind(&now)
    .bind(name)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// --- Internal Row Types ---

#[derive(sqlx::FromRow)]
struct EndpointRow {
    name: String,
    url: String,
    enabled: bool,
    check_interval_secs: i32,
    timeout_secs: i32,
    expected_status: i32,
    notify_on_down: bool,
    notify_on_recovery: bool,
    created_at: String,
}

impl From<EndpointRow> for MonitoredEndpoint {
    fn from(row: EndpointRow) -> Self {
        let mut endpoint = MonitoredEndpoint::new(row.name, row.url);
        endpoint.enabled = row.enabled;
        endpoint.check_interval_secs = row.check_interval_secs as u32;
        endpoint.timeout_secs = row.timeout_secs as u32;
        endpoint.expected_status = row.expected_status as u16;
        endpoint.notify_on_down = row.notify_on_down;
        endpoint.notify_on_recovery = row.notify_on_recovery;
        endpoint.registered_at = chrono::DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now());
        endpoint
    }
}
