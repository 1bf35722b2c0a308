//! エンドポイントごとのチェックループ
//!
//! 1つの有効なエンドポイントにつき1タスク。プローブ実行、結果分類、
//! 状態更新、通知、永続化、キャンセル可能なスリープを繰り返す。

use crate::db;
use crate::health::state::AlertKind;
use crate::registry::MonitorRegistry;
use crate::types::{CheckOutcome, MonitoredEndpoint};
use chrono::Utc;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// チェックループ本体
///
/// 外部からのキャンセル、エンドポイントの削除、無効化のいずれかで
/// エラーなく終了する。ループ内で発生したエラーはすべてログに留め、
/// ループ自体は継続する。
pub(crate) async fn run_check_loop(
    registry: MonitorRegistry,
    name: String,
    cancel: CancellationToken,
) {
    let client = match Client::builder().build() {
        Ok(client) => client,
        Err(e) => {
            error!(endpoint = %name, error = %e, "failed to create HTTP client");
            return;
        }
    };

    info!(endpoint = %name, "check loop started");

    loop {
        // 各イテレーションの先頭で最新の定義を参照する
        let Some(endpoint) = registry.get(&name).await else {
            break;
        };
        if !endpoint.enabled {
            break;
        }

        // キャンセルは実行中のプローブも即座に打ち切る。
        // キャンセル時は失敗としてのCheckRecordを残さない。
        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = probe(&client, &endpoint) => outcome,
        };
        let checked_at = Utc::now();

        let alert = registry.apply_outcome(&name, checked_at, &outcome).await;

        if outcome.is_ok {
            debug!(
                endpoint = %name,
                status = ?outcome.status_code,
                response_time_ms = outcome.response_time_ms as u64,
                "check succeeded"
            );
        } else {
            warn!(
                endpoint = %name,
                status = ?outcome.status_code,
                error = ?outcome.error,
                response_time_ms = outcome.response_time_ms as u64,
                "check failed"
            );
        }

        // 通知配送はループと直列。失敗してもループは止めない。
        if let Some(kind) = alert {
            let message = alert_message(&name, kind, &outcome);
            if let Err(e) = registry.notifier().send_text(&message).await {
                error!(endpoint = %name, error = %e, "failed to dispatch alert");
            }
        }

        // 永続化失敗はログのみで継続
        if let Err(e) = db::checks::record_check(registry.pool(), &name, checked_at, &outcome).await
        {
            error!(endpoint = %name, error = %e, "failed to persist check result");
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(u64::from(endpoint.check_interval_secs))) => {}
        }
    }

    debug!(endpoint = %name, "check loop stopped");
}

/// 1回のプローブを実行し結果を分類する
///
/// `is_ok = 応答あり かつ ステータスコード一致`。タイムアウト・
/// 接続エラー・その他の失敗はいずれもステータスコードなしの失敗として
/// 扱い、メッセージでのみ区別する。
pub(crate) async fn probe(client: &Client, endpoint: &MonitoredEndpoint) -> CheckOutcome {
    let timeout = Duration::from_secs(u64::from(endpoint.timeout_secs));
    let start = Instant::now();

    let result = client.get(&endpoint.url).timeout(timeout).send().await;
    let response_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    match result {
        Ok(response) => {
            let status = response.status().as_u16();
            CheckOutcome {
                status_code: Some(status),
                is_ok: status == endpoint.expected_status,
                response_time_ms,
                error: None,
            }
        }
        Err(e) if e.is_timeout() => CheckOutcome {
            status_code: None,
            is_ok: false,
            response_time_ms,
            error: Some(format!("timeout after {}s", endpoint.timeout_secs)),
        },
        Err(e) => CheckOutcome {
            status_code: None,
            is_ok: false,
            response_time_ms,
            error: Some(format!("connection error: {e}")),
        },
    }
}

/// 通知メッセージを組み立てる
fn alert_message(name: &str, kind: AlertKind, outcome: &CheckOutcome) -> String {
    let status_info = match (outcome.status_code, &outcome.error) {
        (Some(code), _) => format!("status {code}"),
        (None, Some(error)) => error.clone(),
        (None, None) => "no response".to_string(),
    };

    match kind {
        AlertKind::Down => format!(
            "🔴 {name} is down: {status_info}, {:.0} ms",
            outcome.response_time_ms
        ),
        AlertKind::Recovery => format!(
            "🟢 {name} recovered: {status_info}, {:.0} ms",
            outcome.response_time_ms
        ),
    }
}
