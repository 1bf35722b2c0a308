//! レポート集計
//!
//! 永続化されたチェック結果から稼働率・失敗回数・平均応答時間を
//! 集計する。オンデマンド実行と週次スケジュール実行の両方から
//! 呼び出される。

/// CSVエクスポート
pub mod csv;

/// 週次スケジュール計算と配送ループ
pub mod schedule;

use crate::db;
use crate::error::MonitorError;
use crate::notify::{ChartRenderer, Notifier};
use crate::registry::MonitorRegistry;
use chrono::{DateTime, Duration, Utc, Weekday};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 週次レポートのデフォルトウィンドウ（日）
pub const DEFAULT_REPORT_DAYS: u32 = 7;

/// 1エンドポイントの集計サマリー
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    /// エンドポイント名
    pub endpoint_name: String,
    /// ウィンドウ開始時刻
    pub since: DateTime<Utc>,
    /// ウィンドウ終了時刻
    pub until: DateTime<Utc>,
    /// チェック総数
    pub total: usize,
    /// 成功数
    pub ok: usize,
    /// 失敗数
    pub fail: usize,
    /// 稼働率（%）
    pub uptime_percent: f64,
    /// 成功チェックのみの平均応答時間（ミリ秒）
    pub avg_response_time_ms: f64,
}

/// 直近`days`日間のチェック結果を集計する
///
/// 未知のエンドポイント名は`NotFound`、ウィンドウ内にチェックが
/// 存在しない場合は`NoData`を返す（ゼロ埋めサマリーは返さない）。
pub async fn summarize(
    registry: &MonitorRegistry,
    name: &str,
    days: u32,
) -> Result<ReportSummary, MonitorError> {
    if registry.get(name).await.is_none() {
        return Err(MonitorError::NotFound(name.to_string()));
    }

    let until = Utc::now();
    let since = until - Duration::days(i64::from(days));
    let checks = db::checks::list_checks_since(registry.pool(), name, since).await?;

    if checks.is_empty() {
        return Err(MonitorError::NoData(days));
    }

    let total = checks.len();
    let ok = checks.iter().filter(|c| c.is_ok).count();
    let fail = total - ok;
    let uptime_percent = (ok as f64 / total as f64) * 100.0;
    let avg_response_time_ms = if ok > 0 {
        let sum: f64 = checks
            .iter()
            .filter(|c| c.is_ok)
            .filter_map(|c| c.response_time_ms)
            .sum();
        sum / ok as f64
    } else {
        0.0
    };

    Ok(ReportSummary {
        endpoint_name: name.to_string(),
        since,
        until,
        total,
        ok,
        fail,
        uptime_percent,
        avg_response_time_ms,
    })
}

/// サマリーを通知メッセージ用のテキストに整形する
pub fn format_summary(summary: &ReportSummary) -> String {
    format!(
        "📊 Report for {}\n\
         Period: {} — {}\n\n\
         ✅ Up: {} checks\n\
         ❌ Down: {} checks\n\
         📈 Uptime: {:.2}%\n\
         ⏱ Avg response time: {:.0} ms",
        summary.endpoint_name,
        summary.since.format("%d.%m.%Y"),
        summary.until.format("%d.%m.%Y"),
        summary.ok,
        summary.fail,
        summary.uptime_percent,
        summary.avg_response_time_ms,
    )
}

/// チャート描画用の応答時間の時系列を取得する
///
/// 未知のエンドポイント名は`NotFound`。応答時間が記録されていない
/// チェックは0として扱う。
pub async fn response_time_points(
    registry: &MonitorRegistry,
    name: &str,
    days: u32,
) -> Result<Vec<(DateTime<Utc>, f64)>, MonitorError> {
    if registry.get(name).await.is_none() {
        return Err(MonitorError::NotFound(name.to_string()));
    }

    let since = Utc::now() - Duration::days(i64::from(days));
    let checks = db::checks::list_checks_since(registry.pool(), name, since).await?;

    Ok(checks
        .into_iter()
        .map(|c| (c.checked_at, c.response_time_ms.unwrap_or(0.0)))
        .collect())
}

/// 週次レポート配送
///
/// 毎週決まった曜日・時刻に全エンドポイントへファンアウトし、
/// エンドポイントごとにサマリーとチャートを1通ずつ送る。
pub struct WeeklyReporter {
    registry: MonitorRegistry,
    notifier: Arc<dyn Notifier>,
    renderer: Arc<dyn ChartRenderer>,
    weekday: Weekday,
    hour: u32,
    minute: u32,
}

impl WeeklyReporter {
    /// 新しい週次レポーターを作成
    pub fn new(
        registry: MonitorRegistry,
        notifier: Arc<dyn Notifier>,
        renderer: Arc<dyn ChartRenderer>,
        weekday: Weekday,
        hour: u32,
        minute: u32,
    ) -> Self {
        Self {
            registry,
            notifier,
            renderer,
            weekday,
            hour,
            minute,
        }
    }

    /// 1エンドポイント分のレポート本文とチャートを生成する
    ///
    /// オンデマンドのレポート要求もこの経路を使う。チャートは点列が
    /// 空の場合や未設定のレンダラではNoneになる。
    pub async fn report_for(
        &self,
        name: &str,
        days: u32,
    ) -> Result<(String, Option<Vec<u8>>), MonitorError> {
        let summary = summarize(&self.registry, name, days).await?;
        let text = format_summary(&summary);

        let points = response_time_points(&self.registry, name, days).await?;
        let title = format!("Response time for {name} (last {days} days)");
        let chart = self.renderer.render_time_series(&points, &title);

        Ok((text, chart))
    }

    /// 全エンドポイントへ週次レポートを配送する
    ///
    /// エンドポイント単位の失敗はログに留め、ファンアウトを継続する。
    pub async fn send_weekly_report(&self) {
        let endpoints = self.registry.list().await;
        info!(endpoint_count = endpoints.len(), "sending weekly report");

        for endpoint in endpoints {
            let result = self.report_for(&endpoint.name, DEFAULT_REPORT_DAYS).await;
            let dispatch = match result {
                Ok((text, Some(chart))) => {
                    self.notifier.send_image_with_caption(&chart, &text).await
                }
                Ok((text, None)) => self.notifier.send_text(&text).await,
                Err(MonitorError::NoData(days)) => {
                    let text = format!(
                        "⚠️ {}: no monitoring data for the last {} day(s)",
                        endpoint.name, days
                    );
                    self.notifier.send_text(&text).await
                }
                Err(e) => {
                    error!(endpoint = %endpoint.name, error = %e, "failed to build report");
                    continue;
                }
            };

            if let Err(e) = dispatch {
                error!(endpoint = %endpoint.name, error = %e, "failed to deliver report");
            }
        }
    }

    /// 配送ループをバックグラウンドで開始する
    ///
    /// 次回実行時刻まではキャンセル可能なスリープで待機する。
    pub fn start(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                weekday = %self.weekday,
                hour = self.hour,
                minute = self.minute,
                "weekly report loop started"
            );

            loop {
                let now = Utc::now();
                let next = schedule::next_weekly_run(now, self.weekday, self.hour, self.minute);
                let wait = (next - now)
                    .to_std()
                    .unwrap_or_else(|_| std::time::Duration::from_secs(0));

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }

                self.send_weekly_report().await;
            }

            info!("weekly report loop stopped");
        })
    }
}
