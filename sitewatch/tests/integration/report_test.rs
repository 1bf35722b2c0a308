//! 週次レポート配送のファンアウトテスト

use crate::support::{create_test_registry, fast_endpoint, RecordingNotifier};
use chrono::{Duration as ChronoDuration, Utc, Weekday};
use sitewatch::db;
use sitewatch::notify::NullChartRenderer;
use sitewatch::report::WeeklyReporter;
use sitewatch::types::CheckOutcome;
use std::sync::Arc;

async fn seed_checks(registry: &sitewatch::registry::MonitorRegistry, name: &str) {
    let ok = CheckOutcome {
        status_code: Some(200),
        is_ok: true,
        response_time_ms: 120.0,
        error: None,
    };
    let failed = CheckOutcome {
        status_code: Some(500),
        is_ok: false,
        response_time_ms: 80.0,
        error: None,
    };
    let base = Utc::now() - ChronoDuration::hours(3);
    for i in 0..3 {
        db::checks::record_check(registry.pool(), name, base + ChronoDuration::minutes(i), &ok)
            .await
            .unwrap();
    }
    db::checks::record_check(registry.pool(), name, base + ChronoDuration::minutes(3), &failed)
        .await
        .unwrap();
}

fn reporter_for(
    registry: sitewatch::registry::MonitorRegistry,
    notifier: RecordingNotifier,
) -> WeeklyReporter {
    WeeklyReporter::new(
        registry,
        Arc::new(notifier),
        Arc::new(NullChartRenderer),
        Weekday::Mon,
        10,
        0,
    )
}

#[tokio::test]
async fn test_weekly_report_fans_out_to_all_endpoints() {
    let (registry, notifier) = create_test_registry().await;

    let mut with_data = fast_endpoint("shop", "http://127.0.0.1:1".to_string());
    with_data.enabled = false;
    registry.add(with_data).await.unwrap();
    seed_checks(&registry, "shop").await;

    let mut without_data = fast_endpoint("blog", "http://127.0.0.1:1".to_string());
    without_data.enabled = false;
    registry.add(without_data).await.unwrap();

    let reporter = reporter_for(registry, notifier.clone());
    reporter.send_weekly_report().await;

    let messages = notifier.messages();
    assert_eq!(messages.len(), 2, "one message per endpoint: {messages:?}");

    // データなしのエンドポイントは警告テキスト
    let no_data = messages
        .iter()
        .find(|m| m.contains("blog"))
        .expect("report for blog");
    assert!(no_data.contains("no monitoring data"));

    // データありのエンドポイントは集計レポート
    let report = messages
        .iter()
        .find(|m| m.contains("Report for shop"))
        .expect("report for shop");
    assert!(report.contains("✅ Up: 3 checks"));
    assert!(report.contains("❌ Down: 1 checks"));
    assert!(report.contains("Uptime: 75.00%"));
    assert!(report.contains("Avg response time: 120 ms"));
}

#[tokio::test]
async fn test_report_for_returns_text_without_chart() {
    let (registry, notifier) = create_test_registry().await;

    let mut endpoint = fast_endpoint("shop", "http://127.0.0.1:1".to_string());
    endpoint.enabled = false;
    registry.add(endpoint).await.unwrap();
    seed_checks(&registry, "shop").await;

    let reporter = reporter_for(registry, notifier);
    let (text, chart) = reporter.report_for("shop", 7).await.unwrap();

    assert!(text.contains("Report for shop"));
    // チャートレンダラ未設定なので画像なし
    assert!(chart.is_none());
}

#[tokio::test]
async fn test_empty_registry_sends_nothing() {
    let (registry, notifier) = create_test_registry().await;

    let reporter = reporter_for(registry, notifier.clone());
    reporter.send_weekly_report().await;

    assert!(notifier.messages().is_empty());
}
