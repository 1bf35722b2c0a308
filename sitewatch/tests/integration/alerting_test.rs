//! ダウン/復旧通知のエンドツーエンドテスト
//!
//! モックサーバーの応答を切り替えながら実際のチェックループを走らせ、
//! 通知がちょうど1回ずつ配送されることを確認する。

use crate::support::{create_test_registry, fast_endpoint, wait_until};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_three_failures_then_success_sends_one_down_and_one_recovery() {
    let mock = MockServer::start().await;
    // 最初の3リクエストは500、その後は200
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock)
        .await;

    let (registry, notifier) = create_test_registry().await;
    registry
        .add(fast_endpoint("shop", mock.uri()))
        .await
        .unwrap();

    // ダウン通知と復旧通知の両方が届くまで待つ
    let delivered = wait_until(Duration::from_secs(30), || async {
        let messages = notifier.messages();
        messages.iter().any(|m| m.contains("is down"))
            && messages.iter().any(|m| m.contains("recovered"))
    })
    .await;
    assert!(delivered, "expected both alerts, got: {:?}", notifier.messages());

    registry.shutdown().await;

    let messages = notifier.messages();
    let down_count = messages.iter().filter(|m| m.contains("is down")).count();
    let recovery_count = messages.iter().filter(|m| m.contains("recovered")).count();
    assert_eq!(down_count, 1, "down alert must fire exactly once: {messages:?}");
    assert_eq!(
        recovery_count, 1,
        "recovery alert must fire exactly once: {messages:?}"
    );

    // 内容の確認
    let down = messages.iter().find(|m| m.contains("is down")).unwrap();
    assert!(down.contains("shop"));
    assert!(down.contains("status 500"));
    let recovery = messages.iter().find(|m| m.contains("recovered")).unwrap();
    assert!(recovery.contains("shop"));
    assert!(recovery.contains("status 200"));
}

#[tokio::test]
async fn test_two_failures_do_not_alert() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock)
        .await;

    let (registry, notifier) = create_test_registry().await;
    registry
        .add(fast_endpoint("blip", mock.uri()))
        .await
        .unwrap();

    // 2連続失敗→成功の後も成功が続く状態まで待つ
    let recovered_silently = wait_until(Duration::from_secs(30), || async {
        registry
            .get("blip")
            .await
            .map(|e| e.last_status_ok == Some(true) && e.consecutive_failures == 0)
            .unwrap_or(false)
    })
    .await;
    assert!(recovered_silently);

    // しきい値未満の失敗からの回復は通知なし
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(
        notifier.messages().is_empty(),
        "no alerts expected, got: {:?}",
        notifier.messages()
    );

    registry.shutdown().await;
}

#[tokio::test]
async fn test_down_alert_not_repeated_while_still_failing() {
    let mock = MockServer::start().await;
    // ずっと失敗し続ける
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock)
        .await;

    let (registry, notifier) = create_test_registry().await;
    registry
        .add(fast_endpoint("dead", mock.uri()))
        .await
        .unwrap();

    // 5回以上失敗するまで待つ
    let kept_failing = wait_until(Duration::from_secs(30), || async {
        registry
            .get("dead")
            .await
            .map(|e| e.consecutive_failures >= 5)
            .unwrap_or(false)
    })
    .await;
    assert!(kept_failing);

    registry.shutdown().await;

    let messages = notifier.messages();
    let down_count = messages.iter().filter(|m| m.contains("is down")).count();
    assert_eq!(down_count, 1, "down alert must not repeat: {messages:?}");
}
