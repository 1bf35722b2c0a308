//! 実際のループを走らせた状態でのレジストリ操作のテスト

use crate::support::{create_test_registry, fast_endpoint, wait_until};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn healthy_mock() -> MockServer {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock)
        .await;
    mock
}

#[tokio::test]
async fn test_add_starts_loop_and_delete_stops_it() {
    let mock = healthy_mock().await;
    let (registry, _notifier) = create_test_registry().await;

    registry
        .add(fast_endpoint("shop", mock.uri()))
        .await
        .unwrap();
    assert!(registry.has_active_loop("shop").await);

    // 最初のチェックが完了するまで待つ
    let checked = wait_until(Duration::from_secs(10), || async {
        registry
            .get("shop")
            .await
            .map(|e| e.last_checked_at.is_some())
            .unwrap_or(false)
    })
    .await;
    assert!(checked);

    registry.delete("shop").await.unwrap();
    assert!(!registry.has_active_loop("shop").await);
    assert_eq!(registry.count().await, 0);
}

#[tokio::test]
async fn test_rapid_toggles_leave_at_most_one_loop() {
    let mock = healthy_mock().await;
    let (registry, _notifier) = create_test_registry().await;

    registry
        .add(fast_endpoint("shop", mock.uri()))
        .await
        .unwrap();

    for _ in 0..4 {
        registry.toggle("shop").await.unwrap();
    }

    // 偶数回のトグルで元の有効状態に戻る
    let endpoint = registry.get("shop").await.unwrap();
    assert!(endpoint.enabled);
    assert_eq!(registry.active_loop_count().await, 1);

    registry.shutdown().await;
    assert_eq!(registry.active_loop_count().await, 0);
}

#[tokio::test]
async fn test_rename_while_running_moves_loop() {
    let mock = healthy_mock().await;
    let (registry, _notifier) = create_test_registry().await;

    registry
        .add(fast_endpoint("old-name", mock.uri()))
        .await
        .unwrap();

    let renamed = fast_endpoint("new-name", mock.uri());
    registry.update("old-name", renamed).await.unwrap();

    assert!(registry.get("old-name").await.is_none());
    assert!(!registry.has_active_loop("old-name").await);
    assert!(registry.has_active_loop("new-name").await);

    // 新しい名前でチェックが続く
    let checked = wait_until(Duration::from_secs(10), || async {
        registry
            .get("new-name")
            .await
            .map(|e| e.last_status_ok == Some(true))
            .unwrap_or(false)
    })
    .await;
    assert!(checked);

    registry.shutdown().await;
}

#[tokio::test]
async fn test_update_resets_runtime_state() {
    let mock = healthy_mock().await;
    let (registry, _notifier) = create_test_registry().await;

    let mut disabled = fast_endpoint("shop", mock.uri());
    disabled.enabled = false;
    registry.add(disabled).await.unwrap();

    // 定義置換でランタイム状態は初期化される
    let mut replacement = fast_endpoint("shop", mock.uri());
    replacement.enabled = false;
    replacement.expected_status = 204;
    registry.update("shop", replacement).await.unwrap();

    let endpoint = registry.get("shop").await.unwrap();
    assert_eq!(endpoint.expected_status, 204);
    assert_eq!(endpoint.consecutive_failures, 0);
    assert!(endpoint.last_checked_at.is_none());
}
