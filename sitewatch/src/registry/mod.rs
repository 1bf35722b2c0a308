//! エンドポイントレジストリ＆スケジューラ
//!
//! 監視対象エンドポイントの正本をメモリ内で管理し、SQLiteと同期する。
//! あわせて名前→チェックタスクの1:1対応を所有し、同名エンドポイントに
//! 対して同時に2つのループが走らないことを保証する。
//!
//! ロック規約: add/update/delete/toggleのstop/start手順はタスクマップの
//! Mutexで全体を直列化する。エンドポイントマップのロックはタスクの
//! 停止待ちをまたいで保持しない（ループ側が書き込みに来るため）。

use crate::db;
use crate::error::MonitorError;
use crate::health::checker::run_check_loop;
use crate::health::state::{self, AlertKind};
use crate::notify::Notifier;
use crate::types::{CheckOutcome, MonitoredEndpoint};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 実行中のチェックループへのハンドル
struct CheckTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// エンドポイントレジストリ
///
/// cloneで共有されるハンドル。すべての外部からの変更は本レジストリの
/// メソッドを経由し、`list`/`get`が返すのはその時点のコピーのみ。
#[derive(Clone)]
pub struct MonitorRegistry {
    endpoints: Arc<RwLock<HashMap<String, MonitoredEndpoint>>>,
    tasks: Arc<Mutex<HashMap<String, CheckTask>>>,
    pool: SqlitePool,
    notifier: Arc<dyn Notifier>,
    shutdown: CancellationToken,
}

impl MonitorRegistry {
    /// 空のレジストリを作成する（読み込みは`load_all`で行う）
    pub fn new(pool: SqlitePool, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            endpoints: Arc::new(RwLock::new(HashMap::new())),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            pool,
            notifier,
            shutdown: CancellationToken::new(),
        }
    }

    /// DBから全エンドポイント定義を読み込み、有効なものごとに
    /// チェックループを開始する。起動時に1回呼ばれる。
    pub async fn load_all(&self) -> Result<(), MonitorError> {
        let loaded = db::endpoints::list_endpoints(&self.pool).await?;

        let mut tasks = self.tasks.lock().await;

        // 再読み込みに備えて既存ループを停止してから置き換える
        for (_, task) in tasks.drain() {
            task.cancel.cancel();
            let _ = task.handle.await;
        }

        let enabled: Vec<String> = loaded
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.name.clone())
            .collect();

        {
            let mut endpoints = self.endpoints.write().await;
            endpoints.clear();
            for endpoint in loaded {
                endpoints.insert(endpoint.name.clone(), endpoint);
            }
            info!(endpoint_count = endpoints.len(), "loaded endpoints from database");
        }

        for name in enabled {
            self.start_task_locked(&mut tasks, name);
        }

        Ok(())
    }

    /// エンドポイントを追加する
    ///
    /// 検証・重複チェック・永続化の後にメモリへ反映し、有効なら
    /// ループを開始する。
    pub async fn add(&self, endpoint: MonitoredEndpoint) -> Result<(), MonitorError> {
        endpoint.validate()?;

        let mut tasks = self.tasks.lock().await;

        if self.endpoints.read().await.contains_key(&endpoint.name) {
            return Err(MonitorError::DuplicateName(endpoint.name));
        }

        db::endpoints::create_endpoint(&self.pool, &endpoint).await?;

        let name = endpoint.name.clone();
        let enabled = endpoint.enabled;
        self.endpoints
            .write()
            .await
            .insert(name.clone(), endpoint);

        if enabled {
            self.start_task_locked(&mut tasks, name.clone());
        }

        info!(endpoint = %name, enabled, "endpoint added");
        Ok(())
    }

    /// エンドポイントを削除し、関連ループを停止する
    pub async fn delete(&self, name: &str) -> Result<(), MonitorError> {
        let mut tasks = self.tasks.lock().await;

        if !self.endpoints.read().await.contains_key(name) {
            return Err(MonitorError::NotFound(name.to_string()));
        }

        // 永続化が失敗した場合にループと登録を無傷で残すため、DBを先に更新する
        db::endpoints::delete_endpoint(&self.pool, name).await?;
        self.stop_task_locked(&mut tasks, name).await;
        self.endpoints.write().await.remove(name);

        info!(endpoint = %name, "endpoint deleted");
        Ok(())
    }

    /// エンドポイント定義を置き換える（名前変更にも対応）
    ///
    /// 永続化・旧ループの停止・置換・新ループの開始を1つの直列化された
    /// 手順として行う。新しい名前が他のエンドポイントと衝突する場合は
    /// 拒否する。
    pub async fn update(
        &self,
        old_name: &str,
        new_definition: MonitoredEndpoint,
    ) -> Result<(), MonitorError> {
        new_definition.validate()?;

        let mut tasks = self.tasks.lock().await;

        {
            let endpoints = self.endpoints.read().await;
            if !endpoints.contains_key(old_name) {
                return Err(MonitorError::NotFound(old_name.to_string()));
            }
            if new_definition.name != old_name && endpoints.contains_key(&new_definition.name) {
                return Err(MonitorError::DuplicateName(new_definition.name));
            }
        }

        db::endpoints::update_endpoint(&self.pool, old_name, &new_definition).await?;
        self.stop_task_locked(&mut tasks, old_name).await;

        let new_name = new_definition.name.clone();
        let enabled = new_definition.enabled;
        {
            let mut endpoints = self.endpoints.write().await;
            endpoints.remove(old_name);
            endpoints.insert(new_name.clone(), new_definition);
        }

        if enabled {
            self.start_task_locked(&mut tasks, new_name.clone());
        }

        info!(old_name, endpoint = %new_name, "endpoint updated");
        Ok(())
    }

    /// 有効/無効を反転する
    ///
    /// 無効化でループを停止し、有効化で新しいループを開始する。
    /// 連続失敗カウンタは引き継がれる。更新後のスナップショットを返す。
    pub async fn toggle(&self, name: &str) -> Result<MonitoredEndpoint, MonitorError> {
        let mut tasks = self.tasks.lock().await;

        let new_enabled = {
            let endpoints = self.endpoints.read().await;
            let endpoint = endpoints
                .get(name)
                .ok_or_else(|| MonitorError::NotFound(name.to_string()))?;
            !endpoint.enabled
        };

        // DB更新に成功してからメモリとタスクを追従させる
        db::endpoints::set_enabled(&self.pool, name, new_enabled).await?;

        let snapshot = {
            let mut endpoints = self.endpoints.write().await;
            let endpoint = endpoints
                .get_mut(name)
                .ok_or_else(|| MonitorError::NotFound(name.to_string()))?;
            endpoint.enabled = new_enabled;
            endpoint.clone()
        };

        if snapshot.enabled {
            self.start_task_locked(&mut tasks, name.to_string());
        } else {
            self.stop_task_locked(&mut tasks, name).await;
        }

        info!(endpoint = %name, enabled = snapshot.enabled, "endpoint toggled");
        Ok(snapshot)
    }

    /// ダウン/復旧通知フラグを設定する
    pub async fn set_notify_flags(
        &self,
        name: &str,
        notify_on_down: bool,
        notify_on_recovery: bool,
    ) -> Result<MonitoredEndpoint, MonitorError> {
        if !self.endpoints.read().await.contains_key(name) {
            return Err(MonitorError::NotFound(name.to_string()));
        }

        db::endpoints::set_notify_flags(&self.pool, name, notify_on_down, notify_on_recovery)
            .await?;

        let snapshot = {
            let mut endpoints = self.endpoints.write().await;
            let endpoint = endpoints
                .get_mut(name)
                .ok_or_else(|| MonitorError::NotFound(name.to_string()))?;
            endpoint.notify_on_down = notify_on_down;
            endpoint.notify_on_recovery = notify_on_recovery;
            endpoint.clone()
        };

        Ok(snapshot)
    }

    /// 全エンドポイントのスナップショットを取得
    ///
    /// 返るのはその時点のコピーであり、書き換えてもレジストリには
    /// 反映されない。
    pub async fn list(&self) -> Vec<MonitoredEndpoint> {
        let mut all: Vec<MonitoredEndpoint> =
            self.endpoints.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// 名前でスナップショットを取得
    pub async fn get(&self, name: &str) -> Option<MonitoredEndpoint> {
        self.endpoints.read().await.get(name).cloned()
    }

    /// エンドポイント数を取得
    pub async fn count(&self) -> usize {
        self.endpoints.read().await.len()
    }

    /// 実行中のチェックループ数を取得
    pub async fn active_loop_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// 指定エンドポイントのループが実行中か確認
    pub async fn has_active_loop(&self, name: &str) -> bool {
        self.tasks.lock().await.contains_key(name)
    }

    /// 全ループをキャンセルし、終了を待ってから戻る
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let mut tasks = self.tasks.lock().await;
        let count = tasks.len();
        for (_, task) in tasks.drain() {
            let _ = task.handle.await;
        }
        info!(loop_count = count, "all check loops stopped");
    }

    /// チェック結果をランタイム状態へ反映する
    ///
    /// 対象エンドポイントのループのみが呼び出す。状態機械を1段進め、
    /// 通知フラグを適用した上で発火すべきイベントを返す。
    pub(crate) async fn apply_outcome(
        &self,
        name: &str,
        checked_at: DateTime<Utc>,
        outcome: &CheckOutcome,
    ) -> Option<AlertKind> {
        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints.get_mut(name)?;

        let transition = state::apply(endpoint.state, endpoint.consecutive_failures, outcome.is_ok);

        endpoint.last_checked_at = Some(checked_at);
        endpoint.last_status_ok = Some(outcome.is_ok);
        endpoint.last_response_time_ms = Some(outcome.response_time_ms);
        endpoint.consecutive_failures = transition.consecutive_failures;
        endpoint.state = transition.state;

        match transition.alert {
            Some(AlertKind::Down) if endpoint.notify_on_down => Some(AlertKind::Down),
            Some(AlertKind::Recovery) if endpoint.notify_on_recovery => Some(AlertKind::Recovery),
            Some(suppressed) => {
                debug!(endpoint = %name, ?suppressed, "alert suppressed by notify flags");
                None
            }
            None => None,
        }
    }

    /// DBプールへの参照を取得
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 通知シンクを取得
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    /// ループを開始する（タスクマップのロックを保持した状態で呼ぶ）
    ///
    /// 既にループが存在する場合は何もしない。
    fn start_task_locked(&self, tasks: &mut MutexGuard<'_, HashMap<String, CheckTask>>, name: String) {
        if tasks.contains_key(&name) {
            warn!(endpoint = %name, "check loop already running");
            return;
        }

        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(run_check_loop(self.clone(), name.clone(), cancel.clone()));
        tasks.insert(name, CheckTask { cancel, handle });
    }

    /// ループを停止し終了を待つ（タスクマップのロックを保持した状態で呼ぶ）
    async fn stop_task_locked(
        &self,
        tasks: &mut MutexGuard<'_, HashMap<String, CheckTask>>,
        name: &str,
    ) {
        if let Some(task) = tasks.remove(name) {
            task.cancel.cancel();
            let _ = task.handle.await;
            debug!(endpoint = %name, "check loop cancelled");
        }
    }
}
