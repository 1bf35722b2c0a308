//! 障害/復旧状態機械
//!
//! 連続失敗回数と直近チェックの成否から次の状態と通知イベントを
//! 決定する純粋な遷移関数。通知フラグの適用は呼び出し側の責務。

use crate::types::HealthState;

/// ダウン通知を発火する連続失敗回数のしきい値
pub const DOWN_THRESHOLD: u32 = 3;

/// 通知イベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// しきい値到達によるダウン通知
    Down,
    /// ダウンからの復旧通知
    Recovery,
}

/// 1回の遷移の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// 遷移後の状態
    pub state: HealthState,
    /// 遷移後の連続失敗回数
    pub consecutive_failures: u32,
    /// 発火すべき通知（しきい値を跨いだ瞬間のみSome）
    pub alert: Option<AlertKind>,
}

/// チェック結果を状態機械に適用する
///
/// - 成功かつ失敗回数がしきい値未満: カウンタ0、`Healthy`、通知なし
/// - 成功かつ失敗回数がしきい値以上: カウンタ0、`Recovering`、復旧通知を1回だけ発火
/// - 失敗: カウンタ+1。ちょうどしきい値に達した場合のみダウン通知を発火
///   （4回目以降の失敗は再通知しない）
pub fn apply(state: HealthState, consecutive_failures: u32, is_ok: bool) -> Transition {
    if is_ok {
        if consecutive_failures >= DOWN_THRESHOLD {
            Transition {
                state: HealthState::Recovering,
                consecutive_failures: 0,
                alert: Some(AlertKind::Recovery),
            }
        } else {
            Transition {
                state: HealthState::Healthy,
                consecutive_failures: 0,
                alert: None,
            }
        }
    } else {
        let failures = consecutive_failures + 1;
        let new_state = if failures >= DOWN_THRESHOLD {
            HealthState::Down
        } else {
            HealthState::Degrading
        };
        Transition {
            state: new_state,
            consecutive_failures: failures,
            alert: (failures == DOWN_THRESHOLD).then_some(AlertKind::Down),
        }
    }
}
