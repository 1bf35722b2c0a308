//! 週次スケジュール計算
//!
//! 「次の月曜10:00」のような次回実行時刻の計算は現在時刻の純関数として
//! 切り出し、スリープ/配送ループとは独立にテストする。

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

/// 指定した曜日・時刻の次の発生時刻を返す
///
/// `hour`は0〜23、`minute`は0〜59（設定読み込み時に検証済み）。
/// `now`がちょうど実行時刻に一致する場合は1週間後を返す
/// （同一時刻での二重実行を避ける）。
pub fn next_weekly_run(
    now: DateTime<Utc>,
    weekday: Weekday,
    hour: u32,
    minute: u32,
) -> DateTime<Utc> {
    let days_ahead = i64::from(
        (7 + weekday.num_days_from_monday() - now.weekday().num_days_from_monday()) % 7,
    );

    let candidate = (now.date_naive() + Duration::days(days_ahead))
        .and_hms_opt(hour, minute, 0)
        .expect("hour/minute are validated at configuration load")
        .and_utc();

    if candidate <= now {
        candidate + Duration::days(7)
    } else {
        candidate
    }
}
