//! ロギング初期化ユーティリティ

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// トレーシングサブスクライバを初期化する
///
/// フィルタは`RUST_LOG`から読み込み、未設定なら`info`。
/// `log_file`を指定するとファイルへ書き込み、戻り値のガードが
/// 生きている間だけバックグラウンドのライターがフラッシュされる。
pub fn init(log_file: Option<&str>) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "sitewatch.log".to_string());

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();

            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            None
        }
    }
}
