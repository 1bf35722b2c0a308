//! データベースアクセス層
//!
//! SQLiteベースのデータ永続化

/// エンドポイント定義の管理
pub mod endpoints;

/// チェック結果ログの管理
pub mod checks;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;

/// 接続プールを初期化する
///
/// SQLiteファイルはディレクトリが存在しないと作成できないため、
/// 先に親ディレクトリを作成する。`sqlite::memory:`のような特殊指定は
/// そのまま扱う。
pub async fn init_pool(database_url: &str) -> sqlx::Result<SqlitePool> {
    if let Some(path) = database_url.strip_prefix("sqlite:") {
        if !path.starts_with(':') {
            // `sqlite://`形式に備えてスラッシュを除去し、クエリ部分を除外
            let normalized = path.trim_start_matches("//");
            let path_without_params = normalized.split('?').next().unwrap_or(normalized);
            let db_path = std::path::Path::new(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePool::connect_with(connect_options).await
}
