use crate::shared::config::AppConfig;
use crate::shared::database::migrations::run_migrations;
use crate::shared::errors::{AppError, AppResult};
use rusqlite::Connection;

/// データベース接続を初期化し、マイグレーションを実行する
///
/// # 引数
/// * `config` - アプリケーション設定
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
///
/// # 処理内容
/// 1. アプリケーションデータディレクトリの確保
/// 2. データベース接続の開設
/// 3. テーブル作成とマイグレーションの実行
///
/// 接続はグローバルに保持せず、呼び出し側が所有して各コンポーネントへ
/// 明示的に渡す。テストではインメモリ接続に差し替えられる。
pub fn open_database(config: &AppConfig) -> AppResult<Connection> {
    if !config.data_dir.exists() {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            AppError::configuration(format!("アプリデータディレクトリの作成に失敗: {e}"))
        })?;
        log::info!(
            "アプリケーションデータディレクトリを作成: {:?}",
            config.data_dir
        );
    }

    let database_path = config.database_path();
    let conn = Connection::open(&database_path)?;

    run_migrations(&conn)?;

    log::info!("データベースを初期化しました: {:?}", database_path);

    Ok(conn)
}

/// インメモリのデータベース接続を開き、マイグレーションを実行する
///
/// # 戻り値
/// インメモリ接続、または失敗時はエラー
pub fn open_in_memory_database() -> AppResult<Connection> {
    let conn = Connection::open_in_memory()?;
    run_migrations(&conn)?;
    Ok(conn)
}
