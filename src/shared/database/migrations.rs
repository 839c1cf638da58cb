use crate::shared::errors::AppResult;
use rusqlite::Connection;

/// すべてのデータベースマイグレーションを実行する
///
/// # 引数
/// * `conn` - データベース接続
///
/// # 戻り値
/// 成功時はOk(())、失敗時はエラー
pub fn run_migrations(conn: &Connection) -> AppResult<()> {
    // 支出エントリテーブルを作成
    conn.execute(
        "CREATE TABLE IF NOT EXISTS spend_entries (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            amount REAL NOT NULL,
            category TEXT NOT NULL,
            custom_category TEXT,
            notes TEXT,
            timestamp TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // ユーザー別・日時・カテゴリの3系統の検索をそれぞれインデックスで支える
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_spend_entries_user ON spend_entries(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_spend_entries_timestamp ON spend_entries(timestamp)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_spend_entries_category ON spend_entries(category)",
        [],
    )?;

    // ユーザーテーブルを作成
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            profile_pic_url TEXT,
            theme TEXT NOT NULL DEFAULT 'light',
            currency TEXT NOT NULL DEFAULT 'INR',
            date_format TEXT NOT NULL DEFAULT 'DD/MM/YYYY',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}
