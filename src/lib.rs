//! 個人向け支出トラッキングアプリケーションのコアライブラリ
//!
//! 支出エントリのローカルストア、期間別・カテゴリ別の集計クエリ、
//! クライアントサイド暗号化、Google Driveアプリ専用領域への
//! バックアップ同期を提供します。画面レイアウト・チャート・ルーティング
//! などのプレゼンテーション層は本ライブラリの呼び出し側の責務です。

pub mod features;
pub mod shared;

use crate::features::security::{DeviceSalt, KeyDerivation, PayloadCipher};
use crate::features::sync::{DriveClient, SyncService};
use crate::shared::config::AppConfig;
use crate::shared::database::open_database;
use crate::shared::errors::AppResult;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// 主要な型の再エクスポート
pub use crate::features::auth::{AuthService, AuthSession, User, UserPreferences};
pub use crate::features::expenses::{
    Category, CategorySummary, CreateSpendEntryDto, SpendEntry, TimePeriodSummary,
    UpdateSpendEntryDto,
};
pub use crate::features::sync::{RestoreOutcome, SyncOutcome, SyncState};
pub use crate::shared::errors::{AppError, ErrorSeverity};
pub use crate::shared::utils::dates::TimeFilter;

/// アプリケーションコアの組み立て結果
///
/// データベース接続は単一の`Mutex`で保護され、各コンポーネントへ明示的に
/// 渡される。プロセス全体で遅延初期化されるグローバルなハンドルは持たない。
pub struct Core {
    /// データベース接続
    pub db: Arc<Mutex<Connection>>,
    /// ペイロード暗号化サービス
    pub cipher: PayloadCipher,
    /// バックアップ同期サービス
    pub sync: SyncService<DriveClient>,
}

/// アプリケーションコアを初期化する
///
/// # 引数
/// * `config` - アプリケーション設定
///
/// # 戻り値
/// 組み立て済みのコア、または失敗時はエラー
///
/// # 処理内容
/// 1. データベースを開き、マイグレーションを実行
/// 2. デバイスソルトを読み込み（なければ生成して永続化）
/// 3. 鍵導出・暗号化サービスを構築
/// 4. Driveクライアントと同期サービスを構築
pub fn initialize_core(config: AppConfig) -> AppResult<Core> {
    log::info!("アプリケーションコアの初期化を開始します...");

    let db = Arc::new(Mutex::new(open_database(&config)?));

    let salt = DeviceSalt::load_or_generate(&config.device_salt_path())?;
    let cipher = PayloadCipher::new(KeyDerivation::new(salt));

    let drive_client = DriveClient::new(&config)?;
    let sync = SyncService::new(
        Arc::clone(&db),
        drive_client,
        cipher.clone(),
        Duration::from_secs(config.sync_timeout_secs),
    );

    log::info!("アプリケーションコアの初期化が完了しました");

    Ok(Core { db, cipher, sync })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(data_dir: std::path::PathBuf) -> AppConfig {
        AppConfig {
            data_dir,
            database_filename: "test.db".to_string(),
            drive_api_base: "http://127.0.0.1:1/drive/v3".to_string(),
            drive_upload_api_base: "http://127.0.0.1:1/upload/drive/v3".to_string(),
            backup_filename: "spend-analyzer-backup.json".to_string(),
            sync_timeout_secs: 5,
        }
    }

    #[test]
    fn test_initialize_core_sets_up_database_and_salt() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path().to_path_buf());

        let core = initialize_core(config.clone()).unwrap();

        // データベースとデバイスソルトが永続化されている
        assert!(config.database_path().exists());
        assert!(config.device_salt_path().exists());

        // ストアが使用可能
        let conn = core.db.lock().unwrap();
        assert!(features::expenses::list_all(&conn, "user-1")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_initialize_core_reuses_device_salt() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path().to_path_buf());

        initialize_core(config.clone()).unwrap();
        let first_salt = std::fs::read_to_string(config.device_salt_path()).unwrap();

        initialize_core(config.clone()).unwrap();
        let second_salt = std::fs::read_to_string(config.device_salt_path()).unwrap();

        // 2回目の起動でも同じソルトを使う
        assert_eq!(first_salt, second_salt);
    }
}
