use crate::features::sync::models::EncryptedBackup;
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// リモートバックアップファイルのメタデータ（ダウンロードなしで取得）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFileMetadata {
    /// 最終更新時刻
    pub modified_time: Option<String>,
    /// ファイルサイズ（バイト）
    pub size: Option<i64>,
}

/// リモートブロブストレージの抽象
///
/// ユーザー所有のアプリ専用領域に対する固定ファイル名での
/// find / create / update / download / delete を提供する。すべての操作は
/// 有効なベアラートークンを必要とする。テストではインメモリ実装に
/// 差し替えられる。
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// アプリ領域内のバックアップファイルを名前で検索する
    ///
    /// # 戻り値
    /// ファイルID、存在しない場合はNone
    async fn find_backup(&self, access_token: &str) -> AppResult<Option<String>>;

    /// バックアップファイルを新規作成する
    async fn create_backup(
        &self,
        access_token: &str,
        backup: &EncryptedBackup,
    ) -> AppResult<()>;

    /// 既存のバックアップファイルを上書きする
    async fn update_backup(
        &self,
        access_token: &str,
        file_id: &str,
        backup: &EncryptedBackup,
    ) -> AppResult<()>;

    /// バックアップファイルをダウンロードする
    async fn download_backup(
        &self,
        access_token: &str,
        file_id: &str,
    ) -> AppResult<EncryptedBackup>;

    /// バックアップファイルを削除する
    async fn delete_backup(&self, access_token: &str, file_id: &str) -> AppResult<()>;

    /// バックアップファイルのメタデータを取得する
    async fn backup_metadata(
        &self,
        access_token: &str,
        file_id: &str,
    ) -> AppResult<RemoteFileMetadata>;
}
