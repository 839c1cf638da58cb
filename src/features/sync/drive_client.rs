use crate::features::sync::models::EncryptedBackup;
use crate::features::sync::remote::{RemoteFileMetadata, RemoteStorage};
use crate::shared::config::AppConfig;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// ファイル検索レスポンス
#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// ファイル検索レスポンスの1項目
#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

/// メタデータ取得レスポンス
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    modified_time: Option<String>,
    /// Drive APIはサイズを文字列で返す
    size: Option<String>,
}

/// Google Drive クライアント
///
/// バックアップファイルはユーザーのアプリ専用領域（appDataFolder）に
/// 固定ファイル名で1つだけ置く。ベースURLは設定で差し替え可能なため、
/// テストではローカルのダミーサーバーを指せる。
#[derive(Debug, Clone)]
pub struct DriveClient {
    /// HTTPクライアント（タイムアウト設定済み）
    http_client: reqwest::Client,
    /// Drive APIのベースURL
    api_base: String,
    /// DriveアップロードAPIのベースURL
    upload_api_base: String,
    /// バックアップファイル名
    backup_filename: String,
}

impl DriveClient {
    /// 新しいDriveClientを作成する
    ///
    /// # 引数
    /// * `config` - アプリケーション設定
    ///
    /// # 戻り値
    /// DriveClientインスタンス
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        // ベースURLの形式を起動時に検証する
        for base in [&config.drive_api_base, &config.drive_upload_api_base] {
            url::Url::parse(base)
                .map_err(|e| AppError::configuration(format!("不正なAPIベースURL {base}: {e}")))?;
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.sync_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::configuration(format!("HTTPクライアントの初期化に失敗: {e}"))
            })?;

        Ok(Self {
            http_client,
            api_base: config.drive_api_base.clone(),
            upload_api_base: config.drive_upload_api_base.clone(),
            backup_filename: config.backup_filename.clone(),
        })
    }

    /// レスポンスのステータスを確認し、失敗ならエラーに変換する
    fn ensure_success(
        response: reqwest::Response,
        operation: &str,
    ) -> AppResult<reqwest::Response> {
        if !response.status().is_success() {
            return Err(AppError::remote_unavailable(format!(
                "{operation}に失敗: status={}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteStorage for DriveClient {
    async fn find_backup(&self, access_token: &str) -> AppResult<Option<String>> {
        let name_query = format!("name='{}'", self.backup_filename);
        let response = self
            .http_client
            .get(format!("{}/files", self.api_base))
            .query(&[("spaces", "appDataFolder"), ("q", name_query.as_str())])
            .bearer_auth(access_token)
            .send()
            .await?;

        let list: FileList = Self::ensure_success(response, "バックアップファイルの検索")?
            .json()
            .await?;

        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_backup(
        &self,
        access_token: &str,
        backup: &EncryptedBackup,
    ) -> AppResult<()> {
        let metadata = serde_json::json!({
            "name": self.backup_filename,
            "parents": ["appDataFolder"],
            "mimeType": "application/json",
        });

        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(|e| AppError::remote_unavailable(format!("メタデータ作成エラー: {e}")))?,
            )
            .part(
                "file",
                reqwest::multipart::Part::text(serde_json::to_string(backup)?)
                    .mime_str("application/json")
                    .map_err(|e| AppError::remote_unavailable(format!("本文作成エラー: {e}")))?,
            );

        let response = self
            .http_client
            .post(format!("{}/files", self.upload_api_base))
            .query(&[("uploadType", "multipart")])
            .bearer_auth(access_token)
            .multipart(form)
            .send()
            .await?;

        Self::ensure_success(response, "バックアップファイルの作成")?;
        log::info!("リモートバックアップファイルを作成しました");
        Ok(())
    }

    async fn update_backup(
        &self,
        access_token: &str,
        file_id: &str,
        backup: &EncryptedBackup,
    ) -> AppResult<()> {
        let response = self
            .http_client
            .patch(format!("{}/files/{file_id}", self.upload_api_base))
            .query(&[("uploadType", "media")])
            .bearer_auth(access_token)
            .json(backup)
            .send()
            .await?;

        Self::ensure_success(response, "バックアップファイルの更新")?;
        log::info!("リモートバックアップファイルを更新しました: file_id={file_id}");
        Ok(())
    }

    async fn download_backup(
        &self,
        access_token: &str,
        file_id: &str,
    ) -> AppResult<EncryptedBackup> {
        let response = self
            .http_client
            .get(format!("{}/files/{file_id}", self.api_base))
            .query(&[("alt", "media")])
            .bearer_auth(access_token)
            .send()
            .await?;

        let backup = Self::ensure_success(response, "バックアップファイルのダウンロード")?
            .json()
            .await?;

        Ok(backup)
    }

    async fn delete_backup(&self, access_token: &str, file_id: &str) -> AppResult<()> {
        let response = self
            .http_client
            .delete(format!("{}/files/{file_id}", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::ensure_success(response, "バックアップファイルの削除")?;
        log::info!("リモートバックアップファイルを削除しました: file_id={file_id}");
        Ok(())
    }

    async fn backup_metadata(
        &self,
        access_token: &str,
        file_id: &str,
    ) -> AppResult<RemoteFileMetadata> {
        let response = self
            .http_client
            .get(format!("{}/files/{file_id}", self.api_base))
            .query(&[("fields", "modifiedTime,size")])
            .bearer_auth(access_token)
            .send()
            .await?;

        let metadata: FileMetadata =
            Self::ensure_success(response, "バックアップメタデータの取得")?
                .json()
                .await?;

        Ok(RemoteFileMetadata {
            modified_time: metadata.modified_time,
            size: metadata.size.and_then(|s| s.parse().ok()),
        })
    }
}
