use crate::features::auth::models::AuthSession;
use crate::features::expenses::models::SpendEntry;
use crate::features::expenses::repository;
use crate::features::security::encryption::PayloadCipher;
use crate::features::sync::models::{
    EncryptedBackup, RestoreOutcome, SyncOutcome, SyncState, BACKUP_VERSION,
};
use crate::features::sync::remote::{RemoteFileMetadata, RemoteStorage};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::dates::now_timestamp;
use rusqlite::Connection;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// バックアップ同期サービス
///
/// ローカルストア→暗号化→リモート単一ファイルの順で全件スナップショットを
/// アップロードし、逆順でリストアする。同期はフルスナップショットの
/// 後勝ち上書きで、マージも差分アップロードも行わない。
/// `SyncState::sync_in_progress` によりセッション内の同期は常に高々1つ。
pub struct SyncService<R: RemoteStorage> {
    /// データベース接続
    db: Arc<Mutex<Connection>>,
    /// リモートストレージ
    remote: R,
    /// ペイロード暗号化サービス
    cipher: PayloadCipher,
    /// 同期状態（このロックをawaitをまたいで保持してはならない）
    state: Mutex<SyncState>,
    /// リモート操作のキャンセルハンドル
    cancel: CancellationToken,
    /// リモート操作1回あたりのタイムアウト
    remote_timeout: Duration,
}

impl<R: RemoteStorage> SyncService<R> {
    /// 新しいSyncServiceを作成する
    ///
    /// # 引数
    /// * `db` - データベース接続
    /// * `remote` - リモートストレージ
    /// * `cipher` - ペイロード暗号化サービス
    /// * `remote_timeout` - リモート操作1回あたりのタイムアウト
    pub fn new(
        db: Arc<Mutex<Connection>>,
        remote: R,
        cipher: PayloadCipher,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            db,
            remote,
            cipher,
            state: Mutex::new(SyncState::new("")),
            cancel: CancellationToken::new(),
            remote_timeout,
        }
    }

    /// 現在の同期状態のスナップショットを取得する
    pub fn state(&self) -> AppResult<SyncState> {
        Ok(self.lock_state()?.clone())
    }

    /// リモート操作のキャンセルハンドルを取得する
    ///
    /// `cancel()` を呼ぶと実行中および以後のリモート操作が中断される。
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn lock_state(&self) -> AppResult<std::sync::MutexGuard<'_, SyncState>> {
        self.state
            .lock()
            .map_err(|e| AppError::concurrency(format!("同期状態ロック取得失敗: {e}")))
    }

    /// リモート操作にタイムアウトとキャンセルを適用する
    async fn remote_call<T>(&self, fut: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                Err(AppError::remote_unavailable("同期がキャンセルされました"))
            }
            result = tokio::time::timeout(self.remote_timeout, fut) => match result {
                Ok(inner) => inner,
                Err(_) => Err(AppError::remote_unavailable(
                    "リモート操作がタイムアウトしました",
                )),
            },
        }
    }

    /// 同期を即時実行する
    ///
    /// # 引数
    /// * `session` - 認証済みセッション（なければ同期しない）
    ///
    /// # 戻り値
    /// 実行結果。セッションなし・実行中の場合はエラーではなくスキップを返す
    ///
    /// 成功時は完了時刻とSuccessを記録してIdleへ戻る。失敗時は理由を
    /// `last_error` に保存してIdleへ戻り、エラーを呼び出し側へ伝播する。
    /// 自動リトライは行わず、次のsyncNowが最初からの再実行になる。
    pub async fn sync_now(&self, session: Option<&AuthSession>) -> AppResult<SyncOutcome> {
        let session = match session {
            Some(s) if !s.is_expired() => s,
            _ => {
                log::warn!("認証セッションがないため同期をスキップします");
                return Ok(SyncOutcome::NoSession);
            }
        };

        // 多重実行ガード：実行中ならエラーにせずスキップする
        {
            let mut state = self.lock_state()?;
            if state.sync_in_progress {
                log::warn!("同期は既に実行中のためスキップします");
                return Ok(SyncOutcome::AlreadyInProgress);
            }
            state.sync_in_progress = true;
            state.user_id = session.user_id.clone();
        }

        let result = self.perform_sync(session).await;

        let mut state = self.lock_state()?;
        state.sync_in_progress = false;
        match result {
            Ok(count) => {
                state.last_sync_timestamp = Some(now_timestamp());
                state.last_sync_success = true;
                state.pending_changes = 0;
                state.last_error = None;
                log::info!("同期が完了しました: {count}件");
                Ok(SyncOutcome::Completed)
            }
            Err(e) => {
                state.last_sync_success = false;
                state.last_error = Some(e.user_message().to_string());
                log::error!("同期に失敗しました: {}", e.details());
                Err(e)
            }
        }
    }

    /// 同期の本体処理
    ///
    /// # 戻り値
    /// アップロードしたエントリ数
    async fn perform_sync(&self, session: &AuthSession) -> AppResult<usize> {
        // ロックをawaitの前に手放すため、読み取りはブロックで閉じる
        let entries = {
            let conn = self
                .db
                .lock()
                .map_err(|e| AppError::concurrency(format!("データベースロック取得失敗: {e}")))?;
            repository::list_all(&conn, &session.user_id)?
        };

        let encrypted = self.cipher.encrypt(&entries, &session.access_token)?;
        let backup = EncryptedBackup {
            version: BACKUP_VERSION.to_string(),
            encrypted_data: encrypted.ciphertext,
            iv: encrypted.iv,
            timestamp: now_timestamp(),
            user_id: session.user_id.clone(),
        };

        // 固定ファイル名でfind-or-create。既存があれば上書き
        let existing = self
            .remote_call(self.remote.find_backup(&session.access_token))
            .await?;

        match existing {
            Some(file_id) => {
                self.remote_call(self.remote.update_backup(
                    &session.access_token,
                    &file_id,
                    &backup,
                ))
                .await?;
            }
            None => {
                self.remote_call(self.remote.create_backup(&session.access_token, &backup))
                    .await?;
            }
        }

        Ok(entries.len())
    }

    /// リモートバックアップをリストアする
    ///
    /// # 引数
    /// * `session` - 認証済みセッション
    ///
    /// # 戻り値
    /// 復号されたエントリ列、またはバックアップが存在しない場合は
    /// NoBackupFound。ローカルストアへの再投入は呼び出し側の責務
    /// （`repository::replace_all` を参照）
    ///
    /// 復号の前にバックアップの `user_id` を検証し、要求ユーザーと異なる
    /// 場合はOwnershipMismatchで中断する。リモート領域のスコープ設定を
    /// 誤った場合でも、他アカウントのデータがローカルへ流れ込むことはない。
    pub async fn restore(&self, session: &AuthSession) -> AppResult<RestoreOutcome> {
        let file_id = match self
            .remote_call(self.remote.find_backup(&session.access_token))
            .await?
        {
            Some(id) => id,
            None => {
                log::info!("リモートバックアップは存在しません");
                return Ok(RestoreOutcome::NoBackupFound);
            }
        };

        let backup = self
            .remote_call(self.remote.download_backup(&session.access_token, &file_id))
            .await?;

        if backup.user_id != session.user_id {
            return Err(AppError::ownership_mismatch(format!(
                "バックアップの所有者({})が要求ユーザー({})と一致しません",
                backup.user_id, session.user_id
            )));
        }

        let entries: Vec<SpendEntry> = self.cipher.decrypt(
            &backup.encrypted_data,
            &backup.iv,
            &session.access_token,
        )?;

        log::info!("バックアップを復号しました: {}件", entries.len());
        Ok(RestoreOutcome::Restored(entries))
    }

    /// リモートバックアップを削除する
    ///
    /// # 引数
    /// * `session` - 認証済みセッション
    ///
    /// # 戻り値
    /// 成功時はOk(())。バックアップが存在しない場合も成功として扱う
    pub async fn delete_backup(&self, session: &AuthSession) -> AppResult<()> {
        let file_id = match self
            .remote_call(self.remote.find_backup(&session.access_token))
            .await?
        {
            Some(id) => id,
            None => return Ok(()),
        };

        self.remote_call(self.remote.delete_backup(&session.access_token, &file_id))
            .await
    }

    /// リモートバックアップのメタデータを取得する（ダウンロードなし）
    ///
    /// # 引数
    /// * `session` - 認証済みセッション
    ///
    /// # 戻り値
    /// メタデータ、バックアップが存在しない場合はNone
    pub async fn backup_metadata(
        &self,
        session: &AuthSession,
    ) -> AppResult<Option<RemoteFileMetadata>> {
        let file_id = match self
            .remote_call(self.remote.find_backup(&session.access_token))
            .await?
        {
            Some(id) => id,
            None => return Ok(None),
        };

        self.remote_call(self.remote.backup_metadata(&session.access_token, &file_id))
            .await
            .map(Some)
    }
}
