use crate::features::expenses::models::SpendEntry;
use serde::{Deserialize, Serialize};

/// バックアップ形式のスキーマバージョン
pub const BACKUP_VERSION: &str = "2.0.0";

/// 同期状態（セッションスコープ、永続化しない）
///
/// `sync_in_progress` はこのシステム唯一の相互排他フラグで、現在ユーザーの
/// リモートバックアップファイルだけを保護する。`pending_changes` は差分追跡
/// 機能のための予約フィールドで、現状は同期成功時に0へリセットされる以外に
/// 更新されることはない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// 対象ユーザーID
    pub user_id: String,
    /// 最終同期時刻
    pub last_sync_timestamp: Option<String>,
    /// 最終同期の成否
    pub last_sync_success: bool,
    /// 未同期の変更件数（予約、常に0）
    pub pending_changes: u32,
    /// 同期実行中フラグ
    pub sync_in_progress: bool,
    /// 最後に発生したエラーメッセージ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SyncState {
    /// 初期状態を作成する
    ///
    /// # 引数
    /// * `user_id` - 対象ユーザーID
    pub fn new<S: Into<String>>(user_id: S) -> Self {
        Self {
            user_id: user_id.into(),
            last_sync_timestamp: None,
            last_sync_success: false,
            pending_changes: 0,
            sync_in_progress: false,
            last_error: None,
        }
    }
}

/// 暗号化バックアップのワイヤ形式
///
/// ユーザーごとにリモートへ常に1ファイルだけ存在し、書き込みは常に
/// 上書き（固定ファイル名でfind-or-create）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedBackup {
    /// スキーマバージョン
    pub version: String,
    /// 暗号化された支出データ（Base64エンコード）
    pub encrypted_data: String,
    /// 初期化ベクトル（Base64エンコード）
    pub iv: String,
    /// バックアップ作成時刻
    pub timestamp: String,
    /// 所有ユーザーID
    pub user_id: String,
}

/// 同期競合（予約）
///
/// 将来のマルチデバイスマージ機能のためのデータ形状。現在はどの操作も
/// この型を生成・消費しない。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    pub id: String,
    pub entry_id: String,
    pub local_version: SpendEntry,
    pub remote_version: SpendEntry,
    pub detected_at: String,
    pub resolved: bool,
}

/// syncNowの実行結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// 同期が完了した
    Completed,
    /// 既に同期が実行中のためスキップした
    AlreadyInProgress,
    /// 認証セッションがないためスキップした
    NoSession,
}

/// restoreの実行結果
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// バックアップを復号し、エントリ列を取得した
    Restored(Vec<SpendEntry>),
    /// リモートにバックアップが存在しない（初回利用の正常系）
    NoBackupFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_state_initial_values() {
        let state = SyncState::new("user-1");
        assert_eq!(state.user_id, "user-1");
        assert!(state.last_sync_timestamp.is_none());
        assert!(!state.last_sync_success);
        assert_eq!(state.pending_changes, 0);
        assert!(!state.sync_in_progress);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_encrypted_backup_wire_format() {
        let backup = EncryptedBackup {
            version: BACKUP_VERSION.to_string(),
            encrypted_data: "ZGF0YQ==".to_string(),
            iv: "aXY=".to_string(),
            timestamp: "2024-05-15T09:30:00.000Z".to_string(),
            user_id: "user-1".to_string(),
        };

        let json = serde_json::to_string(&backup).unwrap();
        assert!(json.contains("\"encryptedData\""));
        assert!(json.contains("\"userId\""));
        assert!(json.contains("\"version\":\"2.0.0\""));

        let parsed: EncryptedBackup = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, backup);
    }
}
