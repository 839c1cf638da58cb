/// バックアップ同期機能モジュール
///
/// このモジュールは暗号化バックアップの同期に関連する機能を提供します：
/// - ローカルストア全件の暗号化アップロード（フルスナップショット、後勝ち）
/// - リモートバックアップのダウンロードと復号（所有者検証付き）
/// - 同期状態の管理（セッション内で高々1つの同期）
/// - Google Driveアプリ専用領域へのクライアント実装
// サブモジュールの宣言
pub mod drive_client;
pub mod models;
pub mod remote;
pub mod service;

// 公開インターフェース
pub use drive_client::DriveClient;
pub use models::{
    EncryptedBackup, RestoreOutcome, SyncConflict, SyncOutcome, SyncState, BACKUP_VERSION,
};
pub use remote::{RemoteFileMetadata, RemoteStorage};
pub use service::SyncService;
