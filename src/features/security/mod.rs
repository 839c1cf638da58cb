/// セキュリティ機能モジュール
///
/// このモジュールはクライアントサイド暗号化に関連する機能を提供します：
/// - デバイスソルトの生成と永続化
/// - OAuthトークンからの対称鍵導出（PBKDF2-HMAC-SHA256）
/// - ペイロードの認証付き暗号化・復号（AES-256-GCM）
// サブモジュールの宣言
pub mod encryption;
pub mod key_derivation;

// 公開インターフェース
pub use encryption::{EncryptedPayload, PayloadCipher};
pub use key_derivation::{DeviceSalt, KeyDerivation, PBKDF2_ITERATIONS};
