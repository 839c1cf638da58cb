/// 認証機能モジュール
///
/// このモジュールはIDプロバイダ連携に関連する機能を提供します：
/// - Google OAuth 2.0（PKCE付き）による認証フロー
/// - ユーザープロフィールの取得と保存
/// - デモモード（固定ユーザーでのサインイン）
// サブモジュールの宣言
pub mod models;
pub mod repository;
pub mod service;

// 公開インターフェース
pub use models::{
    AuthSession, GoogleUserInfo, OAuthStartInfo, User, UserPreferences, DEMO_ACCESS_TOKEN,
    DEMO_USER_ID,
};
pub use repository::{find_by_id, update_preferences, upsert_from_profile};
pub use service::AuthService;
