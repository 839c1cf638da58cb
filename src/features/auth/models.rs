use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// デモモードで使用する固定のユーザーID
pub const DEMO_USER_ID: &str = "demo-user-123";
/// デモモードで使用する固定のトークン
pub const DEMO_ACCESS_TOKEN: &str = "demo-token";

/// ユーザーの表示設定
///
/// 表示にのみ影響し、保存済み金額の業務ロジックには影響しない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    /// テーマ（light / dark）
    pub theme: String,
    /// 通貨コード
    pub currency: String,
    /// 日付表示形式
    pub date_format: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            currency: "INR".to_string(),
            date_format: "DD/MM/YYYY".to_string(),
        }
    }
}

/// ユーザー情報を表す構造体
///
/// `id` はIDプロバイダのsubject ID（デモモードでは固定値）。
/// デバイス間で同期されることはない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// ユーザーID
    pub id: String,
    /// 表示名
    pub name: String,
    /// メールアドレス
    pub email: String,
    /// プロフィール画像URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic_url: Option<String>,
    /// 表示設定
    pub preferences: UserPreferences,
    /// 作成日時
    pub created_at: String,
    /// 更新日時
    pub updated_at: String,
}

impl User {
    /// デモモード用のユーザーを作成する
    pub fn demo() -> Self {
        let now = crate::shared::utils::dates::now_timestamp();
        Self {
            id: DEMO_USER_ID.to_string(),
            name: "Demo User".to_string(),
            email: "demo@spendanalyzer.app".to_string(),
            profile_pic_url: None,
            preferences: UserPreferences::default(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Googleから取得したユーザー情報
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleUserInfo {
    /// GoogleユーザーID（subject）
    pub id: String,
    /// メールアドレス
    pub email: String,
    /// 表示名
    pub name: String,
    /// プロフィール画像URL
    pub picture: Option<String>,
    /// メール認証済みフラグ
    #[serde(default)]
    pub verified_email: bool,
}

/// 認証済みセッション
///
/// ベアラートークンはこのセッションの生存期間だけ有効。トークンの
/// リフレッシュは行わず、期限切れはセッションの終了を意味する。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// ユーザーID
    pub user_id: String,
    /// OAuthアクセストークン
    pub access_token: String,
    /// トークンの有効期限
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// セッションが期限切れかどうかを判定する
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// デモモード用のセッションを作成する
    pub fn demo() -> Self {
        Self {
            user_id: DEMO_USER_ID.to_string(),
            access_token: DEMO_ACCESS_TOKEN.to_string(),
            expires_at: Utc::now() + Duration::days(365),
        }
    }
}

/// OAuth認証フローの開始情報
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthStartInfo {
    /// 認証URL
    pub auth_url: String,
    /// PKCE検証子
    pub code_verifier: String,
    /// 状態パラメータ
    pub state: String,
}
