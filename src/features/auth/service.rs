use crate::features::auth::models::{AuthSession, GoogleUserInfo, OAuthStartInfo, User};
use crate::features::auth::repository;
use crate::shared::config::GoogleOAuthConfig;
use crate::shared::errors::{AppError, AppResult};
use chrono::{Duration, Utc};
use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthUrl, AuthorizationCode, ClientId,
    ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use rusqlite::Connection;

/// Googleユーザー情報エンドポイント
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
/// 有効期限が取得できない場合のフォールバック（秒）
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// OAuth認証サービス
///
/// Google OAuth 2.0（PKCE付き認可コードフロー）でベアラートークンと
/// ユーザープロフィールを取得する。リダイレクトの受け取りは呼び出し側
/// （プレゼンテーション層）の責務で、本サービスは認証URLの生成と
/// コールバック処理のみを提供する。
#[derive(Clone)]
pub struct AuthService {
    /// OAuth2クライアント
    oauth_client: BasicClient,
    /// HTTPクライアント
    http_client: reqwest::Client,
}

impl AuthService {
    /// 新しいAuthServiceを作成する
    ///
    /// # 引数
    /// * `config` - Google OAuth設定
    ///
    /// # 戻り値
    /// AuthServiceインスタンス
    pub fn new(config: GoogleOAuthConfig) -> AppResult<Self> {
        let client_id = ClientId::new(config.client_id);
        let client_secret = ClientSecret::new(config.client_secret);
        let auth_url = AuthUrl::new("https://accounts.google.com/o/oauth2/v2/auth".to_string())
            .map_err(|e| AppError::configuration(format!("認証URL設定エラー: {e}")))?;
        let token_url = TokenUrl::new("https://www.googleapis.com/oauth2/v4/token".to_string())
            .map_err(|e| AppError::configuration(format!("トークンURL設定エラー: {e}")))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri)
            .map_err(|e| AppError::configuration(format!("リダイレクトURL設定エラー: {e}")))?;

        let oauth_client =
            BasicClient::new(client_id, Some(client_secret), auth_url, Some(token_url))
                .set_redirect_uri(redirect_url);

        let http_client = reqwest::Client::new();

        log::info!("AuthServiceを初期化しました");

        Ok(Self {
            oauth_client,
            http_client,
        })
    }

    /// OAuth認証フローを開始する
    ///
    /// # 戻り値
    /// 認証開始情報（認証URL、PKCE検証子、状態パラメータ）
    ///
    /// バックアップ先（Driveのアプリ専用領域）へのアクセスに必要な
    /// スコープもここで要求する。
    pub fn start_oauth_flow(&self) -> OAuthStartInfo {
        // PKCE（Proof Key for Code Exchange）を生成
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .oauth_client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .add_scope(Scope::new(
                "https://www.googleapis.com/auth/drive.appdata".to_string(),
            ))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let oauth_info = OAuthStartInfo {
            auth_url: auth_url.to_string(),
            code_verifier: pkce_verifier.secret().clone(),
            state: csrf_token.secret().clone(),
        };

        log::info!("OAuth認証フローを開始しました");
        log::debug!("認証URL: {}", oauth_info.auth_url);

        oauth_info
    }

    /// 認証コールバックを処理する
    ///
    /// # 引数
    /// * `conn` - データベース接続（ユーザープロフィールの保存先）
    /// * `code` - 認証コード
    /// * `code_verifier` - PKCE検証子
    ///
    /// # 戻り値
    /// 保存されたユーザーと認証済みセッション
    pub async fn handle_callback(
        &self,
        conn: &Connection,
        code: String,
        code_verifier: String,
    ) -> AppResult<(User, AuthSession)> {
        log::info!("認証コールバックを処理開始");

        // 認証コードをアクセストークンに交換
        let pkce_verifier = PkceCodeVerifier::new(code_verifier);
        let token_result = self
            .oauth_client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .map_err(|e| AppError::auth(format!("トークン交換に失敗: {e}")))?;

        let access_token = token_result.access_token().secret().clone();
        let lifetime = token_result
            .expires_in()
            .and_then(|d| Duration::from_std(d).ok())
            .unwrap_or_else(|| Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
        let expires_at = Utc::now() + lifetime;
        log::debug!("アクセストークンを取得しました");

        // Googleユーザー情報を取得
        let profile = self.fetch_user_info(&access_token).await?;
        log::info!("ユーザー情報を取得しました: email={}", profile.email);

        // ユーザーを作成または更新
        let user = repository::upsert_from_profile(conn, &profile)?;

        let session = AuthSession {
            user_id: user.id.clone(),
            access_token,
            expires_at,
        };

        log::info!("認証コールバック処理が完了しました: user_id={}", user.id);

        Ok((user, session))
    }

    /// デモモードでサインインする
    ///
    /// # 引数
    /// * `conn` - データベース接続
    ///
    /// # 戻り値
    /// 固定のデモユーザーとセッション
    ///
    /// デモセッションのトークンではリモートバックアップは利用できないが、
    /// ローカルストアと集計はそのまま動作する。
    pub fn demo_sign_in(&self, conn: &Connection) -> AppResult<(User, AuthSession)> {
        let demo = User::demo();
        let profile = GoogleUserInfo {
            id: demo.id.clone(),
            email: demo.email.clone(),
            name: demo.name.clone(),
            picture: None,
            verified_email: false,
        };

        let user = repository::upsert_from_profile(conn, &profile)?;

        log::info!("デモモードでサインインしました");
        Ok((user, AuthSession::demo()))
    }

    /// Googleユーザー情報を取得する
    ///
    /// # 引数
    /// * `access_token` - アクセストークン
    ///
    /// # 戻り値
    /// Googleユーザー情報
    async fn fetch_user_info(&self, access_token: &str) -> AppResult<GoogleUserInfo> {
        let response = self
            .http_client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::auth(format!("ユーザー情報の取得に失敗: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::auth(format!(
                "ユーザー情報の取得に失敗: status={}",
                response.status()
            )));
        }

        response
            .json::<GoogleUserInfo>()
            .await
            .map_err(|e| AppError::auth(format!("ユーザー情報の解析に失敗: {e}")))
    }
}
