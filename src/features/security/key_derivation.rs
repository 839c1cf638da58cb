use crate::shared::errors::{AppError, AppResult};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::path::Path;

/// PBKDF2の反復回数
pub const PBKDF2_ITERATIONS: u32 = 100_000;
/// デバイスソルトの長さ（バイト）
const SALT_LENGTH: usize = 16;
/// 導出する鍵の長さ（バイト、AES-256用）
const KEY_LENGTH: usize = 32;

/// インストールごとに1回生成されるデバイスソルト
///
/// 16バイトの乱数を32文字の16進文字列として永続化し、以後は同じ値を
/// 再利用する。ユーザー単位でもトークン単位でもなく、デバイス単位。
#[derive(Debug, Clone)]
pub struct DeviceSalt {
    hex: String,
}

impl DeviceSalt {
    /// ソルトをファイルから読み込むか、なければ生成して永続化する
    ///
    /// # 引数
    /// * `path` - ソルトファイルのパス
    ///
    /// # 戻り値
    /// デバイスソルト、または乱数生成・永続化に失敗した場合はエラー
    pub fn load_or_generate(path: &Path) -> AppResult<Self> {
        if path.exists() {
            let stored = std::fs::read_to_string(path).map_err(|e| {
                AppError::crypto_unavailable(format!("デバイスソルトの読み込みに失敗: {e}"))
            })?;
            let hex = stored.trim().to_string();
            if !hex.is_empty() {
                log::debug!("既存のデバイスソルトを読み込みました");
                return Ok(Self { hex });
            }
        }

        let salt = Self::generate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::crypto_unavailable(format!("ソルト保存先の作成に失敗: {e}"))
            })?;
        }
        std::fs::write(path, &salt.hex).map_err(|e| {
            AppError::crypto_unavailable(format!("デバイスソルトの保存に失敗: {e}"))
        })?;

        log::info!("新しいデバイスソルトを生成しました");
        Ok(salt)
    }

    /// 新しいソルトを生成する（永続化はしない）
    ///
    /// # 戻り値
    /// デバイスソルト、またはセキュアな乱数が利用できない場合はエラー
    pub fn generate() -> AppResult<Self> {
        let mut bytes = [0u8; SALT_LENGTH];
        OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
            AppError::crypto_unavailable(format!("セキュアな乱数生成に失敗: {e}"))
        })?;

        let hex = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Ok(Self { hex })
    }

    /// 16進文字列からソルトを構築する
    ///
    /// # 引数
    /// * `hex` - ソルトの16進表現
    pub fn from_hex<S: Into<String>>(hex: S) -> Self {
        Self { hex: hex.into() }
    }

    /// ソルトの16進表現を取得する
    pub fn as_hex(&self) -> &str {
        &self.hex
    }
}

/// OAuthトークンとデバイスソルトから対称鍵を導出する
///
/// PBKDF2-HMAC-SHA256（100,000回反復）。入力は「トークン:ソルト16進」の
/// 連結文字列、KDFのソルトパラメータはソルト16進文字列のUTF-8バイト列。
/// 同じトークンとソルトの組に対して決定的であり、導出鍵は永続化せず
/// 操作のたびに再計算する。
#[derive(Debug, Clone)]
pub struct KeyDerivation {
    salt: DeviceSalt,
}

impl KeyDerivation {
    /// 新しいKeyDerivationを作成する
    ///
    /// # 引数
    /// * `salt` - デバイスソルト
    pub fn new(salt: DeviceSalt) -> Self {
        Self { salt }
    }

    /// 対称鍵を導出する
    ///
    /// # 引数
    /// * `oauth_token` - OAuthアクセストークン
    ///
    /// # 戻り値
    /// 256ビットの対称鍵
    pub fn derive(&self, oauth_token: &str) -> [u8; KEY_LENGTH] {
        let key_material = format!("{}:{}", oauth_token, self.salt.as_hex());

        let mut key = [0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha256>(
            key_material.as_bytes(),
            self.salt.as_hex().as_bytes(),
            PBKDF2_ITERATIONS,
            &mut key,
        );
        key
    }
}
