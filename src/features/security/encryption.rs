use crate::features::security::key_derivation::KeyDerivation;
use crate::shared::errors::{AppError, AppResult};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// 初期化ベクトルの長さ（バイト、AES-GCM標準の96ビット）
const IV_LENGTH: usize = 12;

/// 暗号化結果（境界交換用のテキスト表現）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    /// 暗号文（Base64エンコード）
    pub ciphertext: String,
    /// 初期化ベクトル（Base64エンコード）
    pub iv: String,
}

/// ペイロード暗号化サービス
///
/// 任意のJSONシリアライズ可能なペイロードを、OAuthトークンから導出した
/// 鍵でAES-256-GCM暗号化する。IVは暗号化のたびにセキュアな乱数から
/// 新しく生成されるため、同一鍵でのIV再利用は構造上起こらない。
#[derive(Debug, Clone)]
pub struct PayloadCipher {
    key_derivation: KeyDerivation,
}

impl PayloadCipher {
    /// 新しいPayloadCipherを作成する
    ///
    /// # 引数
    /// * `key_derivation` - 鍵導出サービス
    pub fn new(key_derivation: KeyDerivation) -> Self {
        Self { key_derivation }
    }

    /// ペイロードを暗号化する
    ///
    /// # 引数
    /// * `payload` - 暗号化するペイロード（JSONシリアライズ可能な任意の値）
    /// * `oauth_token` - 鍵導出に使用するOAuthトークン
    ///
    /// # 戻り値
    /// Base64エンコードされた暗号文とIV、または失敗時はエラー
    pub fn encrypt<T: Serialize>(
        &self,
        payload: &T,
        oauth_token: &str,
    ) -> AppResult<EncryptedPayload> {
        let plaintext = serde_json::to_vec(payload)?;

        let key = self.key_derivation.derive(oauth_token);
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| AppError::crypto_unavailable(format!("暗号器の初期化に失敗: {e}")))?;

        // 暗号化のたびに新しいIVを生成する
        let mut iv_bytes = [0u8; IV_LENGTH];
        OsRng.try_fill_bytes(&mut iv_bytes).map_err(|e| {
            AppError::crypto_unavailable(format!("セキュアな乱数生成に失敗: {e}"))
        })?;
        let nonce = Nonce::from_slice(&iv_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|e| AppError::crypto_unavailable(format!("暗号化に失敗: {e}")))?;

        Ok(EncryptedPayload {
            ciphertext: general_purpose::STANDARD.encode(&ciphertext),
            iv: general_purpose::STANDARD.encode(iv_bytes),
        })
    }

    /// ペイロードを復号する
    ///
    /// # 引数
    /// * `ciphertext` - Base64エンコードされた暗号文
    /// * `iv` - Base64エンコードされたIV
    /// * `oauth_token` - 鍵導出に使用するOAuthトークン
    ///
    /// # 戻り値
    /// 復号されたペイロード。鍵の不一致・データ破損・形式不正は
    /// すべてDecryptionFailedエラーになる
    pub fn decrypt<T: DeserializeOwned>(
        &self,
        ciphertext: &str,
        iv: &str,
        oauth_token: &str,
    ) -> AppResult<T> {
        let ciphertext_bytes = general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| AppError::decryption_failed(format!("暗号文デコードエラー: {e}")))?;

        let iv_bytes = general_purpose::STANDARD
            .decode(iv)
            .map_err(|e| AppError::decryption_failed(format!("IVデコードエラー: {e}")))?;

        if iv_bytes.len() != IV_LENGTH {
            return Err(AppError::decryption_failed("IVのサイズが正しくありません"));
        }

        let key = self.key_derivation.derive(oauth_token);
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| AppError::crypto_unavailable(format!("暗号器の初期化に失敗: {e}")))?;

        let nonce = Nonce::from_slice(&iv_bytes);
        let plaintext = cipher.decrypt(nonce, ciphertext_bytes.as_ref()).map_err(|_| {
            AppError::decryption_failed("認証タグの検証に失敗しました（鍵の不一致またはデータ破損）")
        })?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| AppError::decryption_failed(format!("復号後のJSON解析に失敗: {e}")))
    }

    /// 暗号化パイプラインの自己診断を実行する
    ///
    /// 固定のフィクスチャを暗号化→復号し、元の値と一致することを確認する。
    /// 業務データに依存せずに暗号設定の健全性を検証できる。
    ///
    /// # 引数
    /// * `oauth_token` - 鍵導出に使用するOAuthトークン
    ///
    /// # 戻り値
    /// 成功時はOk(())、パイプラインが壊れている場合はエラー
    pub fn self_test(&self, oauth_token: &str) -> AppResult<()> {
        let fixture = serde_json::json!({
            "test": "Hello, World!",
            "marker": 42,
        });

        let encrypted = self.encrypt(&fixture, oauth_token)?;
        let decrypted: serde_json::Value =
            self.decrypt(&encrypted.ciphertext, &encrypted.iv, oauth_token)?;

        if decrypted != fixture {
            return Err(AppError::decryption_failed(
                "自己診断で復号結果が一致しません",
            ));
        }

        log::debug!("暗号化パイプラインの自己診断に成功しました");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::security::key_derivation::DeviceSalt;
    use quickcheck::QuickCheck;

    fn test_cipher() -> PayloadCipher {
        PayloadCipher::new(KeyDerivation::new(DeviceSalt::from_hex(
            "00112233445566778899aabbccddeeff",
        )))
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = test_cipher();
        let payload = vec!["食費".to_string(), "交通費".to_string()];

        let encrypted = cipher.encrypt(&payload, "token-a").unwrap();
        let decrypted: Vec<String> = cipher
            .decrypt(&encrypted.ciphertext, &encrypted.iv, "token-a")
            .unwrap();

        assert_eq!(decrypted, payload);
    }

    #[test]
    fn test_roundtrip_property_for_arbitrary_payloads() {
        // 任意のJSONシリアライズ可能なペイロードで往復が成立する
        fn prop(payload: Vec<(String, i64)>) -> bool {
            let cipher = PayloadCipher::new(KeyDerivation::new(DeviceSalt::from_hex(
                "00112233445566778899aabbccddeeff",
            )));
            let encrypted = cipher.encrypt(&payload, "property-token").unwrap();
            let decrypted: Vec<(String, i64)> = cipher
                .decrypt(&encrypted.ciphertext, &encrypted.iv, "property-token")
                .unwrap();
            decrypted == payload
        }

        // 鍵導出が意図的に重いため試行回数を絞る
        QuickCheck::new()
            .tests(8)
            .quickcheck(prop as fn(Vec<(String, i64)>) -> bool);
    }

    #[test]
    fn test_iv_is_fresh_per_encryption() {
        let cipher = test_cipher();
        let payload = "同じペイロード";

        let first = cipher.encrypt(&payload, "token-a").unwrap();
        let second = cipher.encrypt(&payload, "token-a").unwrap();

        // IVも暗号文も毎回異なる
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn test_decrypt_with_wrong_token_fails() {
        let cipher = test_cipher();
        let payload = vec![1, 2, 3];

        let encrypted = cipher.encrypt(&payload, "token-a").unwrap();
        let result: AppResult<Vec<i32>> =
            cipher.decrypt(&encrypted.ciphertext, &encrypted.iv, "token-b");

        // 間違った鍵では「それらしい別の値」が返ることはなく、必ず失敗する
        assert!(matches!(
            result.unwrap_err(),
            AppError::DecryptionFailed(_)
        ));
    }

    #[test]
    fn test_decrypt_tampered_ciphertext_fails() {
        let cipher = test_cipher();
        let encrypted = cipher.encrypt(&"payload", "token-a").unwrap();

        let mut tampered = general_purpose::STANDARD
            .decode(&encrypted.ciphertext)
            .unwrap();
        tampered[0] ^= 0xff;
        let tampered_b64 = general_purpose::STANDARD.encode(&tampered);

        let result: AppResult<String> = cipher.decrypt(&tampered_b64, &encrypted.iv, "token-a");
        assert!(matches!(
            result.unwrap_err(),
            AppError::DecryptionFailed(_)
        ));
    }

    #[test]
    fn test_decrypt_rejects_invalid_base64_and_iv() {
        let cipher = test_cipher();

        let result: AppResult<String> = cipher.decrypt("not-base64!!!", "aaaa", "token-a");
        assert!(matches!(
            result.unwrap_err(),
            AppError::DecryptionFailed(_)
        ));

        // IVの長さが不正
        let encrypted = cipher.encrypt(&"payload", "token-a").unwrap();
        let short_iv = general_purpose::STANDARD.encode([0u8; 4]);
        let result: AppResult<String> =
            cipher.decrypt(&encrypted.ciphertext, &short_iv, "token-a");
        assert!(matches!(
            result.unwrap_err(),
            AppError::DecryptionFailed(_)
        ));
    }

    #[test]
    fn test_self_test_succeeds() {
        let cipher = test_cipher();
        cipher.self_test("token-a").unwrap();
    }
}
