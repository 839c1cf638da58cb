use crate::shared::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// 支出カテゴリの閉じた列挙
///
/// 未知の文字列は `Custom` にフォールバックする（`Category::parse` 参照）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// 食費
    Food,
    /// 交通・旅行
    Travel,
    /// 公共料金・請求
    Bills,
    /// 買い物
    Shopping,
    /// 娯楽
    Entertainment,
    /// 健康・医療
    Health,
    /// カスタム（自由記述）
    Custom,
}

impl Category {
    /// カテゴリ識別子を文字列で取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Travel => "travel",
            Category::Bills => "bills",
            Category::Shopping => "shopping",
            Category::Entertainment => "entertainment",
            Category::Health => "health",
            Category::Custom => "custom",
        }
    }

    /// 文字列からカテゴリを解析する
    ///
    /// # 引数
    /// * `value` - カテゴリ識別子
    ///
    /// # 戻り値
    /// 対応するカテゴリ。未知の識別子は `Custom` として扱う
    pub fn parse(value: &str) -> Category {
        match value {
            "food" => Category::Food,
            "travel" => Category::Travel,
            "bills" => Category::Bills,
            "shopping" => Category::Shopping,
            "entertainment" => Category::Entertainment,
            "health" => Category::Health,
            "custom" => Category::Custom,
            _ => Category::Custom,
        }
    }
}

/// 支出エントリのデータモデル
///
/// `timestamp` はユーザーが申告した支出日時（業務時刻）、`created_at` /
/// `updated_at` はストアが設定する監査時刻。いずれもミリ秒固定精度の
/// UTC RFC3339文字列として保持する。フィールド名はバックアップのワイヤ
/// 形式に合わせてcamelCaseでシリアライズされる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendEntry {
    pub id: String,
    pub user_id: String,
    pub amount: f64,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub timestamp: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub deleted: bool,
}

/// 支出エントリ作成用DTO
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpendEntryDto {
    pub user_id: String,
    pub amount: f64,
    pub category: Category,
    /// 支出日時（RFC3339形式）
    pub timestamp: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub custom_category: Option<String>,
}

/// 支出エントリ更新用DTO
///
/// 変更可能なフィールドだけを列挙する。id・user_id・created_atは
/// 構造上ここに存在しないため、呼び出し側が誤って不変フィールドを
/// 書き換えることはできない。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpendEntryDto {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub custom_category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub deleted: Option<bool>,
}

/// 金額のバリデーション
///
/// # 引数
/// * `amount` - 検証する金額
///
/// # 戻り値
/// 正の有限値であればOk(())、それ以外はバリデーションエラー
pub fn validate_amount(amount: f64) -> AppResult<()> {
    if !amount.is_finite() {
        return Err(AppError::validation("金額は有限の数値である必要があります"));
    }
    if amount <= 0.0 {
        return Err(AppError::validation("金額は正の数値である必要があります"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_category_string_roundtrip() {
        for category in [
            Category::Food,
            Category::Travel,
            Category::Bills,
            Category::Shopping,
            Category::Entertainment,
            Category::Health,
            Category::Custom,
        ] {
            assert_eq!(Category::parse(category.as_str()), category);
        }
    }

    #[test]
    fn test_unknown_category_falls_back_to_custom() {
        // 未知の識別子はカスタム扱い
        assert_eq!(Category::parse("groceries"), Category::Custom);
        assert_eq!(Category::parse(""), Category::Custom);
    }

    #[test]
    fn test_category_serde_lowercase() {
        let json = serde_json::to_string(&Category::Entertainment).unwrap();
        assert_eq!(json, "\"entertainment\"");
        let parsed: Category = serde_json::from_str("\"food\"").unwrap();
        assert_eq!(parsed, Category::Food);
    }

    #[test]
    fn test_spend_entry_wire_format_is_camel_case() {
        let entry = SpendEntry {
            id: "abc".to_string(),
            user_id: "user-1".to_string(),
            amount: 100.0,
            category: Category::Food,
            custom_category: None,
            notes: Some("ランチ".to_string()),
            timestamp: "2024-05-15T09:30:00.000Z".to_string(),
            created_at: "2024-05-15T09:30:00.000Z".to_string(),
            updated_at: "2024-05-15T09:30:00.000Z".to_string(),
            deleted: false,
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"userId\""));
        assert!(json.contains("\"createdAt\""));
        assert!(!json.contains("\"customCategory\""));

        let parsed: SpendEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_deleted_defaults_to_false_on_deserialize() {
        // 旧形式のバックアップにはdeletedフィールドがない場合がある
        let json = r#"{
            "id": "abc",
            "userId": "user-1",
            "amount": 10.0,
            "category": "food",
            "timestamp": "2024-05-15T09:30:00.000Z",
            "createdAt": "2024-05-15T09:30:00.000Z",
            "updatedAt": "2024-05-15T09:30:00.000Z"
        }"#;
        let parsed: SpendEntry = serde_json::from_str(json).unwrap();
        assert!(!parsed.deleted);
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(100.0).is_ok());
        assert!(validate_amount(0.01).is_ok());

        assert!(matches!(
            validate_amount(-5.0).unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            validate_amount(0.0).unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            validate_amount(f64::NAN).unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            validate_amount(f64::INFINITY).unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[quickcheck]
    fn prop_validate_amount_accepts_only_positive_finite(amount: f64) -> bool {
        validate_amount(amount).is_ok() == (amount.is_finite() && amount > 0.0)
    }
}
