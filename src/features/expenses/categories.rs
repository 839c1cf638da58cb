use crate::features::expenses::models::Category;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// カテゴリの表示情報
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo {
    /// カテゴリ識別子
    pub id: Category,
    /// 表示名
    pub name: &'static str,
    /// アイコン（絵文字）
    pub icon: &'static str,
    /// 表示色
    pub color: &'static str,
}

/// 全カテゴリの表示情報テーブル
///
/// 末尾は必ず `Custom`。未知カテゴリのフォールバック先として使用する。
pub static CATEGORIES: &[CategoryInfo] = &[
    CategoryInfo { id: Category::Food, name: "Food", icon: "🍔", color: "#f59e0b" },
    CategoryInfo { id: Category::Travel, name: "Travel", icon: "🚗", color: "#3b82f6" },
    CategoryInfo { id: Category::Bills, name: "Bills", icon: "💡", color: "#ef4444" },
    CategoryInfo { id: Category::Shopping, name: "Shopping", icon: "🛍️", color: "#ec4899" },
    CategoryInfo { id: Category::Entertainment, name: "Entertainment", icon: "🎬", color: "#8b5cf6" },
    CategoryInfo { id: Category::Health, name: "Health", icon: "💊", color: "#10b981" },
    CategoryInfo { id: Category::Custom, name: "Custom", icon: "✏️", color: "#6b7280" },
];

/// カテゴリの表示情報を取得する
///
/// # 引数
/// * `category` - カテゴリ識別子
///
/// # 戻り値
/// 表示情報。テーブルに存在しない場合は `Custom` の情報
pub fn category_info(category: Category) -> &'static CategoryInfo {
    CATEGORIES
        .iter()
        .find(|info| info.id == category)
        .unwrap_or(&CATEGORIES[CATEGORIES.len() - 1])
}

/// メモ文字列からカテゴリを推定するキーワードパターン
static DETECTION_RULES: Lazy<Vec<(Regex, Category)>> = Lazy::new(|| {
    let rules = [
        (
            r"(?i)lunch|dinner|breakfast|food|restaurant|cafe|coffee|meal|snack|grocery",
            Category::Food,
        ),
        (
            r"(?i)uber|taxi|bus|train|flight|fuel|gas|parking|toll",
            Category::Travel,
        ),
        (
            r"(?i)rent|electricity|water|internet|phone|bill|utility|subscription",
            Category::Bills,
        ),
        (
            r"(?i)shopping|clothes|amazon|flipkart|electronics|gadget",
            Category::Shopping,
        ),
        (
            r"(?i)movie|netflix|spotify|game|concert|party|entertainment",
            Category::Entertainment,
        ),
        (
            r"(?i)doctor|medicine|pharmacy|hospital|gym|fitness|health",
            Category::Health,
        ),
    ];

    rules
        .iter()
        .map(|(pattern, category)| {
            (
                Regex::new(pattern).expect("カテゴリ推定パターンは静的に正しい"),
                *category,
            )
        })
        .collect()
});

/// メモ文字列からカテゴリを推定する
///
/// # 引数
/// * `notes` - メモ文字列
///
/// # 戻り値
/// 最初にマッチしたカテゴリ。どのパターンにも該当しない場合は `Custom`
pub fn detect_category(notes: &str) -> Category {
    for (pattern, category) in DETECTION_RULES.iter() {
        if pattern.is_match(notes) {
            return *category;
        }
    }
    Category::Custom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_info_lookup() {
        let info = category_info(Category::Food);
        assert_eq!(info.name, "Food");
        assert_eq!(info.color, "#f59e0b");
    }

    #[test]
    fn test_custom_is_last_entry() {
        // フォールバック先が末尾にあることを前提とするため固定で検証する
        assert_eq!(CATEGORIES[CATEGORIES.len() - 1].id, Category::Custom);
    }

    #[test]
    fn test_detect_category_from_notes() {
        assert_eq!(detect_category("Lunch at the cafe"), Category::Food);
        assert_eq!(detect_category("uber to airport"), Category::Travel);
        assert_eq!(detect_category("Electricity bill for May"), Category::Bills);
        assert_eq!(detect_category("new clothes from amazon"), Category::Shopping);
        assert_eq!(detect_category("Netflix subscription"), Category::Bills);
        assert_eq!(detect_category("gym membership"), Category::Health);
    }

    #[test]
    fn test_detect_category_falls_back_to_custom() {
        assert_eq!(detect_category("something unclassifiable"), Category::Custom);
        assert_eq!(detect_category(""), Category::Custom);
    }
}
