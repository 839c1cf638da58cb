/// 支出エントリ機能モジュール
///
/// このモジュールは支出管理に関連する機能を提供します：
/// - 支出エントリの作成、読み取り、更新、論理削除・物理削除（CRUD操作）
/// - 金額・日時のバリデーション
/// - 期間別・カテゴリ別の集計クエリ
/// - カテゴリ表示情報とキーワードによるカテゴリ推定
/// - CSVエクスポート
// サブモジュールの宣言
pub mod analytics;
pub mod categories;
pub mod export;
pub mod models;
pub mod repository;

// 公開インターフェース：外部から使用可能な型と関数をエクスポート

// モデル
pub use models::{Category, CreateSpendEntryDto, SpendEntry, UpdateSpendEntryDto};

// カテゴリ表示情報
pub use categories::{category_info, detect_category, CategoryInfo, CATEGORIES};

// リポジトリ（データベース操作）
pub use repository::{
    add, count_for_user, find_by_id, hard_delete, list_all, list_by_category,
    list_by_date_range, replace_all, soft_delete, update,
};

// 集計クエリ
pub use analytics::{
    category_breakdown, previous_month_total, previous_week_total, time_period_summary,
    top_category, total_for, trend, CategorySummary, TimePeriodSummary, TopCategory, TrendPoint,
};

// エクスポート
pub use export::export_to_csv;
