use crate::features::expenses::models::{Category, SpendEntry};
use crate::features::expenses::repository::list_by_date_range;
use crate::shared::errors::AppResult;
use crate::shared::utils::dates::{
    day_key, previous_month_range_at, previous_week_range_at, rolling_range_at, DateRange,
    TimeFilter,
};
use chrono::{DateTime, Local};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

/// カテゴリ別集計の1項目
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    /// カテゴリ
    pub category: Category,
    /// 合計金額
    pub total: f64,
    /// 件数
    pub count: u32,
}

/// 最大支出カテゴリ
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCategory {
    /// カテゴリ
    pub category: Category,
    /// 合計金額
    pub total: f64,
}

/// 日別推移の1点
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// 日付（YYYY-MM-DD）
    pub date: String,
    /// その日の合計金額
    pub amount: f64,
}

/// 期間別合計のまとめ
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriodSummary {
    pub today: f64,
    pub this_week: f64,
    pub this_month: f64,
    pub this_year: f64,
}

/// 範囲内のエントリを取得する
fn entries_in_range(
    conn: &Connection,
    user_id: &str,
    range: &DateRange,
) -> AppResult<Vec<SpendEntry>> {
    list_by_date_range(conn, user_id, range.start_utc(), range.end_utc())
}

/// エントリ列の合計金額を計算する
fn sum_amounts(entries: &[SpendEntry]) -> f64 {
    entries.iter().map(|e| e.amount).sum()
}

/// ローリング期間の支出合計を計算する
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - ユーザーID
/// * `filter` - 対象期間フィルター
///
/// # 戻り値
/// 期間内の合計金額
pub fn total_for(conn: &Connection, user_id: &str, filter: TimeFilter) -> AppResult<f64> {
    total_for_at(conn, user_id, filter, Local::now())
}

/// 基準時刻を指定してローリング期間の支出合計を計算する
pub fn total_for_at(
    conn: &Connection,
    user_id: &str,
    filter: TimeFilter,
    now: DateTime<Local>,
) -> AppResult<f64> {
    let entries = entries_in_range(conn, user_id, &rolling_range_at(filter, now))?;
    Ok(sum_amounts(&entries))
}

/// 前週（日曜始まりのカレンダー週）の支出合計を計算する
///
/// ローリング週とは異なる定義であることに注意。前週比較の機能だけが
/// この定義を使う。
pub fn previous_week_total(conn: &Connection, user_id: &str) -> AppResult<f64> {
    previous_week_total_at(conn, user_id, Local::now())
}

/// 基準時刻を指定して前週の支出合計を計算する
pub fn previous_week_total_at(
    conn: &Connection,
    user_id: &str,
    now: DateTime<Local>,
) -> AppResult<f64> {
    let entries = entries_in_range(conn, user_id, &previous_week_range_at(now))?;
    Ok(sum_amounts(&entries))
}

/// 前月（カレンダー月）の支出合計を計算する
pub fn previous_month_total(conn: &Connection, user_id: &str) -> AppResult<f64> {
    previous_month_total_at(conn, user_id, Local::now())
}

/// 基準時刻を指定して前月の支出合計を計算する
pub fn previous_month_total_at(
    conn: &Connection,
    user_id: &str,
    now: DateTime<Local>,
) -> AppResult<f64> {
    let entries = entries_in_range(conn, user_id, &previous_month_range_at(now))?;
    Ok(sum_amounts(&entries))
}

/// カテゴリ別の支出内訳を計算する
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - ユーザーID
/// * `filter` - 対象期間フィルター
///
/// # 戻り値
/// 期間内に出現したカテゴリごとの合計と件数。件数0のカテゴリは含まれない。
/// 項目の順序はエントリ列（timestamp昇順）で最初に出現した順
pub fn category_breakdown(
    conn: &Connection,
    user_id: &str,
    filter: TimeFilter,
) -> AppResult<Vec<CategorySummary>> {
    category_breakdown_at(conn, user_id, filter, Local::now())
}

/// 基準時刻を指定してカテゴリ別の支出内訳を計算する
pub fn category_breakdown_at(
    conn: &Connection,
    user_id: &str,
    filter: TimeFilter,
    now: DateTime<Local>,
) -> AppResult<Vec<CategorySummary>> {
    let entries = entries_in_range(conn, user_id, &rolling_range_at(filter, now))?;

    // 挿入順を保持するためVecに蓄積する。カテゴリは高々7種類のため
    // 線形探索で足りる
    let mut breakdown: Vec<CategorySummary> = Vec::new();
    for entry in &entries {
        match breakdown.iter_mut().find(|s| s.category == entry.category) {
            Some(summary) => {
                summary.total += entry.amount;
                summary.count += 1;
            }
            None => breakdown.push(CategorySummary {
                category: entry.category,
                total: entry.amount,
                count: 1,
            }),
        }
    }

    Ok(breakdown)
}

/// 最大支出カテゴリを取得する
///
/// # 戻り値
/// 合計金額が最大の内訳項目。期間内にエントリがなければNone。
/// 同額の場合は内訳で先に出現した（＝先に観測された）カテゴリが勝つ
pub fn top_category(
    conn: &Connection,
    user_id: &str,
    filter: TimeFilter,
) -> AppResult<Option<TopCategory>> {
    top_category_at(conn, user_id, filter, Local::now())
}

/// 基準時刻を指定して最大支出カテゴリを取得する
pub fn top_category_at(
    conn: &Connection,
    user_id: &str,
    filter: TimeFilter,
    now: DateTime<Local>,
) -> AppResult<Option<TopCategory>> {
    let breakdown = category_breakdown_at(conn, user_id, filter, now)?;

    let mut top: Option<&CategorySummary> = None;
    for summary in &breakdown {
        match top {
            // 厳密な大小比較のみ置き換えるため、同額では先勝ちになる
            Some(current) if summary.total <= current.total => {}
            _ => top = Some(summary),
        }
    }

    Ok(top.map(|s| TopCategory {
        category: s.category,
        total: s.total,
    }))
}

/// 日別の支出推移を計算する
///
/// # 戻り値
/// 支出が1件以上あった日ごとに1点、日付文字列の昇順
pub fn trend(
    conn: &Connection,
    user_id: &str,
    filter: TimeFilter,
) -> AppResult<Vec<TrendPoint>> {
    trend_at(conn, user_id, filter, Local::now())
}

/// 基準時刻を指定して日別の支出推移を計算する
pub fn trend_at(
    conn: &Connection,
    user_id: &str,
    filter: TimeFilter,
    now: DateTime<Local>,
) -> AppResult<Vec<TrendPoint>> {
    let entries = entries_in_range(conn, user_id, &rolling_range_at(filter, now))?;

    // BTreeMapのキー順がそのまま日付昇順になる
    let mut grouped: BTreeMap<String, f64> = BTreeMap::new();
    for entry in &entries {
        *grouped.entry(day_key(&entry.timestamp).to_string()).or_insert(0.0) += entry.amount;
    }

    Ok(grouped
        .into_iter()
        .map(|(date, amount)| TrendPoint { date, amount })
        .collect())
}

/// 期間別合計のまとめを取得する
///
/// # 戻り値
/// 当日・直近7日・直近1カ月・直近1年それぞれの合計
pub fn time_period_summary(conn: &Connection, user_id: &str) -> AppResult<TimePeriodSummary> {
    time_period_summary_at(conn, user_id, Local::now())
}

/// 基準時刻を指定して期間別合計のまとめを取得する
pub fn time_period_summary_at(
    conn: &Connection,
    user_id: &str,
    now: DateTime<Local>,
) -> AppResult<TimePeriodSummary> {
    Ok(TimePeriodSummary {
        today: total_for_at(conn, user_id, TimeFilter::Today, now)?,
        this_week: total_for_at(conn, user_id, TimeFilter::Week, now)?,
        this_month: total_for_at(conn, user_id, TimeFilter::Month, now)?,
        this_year: total_for_at(conn, user_id, TimeFilter::Year, now)?,
    })
}
