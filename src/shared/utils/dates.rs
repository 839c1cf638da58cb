use crate::shared::errors::{AppError, AppResult};
use chrono::{
    DateTime, Datelike, Duration, Local, LocalResult, Months, NaiveDate, NaiveDateTime,
    SecondsFormat, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

/// 集計対象期間を表すフィルター
///
/// `Today`/`Week`/`Month`/`Year` はいずれも「現在時刻を基準とするローリング期間」。
/// カレンダー区切りの週・月（前週比較など）は `previous_week_range` /
/// `previous_month_range` が別定義として提供する。2種類の期間定義は意図的に
/// 統一していない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    /// 当日（0時〜23:59:59.999）
    Today,
    /// 直近7日間
    Week,
    /// 直近1カ月間
    Month,
    /// 直近1年間
    Year,
}

impl TimeFilter {
    /// フィルター識別子を文字列で取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Today => "today",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
        }
    }
}

/// ローカル時刻での日付範囲（両端を含む）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    /// 範囲の開始時刻
    pub start: DateTime<Local>,
    /// 範囲の終了時刻
    pub end: DateTime<Local>,
}

impl DateRange {
    /// 開始時刻をUTCで取得する
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    /// 終了時刻をUTCで取得する
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }
}

/// ローカルのナイーブ時刻をタイムゾーン付きに変換する
///
/// 夏時間の切り替えで時刻が曖昧・欠落になる場合は早い方の解釈、
/// それも得られない場合はUTC解釈にフォールバックする。
fn to_local(naive: NaiveDateTime) -> DateTime<Local> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => Local.from_utc_datetime(&naive),
    }
}

/// 指定日の0時0分0秒（ローカル時刻）
fn day_start(date: NaiveDate) -> DateTime<Local> {
    to_local(
        date.and_hms_opt(0, 0, 0)
            .expect("固定時刻の生成に失敗することはない"),
    )
}

/// 指定日の23時59分59.999秒（ローカル時刻）
fn day_end(date: NaiveDate) -> DateTime<Local> {
    to_local(
        date.and_hms_milli_opt(23, 59, 59, 999)
            .expect("固定時刻の生成に失敗することはない"),
    )
}

/// 現在時刻を基準とするローリング期間を計算する
///
/// # 引数
/// * `filter` - 対象期間フィルター
///
/// # 戻り値
/// 期間の開始・終了時刻（ローカル時刻、両端を含む）
pub fn rolling_range(filter: TimeFilter) -> DateRange {
    rolling_range_at(filter, Local::now())
}

/// 基準時刻を指定してローリング期間を計算する
///
/// today = [当日0時, 当日23:59:59.999]、week = 7日前の0時から、
/// month = 1カレンダー月前の0時から、year = 1年前の0時から。
/// 終端は常に当日の23:59:59.999。
///
/// # 引数
/// * `filter` - 対象期間フィルター
/// * `now` - 基準時刻
///
/// # 戻り値
/// 期間の開始・終了時刻
pub fn rolling_range_at(filter: TimeFilter, now: DateTime<Local>) -> DateRange {
    let today = now.date_naive();
    let start_date = match filter {
        TimeFilter::Today => today,
        TimeFilter::Week => today - Duration::days(7),
        TimeFilter::Month => today.checked_sub_months(Months::new(1)).unwrap_or(today),
        TimeFilter::Year => today.checked_sub_months(Months::new(12)).unwrap_or(today),
    };

    DateRange {
        start: day_start(start_date),
        end: day_end(today),
    }
}

/// 前週（日曜始まりのカレンダー週）の期間を計算する
///
/// # 戻り値
/// [今週開始の7日前, 今週開始の1ミリ秒前]
pub fn previous_week_range() -> DateRange {
    previous_week_range_at(Local::now())
}

/// 基準時刻を指定して前週の期間を計算する
///
/// # 引数
/// * `now` - 基準時刻
///
/// # 戻り値
/// 前週の開始・終了時刻
pub fn previous_week_range_at(now: DateTime<Local>) -> DateRange {
    let today = now.date_naive();
    let days_from_sunday = today.weekday().num_days_from_sunday() as i64;
    let start_of_this_week = day_start(today - Duration::days(days_from_sunday));

    DateRange {
        start: day_start(today - Duration::days(days_from_sunday + 7)),
        end: start_of_this_week - Duration::milliseconds(1),
    }
}

/// 前月（カレンダー月）の期間を計算する
///
/// # 戻り値
/// [前月1日0時, 今月1日の1ミリ秒前]
pub fn previous_month_range() -> DateRange {
    previous_month_range_at(Local::now())
}

/// 基準時刻を指定して前月の期間を計算する
///
/// # 引数
/// * `now` - 基準時刻
///
/// # 戻り値
/// 前月の開始・終了時刻
pub fn previous_month_range_at(now: DateTime<Local>) -> DateRange {
    let today = now.date_naive();
    let first_of_this_month = today
        .with_day(1)
        .expect("月初日の生成に失敗することはない");
    let first_of_previous_month = first_of_this_month
        .checked_sub_months(Months::new(1))
        .unwrap_or(first_of_this_month);

    DateRange {
        start: day_start(first_of_previous_month),
        end: day_start(first_of_this_month) - Duration::milliseconds(1),
    }
}

/// 時刻を保存形式の文字列に変換する
///
/// ミリ秒固定精度のUTC RFC3339（例: `2024-05-15T09:30:00.000Z`）。
/// この形式は辞書順と時刻順が一致するため、SQLの範囲検索に直接使用できる。
///
/// # 引数
/// * `dt` - 変換する時刻
///
/// # 戻り値
/// 保存形式の文字列
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 現在時刻を保存形式の文字列で取得する
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// 保存形式またはRFC3339の文字列を時刻として解析する
///
/// # 引数
/// * `value` - 解析する文字列
///
/// # 戻り値
/// UTC時刻、または解析失敗時はバリデーションエラー
pub fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::validation(format!("日時の形式が不正です: {value} ({e})")))
}

/// 保存形式のタイムスタンプから日付キー（YYYY-MM-DD）を取り出す
///
/// # 引数
/// * `timestamp` - 保存形式のタイムスタンプ
///
/// # 戻り値
/// 日付部分の文字列
pub fn day_key(timestamp: &str) -> &str {
    timestamp.get(0..10).unwrap_or(timestamp)
}
