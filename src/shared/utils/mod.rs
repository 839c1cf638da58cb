/// 日付範囲と時刻表現のユーティリティ
pub mod dates;

pub use dates::{
    day_key, format_timestamp, now_timestamp, parse_timestamp, previous_month_range,
    previous_week_range, rolling_range, DateRange, TimeFilter,
};
