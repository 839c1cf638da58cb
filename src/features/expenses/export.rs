use crate::features::expenses::models::SpendEntry;
use crate::shared::utils::dates::day_key;

/// フィールドをCSV用にクオートする
///
/// 値全体を二重引用符で囲み、内部の二重引用符は2つ重ねる。
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// 支出エントリ列をCSV文書に変換する
///
/// # 引数
/// * `entries` - 出力するエントリ列
///
/// # 戻り値
/// CSV文字列（1行目はヘッダ、以降1エントリ1行）
///
/// 列は日付・金額・カテゴリ（カスタムカテゴリがあればそちら）・メモ。
/// 純粋な整形処理であり、副作用は持たない。
pub fn export_to_csv(entries: &[SpendEntry]) -> String {
    let header = "Date,Amount,Category,Notes".to_string();

    let rows = entries.iter().map(|entry| {
        let category = entry
            .custom_category
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(entry.category.as_str());

        [
            quote(day_key(&entry.timestamp)),
            quote(&entry.amount.to_string()),
            quote(category),
            quote(entry.notes.as_deref().unwrap_or("")),
        ]
        .join(",")
    });

    std::iter::once(header)
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}
