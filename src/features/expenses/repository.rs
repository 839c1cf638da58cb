use crate::features::expenses::models::{
    validate_amount, Category, CreateSpendEntryDto, SpendEntry, UpdateSpendEntryDto,
};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::dates::{format_timestamp, now_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// 行をSpendEntryにマッピングする
fn map_row(row: &Row<'_>) -> rusqlite::Result<SpendEntry> {
    let category: String = row.get(3)?;
    Ok(SpendEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: row.get(2)?,
        category: Category::parse(&category),
        custom_category: row.get(4)?,
        notes: row.get(5)?,
        timestamp: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        deleted: row.get::<_, i64>(9)? != 0,
    })
}

const SELECT_COLUMNS: &str = "id, user_id, amount, category, custom_category, notes,
         timestamp, created_at, updated_at, deleted";

/// 支出エントリを作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `dto` - 支出エントリ作成用DTO
///
/// # 戻り値
/// 保存されたエントリ、または失敗時はエラー
///
/// 金額と日時は永続化の前に検証され、不正な入力は何も書き込まずに
/// バリデーションエラーとして返る。
pub fn add(conn: &Connection, dto: CreateSpendEntryDto) -> AppResult<SpendEntry> {
    validate_amount(dto.amount)?;
    let timestamp = format_timestamp(parse_timestamp(&dto.timestamp)?);

    let now = now_timestamp();
    let entry = SpendEntry {
        id: Uuid::new_v4().to_string(),
        user_id: dto.user_id,
        amount: dto.amount,
        category: dto.category,
        custom_category: dto.custom_category,
        notes: dto.notes,
        timestamp,
        created_at: now.clone(),
        updated_at: now,
        deleted: false,
    };

    conn.execute(
        "INSERT INTO spend_entries
             (id, user_id, amount, category, custom_category, notes,
              timestamp, created_at, updated_at, deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
        params![
            entry.id,
            entry.user_id,
            entry.amount,
            entry.category.as_str(),
            entry.custom_category,
            entry.notes,
            entry.timestamp,
            entry.created_at,
            entry.updated_at,
        ],
    )?;

    Ok(entry)
}

/// 支出エントリを部分更新する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - エントリID
/// * `dto` - 支出エントリ更新用DTO
///
/// # 戻り値
/// 更新後のエントリ、またはIDが存在しない場合はNotFoundエラー
///
/// DTOに含まれるフィールドだけを差し替える。id・user_id・created_atは
/// DTOに存在しないため変更されない。updated_atは常に現在時刻に更新される。
pub fn update(conn: &Connection, id: &str, dto: UpdateSpendEntryDto) -> AppResult<SpendEntry> {
    let existing = find_by_id(conn, id)?.ok_or_else(|| AppError::not_found("支出エントリ"))?;

    let amount = dto.amount.unwrap_or(existing.amount);
    validate_amount(amount)?;

    let timestamp = match dto.timestamp {
        Some(value) => format_timestamp(parse_timestamp(&value)?),
        None => existing.timestamp,
    };

    let category = dto.category.unwrap_or(existing.category);
    let custom_category = dto.custom_category.or(existing.custom_category);
    let notes = dto.notes.or(existing.notes);
    let deleted = dto.deleted.unwrap_or(existing.deleted);
    let updated_at = now_timestamp();

    conn.execute(
        "UPDATE spend_entries
         SET amount = ?1, category = ?2, custom_category = ?3, notes = ?4,
             timestamp = ?5, deleted = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            amount,
            category.as_str(),
            custom_category,
            notes,
            timestamp,
            deleted as i64,
            updated_at,
            id,
        ],
    )?;

    Ok(SpendEntry {
        amount,
        category,
        custom_category,
        notes,
        timestamp,
        deleted,
        updated_at,
        ..existing
    })
}

/// 支出エントリを論理削除する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - エントリID
///
/// # 戻り値
/// 成功時はOk(())、IDが存在しない場合はNotFoundエラー
///
/// レコードは物理的には残り、ID直接参照では取得できるが、
/// 一覧・集計からは除外される。
pub fn soft_delete(conn: &Connection, id: &str) -> AppResult<()> {
    let affected = conn.execute(
        "UPDATE spend_entries SET deleted = 1, updated_at = ?1 WHERE id = ?2",
        params![now_timestamp(), id],
    )?;

    if affected == 0 {
        return Err(AppError::not_found("支出エントリ"));
    }

    Ok(())
}

/// 支出エントリを物理削除する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - エントリID
///
/// # 戻り値
/// 成功時はOk(())。IDが存在しなくてもエラーにはならない（冪等）
pub fn hard_delete(conn: &Connection, id: &str) -> AppResult<()> {
    conn.execute("DELETE FROM spend_entries WHERE id = ?1", params![id])?;
    Ok(())
}

/// IDで支出エントリを取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - エントリID
///
/// # 戻り値
/// エントリ（論理削除済みも含む）、存在しない場合はNone
pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<SpendEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM spend_entries WHERE id = ?1"
    ))?;

    match stmt.query_row(params![id], map_row) {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

/// ユーザーの全支出エントリを取得する（論理削除済みを除く）
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - ユーザーID
///
/// # 戻り値
/// エントリのリスト。順序はストアでは規定しない
pub fn list_all(conn: &Connection, user_id: &str) -> AppResult<Vec<SpendEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM spend_entries
         WHERE user_id = ?1 AND deleted = 0"
    ))?;

    let entries = stmt.query_map(params![user_id], map_row)?;
    entries
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))
}

/// 日時範囲で支出エントリを取得する（両端を含む、論理削除済みを除く）
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - ユーザーID
/// * `start` - 範囲の開始時刻
/// * `end` - 範囲の終了時刻
///
/// # 戻り値
/// 範囲内のエントリのリスト（timestamp昇順）
///
/// 保存形式は辞書順＝時刻順のため、文字列比較のままインデックスを
/// 使った範囲検索になる。
pub fn list_by_date_range(
    conn: &Connection,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Vec<SpendEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM spend_entries
         WHERE user_id = ?1 AND deleted = 0
           AND timestamp >= ?2 AND timestamp <= ?3
         ORDER BY timestamp ASC"
    ))?;

    let entries = stmt.query_map(
        params![user_id, format_timestamp(start), format_timestamp(end)],
        map_row,
    )?;
    entries
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))
}

/// カテゴリで支出エントリを取得する（論理削除済みを除く）
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - ユーザーID
/// * `category` - カテゴリ
///
/// # 戻り値
/// 該当カテゴリのエントリのリスト
pub fn list_by_category(
    conn: &Connection,
    user_id: &str,
    category: Category,
) -> AppResult<Vec<SpendEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM spend_entries
         WHERE user_id = ?1 AND category = ?2 AND deleted = 0"
    ))?;

    let entries = stmt.query_map(params![user_id, category.as_str()], map_row)?;
    entries
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))
}

/// ユーザーの支出エントリ数を取得する（論理削除済みを除く）
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - ユーザーID
///
/// # 戻り値
/// エントリ数
pub fn count_for_user(conn: &Connection, user_id: &str) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM spend_entries WHERE user_id = ?1 AND deleted = 0",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// ユーザーの支出エントリをバックアップのスナップショットで置き換える
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - ユーザーID
/// * `entries` - 取り込むエントリのスナップショット
///
/// # 戻り値
/// 取り込んだ件数、または失敗時はエラー
///
/// リストア後の再投入に使用する。既存行の削除と挿入は単一トランザクション
/// で行われ、途中状態が読み手から観測されることはない。エントリのIDと
/// 監査時刻はバックアップの値をそのまま保持する。
pub fn replace_all(conn: &Connection, user_id: &str, entries: &[SpendEntry]) -> AppResult<usize> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "DELETE FROM spend_entries WHERE user_id = ?1",
        params![user_id],
    )?;

    for entry in entries {
        tx.execute(
            "INSERT INTO spend_entries
                 (id, user_id, amount, category, custom_category, notes,
                  timestamp, created_at, updated_at, deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.id,
                user_id,
                entry.amount,
                entry.category.as_str(),
                entry.custom_category,
                entry.notes,
                entry.timestamp,
                entry.created_at,
                entry.updated_at,
                entry.deleted as i64,
            ],
        )?;
    }

    tx.commit()?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::open_in_memory_database;
    use chrono::TimeZone;

    fn create_dto(user_id: &str, amount: f64, category: Category, timestamp: &str) -> CreateSpendEntryDto {
        CreateSpendEntryDto {
            user_id: user_id.to_string(),
            amount,
            category,
            timestamp: timestamp.to_string(),
            notes: None,
            custom_category: None,
        }
    }

    #[test]
    fn test_add_and_find_by_id() {
        let conn = open_in_memory_database().unwrap();

        let dto = create_dto("user-1", 1200.0, Category::Food, "2024-05-15T09:30:00.000Z");
        let entry = add(&conn, dto).unwrap();

        assert_eq!(entry.amount, 1200.0);
        assert_eq!(entry.category, Category::Food);
        assert!(!entry.deleted);
        assert_eq!(entry.created_at, entry.updated_at);

        let found = find_by_id(&conn, &entry.id).unwrap().unwrap();
        assert_eq!(found, entry);
    }

    #[test]
    fn test_add_normalizes_timestamp_to_utc() {
        let conn = open_in_memory_database().unwrap();

        // オフセット付きの入力はUTCのミリ秒固定形式に正規化される
        let dto = create_dto("user-1", 10.0, Category::Food, "2024-05-15T18:30:00+09:00");
        let entry = add(&conn, dto).unwrap();
        assert_eq!(entry.timestamp, "2024-05-15T09:30:00.000Z");
    }

    #[test]
    fn test_add_rejects_invalid_amount_without_persisting() {
        let conn = open_in_memory_database().unwrap();

        for amount in [-5.0, 0.0, f64::NAN, f64::INFINITY] {
            let dto = create_dto("user-1", amount, Category::Food, "2024-05-15T09:30:00.000Z");
            let result = add(&conn, dto);
            assert!(matches!(result.unwrap_err(), AppError::Validation(_)));
        }

        // 何も永続化されていない
        assert_eq!(count_for_user(&conn, "user-1").unwrap(), 0);
    }

    #[test]
    fn test_add_rejects_invalid_timestamp() {
        let conn = open_in_memory_database().unwrap();

        let dto = create_dto("user-1", 10.0, Category::Food, "15/05/2024");
        assert!(matches!(
            add(&conn, dto).unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn test_update_merges_partial_fields() {
        let conn = open_in_memory_database().unwrap();

        let entry = add(
            &conn,
            CreateSpendEntryDto {
                user_id: "user-1".to_string(),
                amount: 100.0,
                category: Category::Food,
                timestamp: "2024-05-15T09:30:00.000Z".to_string(),
                notes: Some("ランチ".to_string()),
                custom_category: None,
            },
        )
        .unwrap();

        let updated = update(
            &conn,
            &entry.id,
            UpdateSpendEntryDto {
                amount: Some(150.0),
                ..Default::default()
            },
        )
        .unwrap();

        // 指定したフィールドだけが変わる
        assert_eq!(updated.amount, 150.0);
        assert_eq!(updated.category, Category::Food);
        assert_eq!(updated.notes, Some("ランチ".to_string()));
        // 不変フィールドは保持される
        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.user_id, entry.user_id);
        assert_eq!(updated.created_at, entry.created_at);
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let conn = open_in_memory_database().unwrap();

        let result = update(&conn, "missing", UpdateSpendEntryDto::default());
        assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));
    }

    #[test]
    fn test_update_rejects_invalid_amount() {
        let conn = open_in_memory_database().unwrap();

        let entry = add(
            &conn,
            create_dto("user-1", 100.0, Category::Food, "2024-05-15T09:30:00.000Z"),
        )
        .unwrap();

        let result = update(
            &conn,
            &entry.id,
            UpdateSpendEntryDto {
                amount: Some(-1.0),
                ..Default::default()
            },
        );
        assert!(matches!(result.unwrap_err(), AppError::Validation(_)));

        // 元の値が保持されている
        let found = find_by_id(&conn, &entry.id).unwrap().unwrap();
        assert_eq!(found.amount, 100.0);
    }

    #[test]
    fn test_soft_delete_excludes_from_listing_but_not_direct_lookup() {
        let conn = open_in_memory_database().unwrap();

        let entry = add(
            &conn,
            create_dto("user-1", 100.0, Category::Food, "2024-05-15T09:30:00.000Z"),
        )
        .unwrap();

        soft_delete(&conn, &entry.id).unwrap();

        // 一覧からは除外される
        assert!(list_all(&conn, "user-1").unwrap().is_empty());
        assert!(list_by_category(&conn, "user-1", Category::Food)
            .unwrap()
            .is_empty());

        // ID直接参照では取得でき、deletedフラグが立っている
        let found = find_by_id(&conn, &entry.id).unwrap().unwrap();
        assert!(found.deleted);
    }

    #[test]
    fn test_soft_delete_unknown_id_is_not_found() {
        let conn = open_in_memory_database().unwrap();
        let result = soft_delete(&conn, "missing");
        assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));
    }

    #[test]
    fn test_hard_delete_is_idempotent() {
        let conn = open_in_memory_database().unwrap();

        let entry = add(
            &conn,
            create_dto("user-1", 100.0, Category::Food, "2024-05-15T09:30:00.000Z"),
        )
        .unwrap();

        hard_delete(&conn, &entry.id).unwrap();
        assert!(find_by_id(&conn, &entry.id).unwrap().is_none());

        // 既に存在しないIDでもエラーにならない
        hard_delete(&conn, &entry.id).unwrap();
        hard_delete(&conn, "missing").unwrap();
    }

    #[test]
    fn test_list_by_date_range_is_inclusive() {
        let conn = open_in_memory_database().unwrap();

        for (amount, ts) in [
            (1.0, "2024-05-10T00:00:00.000Z"),
            (2.0, "2024-05-12T12:00:00.000Z"),
            (3.0, "2024-05-14T23:59:59.999Z"),
            (4.0, "2024-05-15T00:00:00.000Z"),
        ] {
            add(&conn, create_dto("user-1", amount, Category::Food, ts)).unwrap();
        }

        let start = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
        let end = Utc
            .with_ymd_and_hms(2024, 5, 14, 23, 59, 59)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(999))
            .unwrap();

        let entries = list_by_date_range(&conn, "user-1", start, end).unwrap();
        let amounts: Vec<f64> = entries.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_listing_is_scoped_to_user() {
        let conn = open_in_memory_database().unwrap();

        add(&conn, create_dto("user-1", 1.0, Category::Food, "2024-05-15T09:00:00.000Z")).unwrap();
        add(&conn, create_dto("user-2", 2.0, Category::Food, "2024-05-15T09:00:00.000Z")).unwrap();

        assert_eq!(list_all(&conn, "user-1").unwrap().len(), 1);
        assert_eq!(count_for_user(&conn, "user-2").unwrap(), 1);
    }

    #[test]
    fn test_replace_all_swaps_snapshot() {
        let conn = open_in_memory_database().unwrap();

        add(&conn, create_dto("user-1", 1.0, Category::Food, "2024-05-15T09:00:00.000Z")).unwrap();
        add(&conn, create_dto("user-1", 2.0, Category::Travel, "2024-05-16T09:00:00.000Z")).unwrap();
        // 他ユーザーのデータは影響を受けない
        let other = add(
            &conn,
            create_dto("user-2", 9.0, Category::Bills, "2024-05-15T09:00:00.000Z"),
        )
        .unwrap();

        let snapshot = vec![SpendEntry {
            id: "restored-1".to_string(),
            user_id: "user-1".to_string(),
            amount: 42.0,
            category: Category::Health,
            custom_category: None,
            notes: None,
            timestamp: "2024-05-01T00:00:00.000Z".to_string(),
            created_at: "2024-05-01T00:00:00.000Z".to_string(),
            updated_at: "2024-05-01T00:00:00.000Z".to_string(),
            deleted: false,
        }];

        let imported = replace_all(&conn, "user-1", &snapshot).unwrap();
        assert_eq!(imported, 1);

        let entries = list_all(&conn, "user-1").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "restored-1");
        assert_eq!(entries[0].amount, 42.0);

        assert_eq!(find_by_id(&conn, &other.id).unwrap().unwrap().amount, 9.0);
    }
}
