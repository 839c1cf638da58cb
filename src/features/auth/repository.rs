use crate::features::auth::models::{GoogleUserInfo, User, UserPreferences};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::dates::now_timestamp;
use rusqlite::{params, Connection, Row};

/// 行をUserにマッピングする
fn map_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        profile_pic_url: row.get(3)?,
        preferences: UserPreferences {
            theme: row.get(4)?,
            currency: row.get(5)?,
            date_format: row.get(6)?,
        },
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, name, email, profile_pic_url, theme, currency, date_format, created_at, updated_at";

/// IDでユーザーを取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - ユーザーID
///
/// # 戻り値
/// ユーザー、存在しない場合はNone
pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM users WHERE id = ?1"))?;

    match stmt.query_row(params![id], map_row) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

/// IDプロバイダのプロフィールでユーザーを作成または更新する
///
/// # 引数
/// * `conn` - データベース接続
/// * `info` - IDプロバイダから取得したプロフィール
///
/// # 戻り値
/// 保存後のユーザー
///
/// 既存ユーザーの場合はプロフィール項目のみ更新し、表示設定は保持する。
pub fn upsert_from_profile(conn: &Connection, info: &GoogleUserInfo) -> AppResult<User> {
    let now = now_timestamp();

    match find_by_id(conn, &info.id)? {
        Some(existing) => {
            conn.execute(
                "UPDATE users SET name = ?1, email = ?2, profile_pic_url = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![info.name, info.email, info.picture, now, info.id],
            )?;

            Ok(User {
                name: info.name.clone(),
                email: info.email.clone(),
                profile_pic_url: info.picture.clone(),
                updated_at: now,
                ..existing
            })
        }
        None => {
            let user = User {
                id: info.id.clone(),
                name: info.name.clone(),
                email: info.email.clone(),
                profile_pic_url: info.picture.clone(),
                preferences: UserPreferences::default(),
                created_at: now.clone(),
                updated_at: now,
            };

            conn.execute(
                "INSERT INTO users
                     (id, name, email, profile_pic_url, theme, currency, date_format,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user.id,
                    user.name,
                    user.email,
                    user.profile_pic_url,
                    user.preferences.theme,
                    user.preferences.currency,
                    user.preferences.date_format,
                    user.created_at,
                    user.updated_at,
                ],
            )?;

            Ok(user)
        }
    }
}

/// ユーザーの表示設定を更新する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - ユーザーID
/// * `preferences` - 新しい表示設定
///
/// # 戻り値
/// 更新後のユーザー、またはIDが存在しない場合はNotFoundエラー
pub fn update_preferences(
    conn: &Connection,
    id: &str,
    preferences: &UserPreferences,
) -> AppResult<User> {
    let now = now_timestamp();

    let affected = conn.execute(
        "UPDATE users SET theme = ?1, currency = ?2, date_format = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            preferences.theme,
            preferences.currency,
            preferences.date_format,
            now,
            id,
        ],
    )?;

    if affected == 0 {
        return Err(AppError::not_found("ユーザー"));
    }

    find_by_id(conn, id)?.ok_or_else(|| AppError::not_found("ユーザー"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::open_in_memory_database;

    fn profile(id: &str, name: &str) -> GoogleUserInfo {
        GoogleUserInfo {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: name.to_string(),
            picture: None,
            verified_email: true,
        }
    }

    #[test]
    fn test_upsert_creates_user_with_default_preferences() {
        let conn = open_in_memory_database().unwrap();

        let user = upsert_from_profile(&conn, &profile("google-sub-1", "山田太郎")).unwrap();
        assert_eq!(user.id, "google-sub-1");
        assert_eq!(user.preferences, UserPreferences::default());

        let found = find_by_id(&conn, "google-sub-1").unwrap().unwrap();
        assert_eq!(found, user);
    }

    #[test]
    fn test_upsert_updates_profile_but_keeps_preferences() {
        let conn = open_in_memory_database().unwrap();

        upsert_from_profile(&conn, &profile("google-sub-1", "山田太郎")).unwrap();

        let custom_prefs = UserPreferences {
            theme: "dark".to_string(),
            currency: "JPY".to_string(),
            date_format: "YYYY-MM-DD".to_string(),
        };
        update_preferences(&conn, "google-sub-1", &custom_prefs).unwrap();

        // 再ログイン時のプロフィール更新で表示設定は失われない
        let updated = upsert_from_profile(&conn, &profile("google-sub-1", "山田次郎")).unwrap();
        assert_eq!(updated.name, "山田次郎");
        assert_eq!(updated.preferences, custom_prefs);
    }

    #[test]
    fn test_update_preferences_unknown_user_is_not_found() {
        let conn = open_in_memory_database().unwrap();
        let result = update_preferences(&conn, "missing", &UserPreferences::default());
        assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));
    }

    #[test]
    fn test_find_by_id_absent_is_none() {
        let conn = open_in_memory_database().unwrap();
        assert!(find_by_id(&conn, "missing").unwrap().is_none());
    }
}
