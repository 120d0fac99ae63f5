use sqlx::SqliteConnection;

use crate::traits::SettingsError;

pub async fn fetch_setting(key: &str, conn: &mut SqliteConnection) -> Result<Option<String>, SettingsError> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM system_settings WHERE key = $1")
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(value)
}

pub async fn upsert_setting(
    key: &str,
    value: &str,
    description: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), SettingsError> {
    sqlx::query(
        r#"INSERT INTO system_settings (key, value, description) VALUES ($1, $2, $3)
           ON CONFLICT (key) DO UPDATE SET
             value = excluded.value,
             description = COALESCE(excluded.description, system_settings.description),
             updated_at = CURRENT_TIMESTAMP"#,
    )
    .bind(key)
    .bind(value)
    .bind(description)
    .execute(conn)
    .await?;
    Ok(())
}
