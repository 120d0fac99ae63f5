use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for SettingsError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Key-value settings storage. Values are stored as plain strings; callers own the parsing.
#[allow(async_fn_in_trait)]
pub trait SettingsStore: Clone {
    async fn fetch_setting(&self, key: &str) -> Result<Option<String>, SettingsError>;

    async fn upsert_setting(&self, key: &str, value: &str, description: Option<&str>) -> Result<(), SettingsError>;
}
