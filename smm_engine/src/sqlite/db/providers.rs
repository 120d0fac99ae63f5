use log::{debug, trace};
use smm_common::Money;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewProvider, Provider, VerificationStatus},
    traits::{CatalogError, UpdateProvider},
};

pub async fn insert_provider(provider: &NewProvider, conn: &mut SqliteConnection) -> Result<Provider, CatalogError> {
    let metadata = provider.metadata.clone().map(sqlx::types::Json);
    let created = sqlx::query_as::<_, Provider>(
        r#"INSERT INTO providers (name, api_url, api_key, is_active, priority, markup_percentage, metadata)
           VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *"#,
    )
    .bind(&provider.name)
    .bind(&provider.api_url)
    .bind(provider.api_key.reveal().clone())
    .bind(provider.is_active)
    .bind(provider.priority)
    .bind(provider.markup_percentage)
    .bind(metadata)
    .fetch_one(conn)
    .await?;
    Ok(created)
}

pub async fn fetch_provider_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Provider>, CatalogError> {
    let provider = sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(provider)
}

/// All providers, highest priority first.
pub async fn fetch_providers(conn: &mut SqliteConnection) -> Result<Vec<Provider>, CatalogError> {
    let providers = sqlx::query_as::<_, Provider>("SELECT * FROM providers ORDER BY priority DESC, id ASC")
        .fetch_all(conn)
        .await?;
    Ok(providers)
}

pub async fn update_provider(
    id: i64,
    update: UpdateProvider,
    conn: &mut SqliteConnection,
) -> Result<Option<Provider>, CatalogError> {
    if update.is_empty() {
        debug!("🗃️ No fields to update for provider {id}. Update request skipped.");
        return fetch_provider_by_id(id, conn).await;
    }
    let mut builder = QueryBuilder::new("UPDATE providers SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name);
    }
    if let Some(api_url) = update.api_url {
        set_clause.push("api_url = ");
        set_clause.push_bind_unseparated(api_url);
    }
    if let Some(api_key) = update.api_key {
        set_clause.push("api_key = ");
        set_clause.push_bind_unseparated(api_key.reveal().clone());
    }
    if let Some(is_active) = update.is_active {
        set_clause.push("is_active = ");
        set_clause.push_bind_unseparated(is_active);
    }
    if let Some(priority) = update.priority {
        set_clause.push("priority = ");
        set_clause.push_bind_unseparated(priority);
    }
    if let Some(markup) = update.markup_percentage {
        set_clause.push("markup_percentage = ");
        set_clause.push_bind_unseparated(markup);
    }
    if let Some(metadata) = update.metadata {
        set_clause.push("metadata = ");
        set_clause.push_bind_unseparated(sqlx::types::Json(metadata));
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let res = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Provider::from_row(&row)).transpose()?;
    Ok(res)
}

pub async fn delete_provider(id: i64, conn: &mut SqliteConnection) -> Result<bool, CatalogError> {
    let result = sqlx::query("DELETE FROM providers WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_orders_for_provider(id: i64, conn: &mut SqliteConnection) -> Result<i64, CatalogError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE provider_id = $1")
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn set_balance(
    id: i64,
    balance: Money,
    currency: &str,
    conn: &mut SqliteConnection,
) -> Result<(), CatalogError> {
    let result = sqlx::query(
        "UPDATE providers SET balance = $1, currency = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3",
    )
    .bind(balance)
    .bind(currency)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(CatalogError::ProviderNotFound(id));
    }
    Ok(())
}

/// Records the verification outcome, but only on a provider still awaiting one. The transition is one-way.
pub async fn mark_verification(
    id: i64,
    status: VerificationStatus,
    conn: &mut SqliteConnection,
) -> Result<(), CatalogError> {
    sqlx::query(
        "UPDATE providers SET verification_status = $1, updated_at = CURRENT_TIMESTAMP
         WHERE id = $2 AND verification_status = 'Pending'",
    )
    .bind(status.to_string())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn touch_last_sync(id: i64, conn: &mut SqliteConnection) -> Result<(), CatalogError> {
    sqlx::query("UPDATE providers SET last_sync_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
