use log::trace;
use smm_common::Secret;
use sqlx::{FromRow, QueryBuilder, Row, SqliteConnection};

use crate::{
    db_types::{Provider, Service},
    traits::{CatalogError, ServiceUpsert},
};

/// Inserts or refreshes one catalog row, keyed on (provider_id, service_id). Returns `true` when a new row was
/// created.
pub async fn upsert_service(
    provider_id: i64,
    upsert: &ServiceUpsert,
    conn: &mut SqliteConnection,
) -> Result<bool, CatalogError> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM services WHERE provider_id = $1 AND service_id = $2")
            .bind(provider_id)
            .bind(&upsert.service_id)
            .fetch_optional(&mut *conn)
            .await?;
    let metadata = sqlx::types::Json(upsert.metadata.clone());
    sqlx::query(
        r#"INSERT INTO services
           (provider_id, service_id, name, service_type, category, cost, rate, min_quantity, max_quantity,
            description, metadata, is_active)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1)
           ON CONFLICT (provider_id, service_id) DO UPDATE SET
             name = excluded.name,
             service_type = excluded.service_type,
             category = excluded.category,
             cost = excluded.cost,
             rate = excluded.rate,
             min_quantity = excluded.min_quantity,
             max_quantity = excluded.max_quantity,
             description = excluded.description,
             metadata = excluded.metadata,
             is_active = 1,
             updated_at = CURRENT_TIMESTAMP"#,
    )
    .bind(provider_id)
    .bind(&upsert.service_id)
    .bind(&upsert.name)
    .bind(&upsert.service_type)
    .bind(&upsert.category)
    .bind(upsert.cost)
    .bind(upsert.rate)
    .bind(upsert.min_quantity)
    .bind(upsert.max_quantity)
    .bind(&upsert.description)
    .bind(metadata)
    .execute(conn)
    .await?;
    Ok(existing.is_none())
}

/// Removes every service of `provider_id` whose provider-native id is not in `keep`. Returns the number of rows
/// deleted. Callers must never pass an empty `keep` list here; guard against it upstream.
pub async fn delete_services_not_in(
    provider_id: i64,
    keep: &[String],
    conn: &mut SqliteConnection,
) -> Result<u64, CatalogError> {
    let mut builder = QueryBuilder::new("DELETE FROM services WHERE provider_id = ");
    builder.push_bind(provider_id);
    builder.push(" AND service_id NOT IN (");
    let mut ids = builder.separated(", ");
    for id in keep {
        ids.push_bind(id.as_str());
    }
    builder.push(")");
    trace!("🗃️ Executing query: {}", builder.sql());
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn delete_all_for_provider(provider_id: i64, conn: &mut SqliteConnection) -> Result<u64, CatalogError> {
    let result = sqlx::query("DELETE FROM services WHERE provider_id = $1").bind(provider_id).execute(conn).await?;
    Ok(result.rows_affected())
}

/// The full catalog of one provider, active rows included and inactive ones too, ordered for stable display.
pub async fn fetch_services_for_provider(
    provider_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Service>, CatalogError> {
    let services =
        sqlx::query_as::<_, Service>("SELECT * FROM services WHERE provider_id = $1 ORDER BY service_id ASC")
            .bind(provider_id)
            .fetch_all(conn)
            .await?;
    Ok(services)
}

/// Fetches an orderable service together with its provider in a single statement. Returns `None` unless both rows
/// exist and are active, so there is no window where the provider flips between two reads.
pub async fn fetch_active_service_with_provider(
    service_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<(Service, Provider)>, CatalogError> {
    let row = sqlx::query(
        r#"SELECT s.*,
                  p.id AS p_id, p.name AS p_name, p.api_url AS p_api_url, p.api_key AS p_api_key,
                  p.is_active AS p_is_active, p.verification_status AS p_verification_status,
                  p.priority AS p_priority, p.markup_percentage AS p_markup_percentage,
                  p.balance AS p_balance, p.currency AS p_currency, p.last_sync_at AS p_last_sync_at,
                  p.metadata AS p_metadata, p.created_at AS p_created_at, p.updated_at AS p_updated_at
           FROM services s
           JOIN providers p ON p.id = s.provider_id
           WHERE s.id = $1 AND s.is_active = 1 AND p.is_active = 1"#,
    )
    .bind(service_id)
    .fetch_optional(conn)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    // The service columns come first and unaliased, so the derived FromRow reads them by name.
    let service = Service::from_row(&row)?;
    let p_metadata: Option<sqlx::types::Json<serde_json::Value>> = row.try_get("p_metadata")?;
    let provider = Provider {
        id: row.try_get("p_id")?,
        name: row.try_get("p_name")?,
        api_url: row.try_get("p_api_url")?,
        api_key: Secret::new(row.try_get::<String, _>("p_api_key")?),
        is_active: row.try_get("p_is_active")?,
        verification_status: row.try_get("p_verification_status")?,
        priority: row.try_get("p_priority")?,
        markup_percentage: row.try_get("p_markup_percentage")?,
        balance: row.try_get("p_balance")?,
        currency: row.try_get("p_currency")?,
        last_sync_at: row.try_get("p_last_sync_at")?,
        metadata: p_metadata.map(|m| m.0),
        created_at: row.try_get("p_created_at")?,
        updated_at: row.try_get("p_updated_at")?,
    };
    Ok(Some((service, provider)))
}

pub async fn count_services(provider_id: i64, conn: &mut SqliteConnection) -> Result<(i64, i64), CatalogError> {
    let counts: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM services WHERE provider_id = $1",
    )
    .bind(provider_id)
    .fetch_one(conn)
    .await?;
    Ok(counts)
}
