use smm_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Order, OrderStatus},
    traits::{FulfilledOrder, OrderFlowError},
};

pub async fn insert_order(order: &FulfilledOrder, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    let request_data = sqlx::types::Json(order.request_data.clone());
    let response_data = sqlx::types::Json(order.response_data.clone());
    let created = sqlx::query_as::<_, Order>(
        r#"INSERT INTO orders
           (user_id, provider_id, service_id, provider_order_id, link, quantity, charge, cost, status,
            request_data, response_data)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
           RETURNING *"#,
    )
    .bind(order.user_id)
    .bind(order.provider_id)
    .bind(order.service_id)
    .bind(&order.provider_order_id)
    .bind(&order.link)
    .bind(order.quantity)
    .bind(order.charge)
    .bind(order.cost)
    .bind(order.status.to_string())
    .bind(request_data)
    .bind(response_data)
    .fetch_one(conn)
    .await?;
    Ok(created)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, OrderFlowError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// A user's order history, newest first.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, OrderFlowError> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn update_order_status(
    id: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status.to_string())
            .bind(id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(OrderFlowError::OrderNotFound(id))
}

/// Aggregate order counts and money totals for one provider, for the admin stats view.
pub async fn order_totals_for_provider(
    provider_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(i64, i64, Money, Money), sqlx::Error> {
    let totals: (i64, i64, Money, Money) = sqlx::query_as(
        r#"SELECT
             COUNT(*),
             COALESCE(SUM(status = 'Completed'), 0),
             COALESCE(SUM(charge), 0),
             COALESCE(SUM(cost), 0)
           FROM orders WHERE provider_id = $1"#,
    )
    .bind(provider_id)
    .fetch_one(conn)
    .await?;
    Ok(totals)
}
