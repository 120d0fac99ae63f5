use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, User},
    traits::LedgerError,
};

pub async fn create_user(user: &NewUser, conn: &mut SqliteConnection) -> Result<User, LedgerError> {
    let role = user.role.to_string();
    let created = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (user_name, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING *"#,
    )
    .bind(&user.user_name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(role)
    .fetch_one(conn)
    .await?;
    Ok(created)
}

pub async fn fetch_user_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, LedgerError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub async fn fetch_user_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<User>, LedgerError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

/// Adds `amount` to the lifetime spend counter. Called once per fulfilled order with the order's charge.
pub async fn add_total_spent(
    user_id: i64,
    amount: smm_common::Money,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    let result =
        sqlx::query("UPDATE users SET total_spent = total_spent + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(amount)
            .bind(user_id)
            .execute(conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::UserNotFound(user_id));
    }
    Ok(())
}
