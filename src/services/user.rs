//! User profiles. Callers identify themselves by passing `userId`; there is
//! no session layer.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{CatalogError, require_text};

const USER_COLUMNS: &str = "id, name, email, location, yard_size, experience_level, created_at, last_active";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub location: Option<String>,
    pub yard_size: Option<String>,
    pub experience_level: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub yard_size: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<Option<User>, CatalogError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, CatalogError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"))
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Insert a user.
///
/// # Errors
///
/// Returns `Validation` for a blank name or email and `EmailTaken` when the
/// email is already registered.
pub async fn create_user(pool: &PgPool, new: &NewUser) -> Result<User, CatalogError> {
    require_text("name", &new.name)?;
    require_text("email", &new.email)?;

    let result = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, email, location, yard_size, experience_level)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(new.name.trim())
    .bind(new.email.trim())
    .bind(&new.location)
    .bind(&new.yard_size)
    .bind(&new.experience_level)
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Err(CatalogError::EmailTaken(new.email.trim().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Bump `last_active` after a chat turn.
///
/// # Errors
///
/// Returns a database error if the update fails.
pub async fn touch_last_active(pool: &PgPool, id: Uuid) -> Result<(), CatalogError> {
    sqlx::query("UPDATE users SET last_active = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
