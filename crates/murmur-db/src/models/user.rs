//! Shadow user entity model.
//!
//! One row per identity key. All mutations are transaction-scoped: the
//! caller owns the transaction and decides when to commit.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// A shadow copy of a user record owned by the identity authority.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    /// Identity key, assigned by the authority.
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column values for inserting a new row.
///
/// `username` is already resolved by the caller (the sync handler defaults
/// it to `name` when the event carries none).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub username: String,
    pub phone: Option<String>,
}

/// Column values for a full-row replace of an existing row.
#[derive(Debug, Clone)]
pub struct UserReplacement {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub username: String,
    pub phone: String,
}

impl User {
    /// Insert a new row keyed by the identity key.
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        user: &NewUser,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO users (id, email, name, username, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.phone)
        .fetch_one(&mut **tx)
        .await
    }

    /// Replace every mutable column of the row with the given identity key.
    ///
    /// Returns `sqlx::Error::RowNotFound` if no such row exists.
    pub async fn replace(
        tx: &mut Transaction<'_, Postgres>,
        replacement: &UserReplacement,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE users
            SET email = $2, name = $3, username = $4, phone = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(replacement.id)
        .bind(&replacement.email)
        .bind(&replacement.name)
        .bind(&replacement.username)
        .bind(&replacement.phone)
        .fetch_one(&mut **tx)
        .await
    }

    /// Delete the row with the given identity key.
    ///
    /// Returns the number of rows removed: 0 means the row was already
    /// absent, which callers treat as an idempotent success.
    pub async fn delete(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }

    /// Find a row by identity key.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
