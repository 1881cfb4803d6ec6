use chrono::{DateTime, Utc};

use crate::error::DBError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TokenDao {
    pub(crate) key: String,
    pub(crate) user_id: i64,
    pub(crate) created: DateTime<Utc>,
}

impl TokenDao {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

pub async fn insert(conn: &sqlx::SqlitePool, key: &str, user_id: i64) -> Result<TokenDao, DBError> {
    Ok(sqlx::query_as::<_, TokenDao>(
        "INSERT INTO auth_tokens (key, user_id, created) VALUES (?1, ?2, ?3) RETURNING *",
    )
    .bind(key)
    .bind(user_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?)
}

pub async fn get(conn: &sqlx::SqlitePool, key: &str) -> Result<Option<TokenDao>, DBError> {
    Ok(
        sqlx::query_as::<_, TokenDao>("SELECT * FROM auth_tokens WHERE key = ?1")
            .bind(key)
            .fetch_optional(conn)
            .await?,
    )
}

pub async fn delete(conn: &sqlx::SqlitePool, key: &str) -> Result<(), DBError> {
    sqlx::query("DELETE FROM auth_tokens WHERE key = ?1")
        .bind(key)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete_for_user(conn: &sqlx::SqlitePool, user_id: i64) -> Result<(), DBError> {
    sqlx::query("DELETE FROM auth_tokens WHERE user_id = ?1")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}
