use chrono::{DateTime, Utc};

use crate::error::DBError;

const RESOURCE: &str = "user";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserDao {
    pub(crate) id: i64,
    pub(crate) email: String,
    pub(crate) username: String,
    pub(crate) password_hash: String,
    pub(crate) is_active: bool,
    pub(crate) date_joined: DateTime<Utc>,
}

impl UserDao {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn date_joined(&self) -> DateTime<Utc> {
        self.date_joined
    }
}

pub async fn insert(
    conn: &sqlx::SqlitePool,
    email: &str,
    username: &str,
    password_hash: &str,
) -> Result<UserDao, DBError> {
    Ok(sqlx::query_as::<_, UserDao>(
        r#"INSERT INTO users (email, username, password_hash, is_active, date_joined)
            VALUES (?1, ?2, ?3, 0, ?4)
            RETURNING *"#,
    )
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?)
}

pub async fn get(conn: &sqlx::SqlitePool, id: i64) -> Result<UserDao, DBError> {
    sqlx::query_as::<_, UserDao>("SELECT * FROM users WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(DBError::RecordNotFound(RESOURCE, id))
}

pub async fn get_by_email(
    conn: &sqlx::SqlitePool,
    email: &str,
) -> Result<Option<UserDao>, DBError> {
    Ok(
        sqlx::query_as::<_, UserDao>("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(conn)
            .await?,
    )
}

pub async fn activate(conn: &sqlx::SqlitePool, id: i64) -> Result<(), DBError> {
    let result = sqlx::query("UPDATE users SET is_active = 1 WHERE id = ?1")
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DBError::RecordNotFound(RESOURCE, id));
    }
    Ok(())
}
