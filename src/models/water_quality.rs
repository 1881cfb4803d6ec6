use chrono::{DateTime, Utc};

use super::{CountRecord, TimeWindow};
use crate::error::DBError;

const RESOURCE: &str = "water_quality";

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct WaterQualityDao {
    pub(crate) id: i64,
    pub(crate) turbidity: f64,
    pub(crate) temperature: f64,
    pub(crate) ph: f64,
    pub(crate) tds: f64,
    pub(crate) timestamp: DateTime<Utc>,
}

impl WaterQualityDao {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[derive(Debug, Clone)]
pub struct WaterQualityFields {
    pub turbidity: f64,
    pub temperature: f64,
    pub ph: f64,
    pub tds: f64,
    pub timestamp: DateTime<Utc>,
}

pub async fn insert(
    conn: &sqlx::SqlitePool,
    fields: &WaterQualityFields,
) -> Result<WaterQualityDao, DBError> {
    Ok(sqlx::query_as::<_, WaterQualityDao>(
        r#"INSERT INTO water_quality (turbidity, temperature, ph, tds, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *"#,
    )
    .bind(fields.turbidity)
    .bind(fields.temperature)
    .bind(fields.ph)
    .bind(fields.tds)
    .bind(fields.timestamp)
    .fetch_one(conn)
    .await?)
}

pub async fn get(conn: &sqlx::SqlitePool, id: i64) -> Result<WaterQualityDao, DBError> {
    sqlx::query_as::<_, WaterQualityDao>("SELECT * FROM water_quality WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(DBError::RecordNotFound(RESOURCE, id))
}

pub async fn read(
    conn: &sqlx::SqlitePool,
    window: Option<TimeWindow>,
) -> Result<Vec<WaterQualityDao>, DBError> {
    let rows = match window {
        Some(window) => {
            sqlx::query_as::<_, WaterQualityDao>(
                r#"SELECT * FROM water_quality
                    WHERE timestamp >= ?1 AND timestamp < ?2
                    ORDER BY timestamp ASC, id ASC"#,
            )
            .bind(window.from())
            .bind(window.until())
            .fetch_all(conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, WaterQualityDao>(
                "SELECT * FROM water_quality ORDER BY timestamp ASC, id ASC",
            )
            .fetch_all(conn)
            .await?
        }
    };
    Ok(rows)
}

pub async fn update(
    conn: &sqlx::SqlitePool,
    id: i64,
    fields: &WaterQualityFields,
) -> Result<WaterQualityDao, DBError> {
    sqlx::query_as::<_, WaterQualityDao>(
        r#"UPDATE water_quality
            SET turbidity = ?2, temperature = ?3, ph = ?4, tds = ?5, timestamp = ?6
            WHERE id = ?1
            RETURNING *"#,
    )
    .bind(id)
    .bind(fields.turbidity)
    .bind(fields.temperature)
    .bind(fields.ph)
    .bind(fields.tds)
    .bind(fields.timestamp)
    .fetch_optional(conn)
    .await?
    .ok_or(DBError::RecordNotFound(RESOURCE, id))
}

pub async fn delete(conn: &sqlx::SqlitePool, id: i64) -> Result<(), DBError> {
    let result = sqlx::query("DELETE FROM water_quality WHERE id = ?1")
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DBError::RecordNotFound(RESOURCE, id));
    }
    Ok(())
}

pub async fn bulk_insert(
    conn: &sqlx::SqlitePool,
    batch: &[WaterQualityFields],
) -> Result<(), DBError> {
    let mut tx = conn.begin().await?;
    for fields in batch {
        sqlx::query(
            r#"INSERT INTO water_quality (turbidity, temperature, ph, tds, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(fields.turbidity)
        .bind(fields.temperature)
        .bind(fields.ph)
        .bind(fields.tds)
        .bind(fields.timestamp)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn purge(conn: &sqlx::SqlitePool) -> Result<(), DBError> {
    sqlx::query("DELETE FROM water_quality")
        .execute(conn)
        .await?;
    let _ = sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'water_quality'")
        .execute(conn)
        .await;
    Ok(())
}

pub async fn count(conn: &sqlx::SqlitePool) -> Result<i64, DBError> {
    Ok(
        sqlx::query_as::<_, CountRecord>("SELECT count(*) as count FROM water_quality")
            .fetch_one(conn)
            .await?
            .count(),
    )
}
