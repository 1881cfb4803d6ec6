use chrono::{DateTime, Utc};

use super::{CountRecord, TimeWindow};
use crate::error::DBError;

const RESOURCE: &str = "soil_quality";

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct SoilQualityDao {
    pub(crate) id: i64,
    pub(crate) device_id: String,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) soil_moisture: f64,
    pub(crate) temperature: f64,
    pub(crate) humidity: f64,
    pub(crate) battery_level: f64,
}

impl SoilQualityDao {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[derive(Debug, Clone)]
pub struct SoilQualityFields {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub soil_moisture: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub battery_level: f64,
}

pub async fn insert(
    conn: &sqlx::SqlitePool,
    fields: &SoilQualityFields,
) -> Result<SoilQualityDao, DBError> {
    Ok(sqlx::query_as::<_, SoilQualityDao>(
        r#"INSERT INTO soil_quality (device_id, timestamp, soil_moisture, temperature, humidity, battery_level)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *"#,
    )
    .bind(&fields.device_id)
    .bind(fields.timestamp)
    .bind(fields.soil_moisture)
    .bind(fields.temperature)
    .bind(fields.humidity)
    .bind(fields.battery_level)
    .fetch_one(conn)
    .await?)
}

pub async fn get(conn: &sqlx::SqlitePool, id: i64) -> Result<SoilQualityDao, DBError> {
    sqlx::query_as::<_, SoilQualityDao>("SELECT * FROM soil_quality WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(DBError::RecordNotFound(RESOURCE, id))
}

pub async fn read(
    conn: &sqlx::SqlitePool,
    window: Option<TimeWindow>,
) -> Result<Vec<SoilQualityDao>, DBError> {
    let rows = match window {
        Some(window) => {
            sqlx::query_as::<_, SoilQualityDao>(
                r#"SELECT * FROM soil_quality
                    WHERE timestamp >= ?1 AND timestamp < ?2
                    ORDER BY timestamp ASC, id ASC"#,
            )
            .bind(window.from())
            .bind(window.until())
            .fetch_all(conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, SoilQualityDao>(
                "SELECT * FROM soil_quality ORDER BY timestamp ASC, id ASC",
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
    fields: &SoilQualityFields,
) -> Result<SoilQualityDao, DBError> {
    sqlx::query_as::<_, SoilQualityDao>(
        r#"UPDATE soil_quality
            SET device_id = ?2, timestamp = ?3, soil_moisture = ?4, temperature = ?5, humidity = ?6, battery_level = ?7
            WHERE id = ?1
            RETURNING *"#,
    )
    .bind(id)
    .bind(&fields.device_id)
    .bind(fields.timestamp)
    .bind(fields.soil_moisture)
    .bind(fields.temperature)
    .bind(fields.humidity)
    .bind(fields.battery_level)
    .fetch_optional(conn)
    .await?
    .ok_or(DBError::RecordNotFound(RESOURCE, id))
}

pub async fn delete(conn: &sqlx::SqlitePool, id: i64) -> Result<(), DBError> {
    let result = sqlx::query("DELETE FROM soil_quality WHERE id = ?1")
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
    batch: &[SoilQualityFields],
) -> Result<(), DBError> {
    let mut tx = conn.begin().await?;
    for fields in batch {
        sqlx::query(
            r#"INSERT INTO soil_quality (device_id, timestamp, soil_moisture, temperature, humidity, battery_level)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        )
        .bind(&fields.device_id)
        .bind(fields.timestamp)
        .bind(fields.soil_moisture)
        .bind(fields.temperature)
        .bind(fields.humidity)
        .bind(fields.battery_level)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn purge(conn: &sqlx::SqlitePool) -> Result<(), DBError> {
    sqlx::query("DELETE FROM soil_quality")
        .execute(conn)
        .await?;
    let _ = sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'soil_quality'")
        .execute(conn)
        .await;
    Ok(())
}

pub async fn count(conn: &sqlx::SqlitePool) -> Result<i64, DBError> {
    Ok(
        sqlx::query_as::<_, CountRecord>("SELECT count(*) as count FROM soil_quality")
            .fetch_one(conn)
            .await?
            .count(),
    )
}
