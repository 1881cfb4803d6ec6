use chrono::{DateTime, Utc};

use super::{CountRecord, TimeWindow};
use crate::error::DBError;

const RESOURCE: &str = "air_quality";

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct AirQualityDao {
    pub(crate) id: i64,
    pub(crate) pm2_5: f64,
    pub(crate) pm10: f64,
    pub(crate) humidity: f64,
    pub(crate) temperature: f64,
    pub(crate) oxygen: f64,
    pub(crate) co2: f64,
    pub(crate) timestamp: DateTime<Utc>,
}

impl AirQualityDao {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Full field set of a reading, without the store-assigned id.
#[derive(Debug, Clone)]
pub struct AirQualityFields {
    pub pm2_5: f64,
    pub pm10: f64,
    pub humidity: f64,
    pub temperature: f64,
    pub oxygen: f64,
    pub co2: f64,
    pub timestamp: DateTime<Utc>,
}

pub async fn insert(
    conn: &sqlx::SqlitePool,
    fields: &AirQualityFields,
) -> Result<AirQualityDao, DBError> {
    Ok(sqlx::query_as::<_, AirQualityDao>(
        r#"INSERT INTO air_quality (pm2_5, pm10, humidity, temperature, oxygen, co2, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING *"#,
    )
    .bind(fields.pm2_5)
    .bind(fields.pm10)
    .bind(fields.humidity)
    .bind(fields.temperature)
    .bind(fields.oxygen)
    .bind(fields.co2)
    .bind(fields.timestamp)
    .fetch_one(conn)
    .await?)
}

pub async fn get(conn: &sqlx::SqlitePool, id: i64) -> Result<AirQualityDao, DBError> {
    sqlx::query_as::<_, AirQualityDao>("SELECT * FROM air_quality WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(DBError::RecordNotFound(RESOURCE, id))
}

pub async fn read(
    conn: &sqlx::SqlitePool,
    window: Option<TimeWindow>,
) -> Result<Vec<AirQualityDao>, DBError> {
    let rows = match window {
        Some(window) => {
            sqlx::query_as::<_, AirQualityDao>(
                r#"SELECT * FROM air_quality
                    WHERE timestamp >= ?1 AND timestamp < ?2
                    ORDER BY timestamp ASC, id ASC"#,
            )
            .bind(window.from())
            .bind(window.until())
            .fetch_all(conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, AirQualityDao>(
                "SELECT * FROM air_quality ORDER BY timestamp ASC, id ASC",
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
    fields: &AirQualityFields,
) -> Result<AirQualityDao, DBError> {
    sqlx::query_as::<_, AirQualityDao>(
        r#"UPDATE air_quality
            SET pm2_5 = ?2, pm10 = ?3, humidity = ?4, temperature = ?5, oxygen = ?6, co2 = ?7, timestamp = ?8
            WHERE id = ?1
            RETURNING *"#,
    )
    .bind(id)
    .bind(fields.pm2_5)
    .bind(fields.pm10)
    .bind(fields.humidity)
    .bind(fields.temperature)
    .bind(fields.oxygen)
    .bind(fields.co2)
    .bind(fields.timestamp)
    .fetch_optional(conn)
    .await?
    .ok_or(DBError::RecordNotFound(RESOURCE, id))
}

pub async fn delete(conn: &sqlx::SqlitePool, id: i64) -> Result<(), DBError> {
    let result = sqlx::query("DELETE FROM air_quality WHERE id = ?1")
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
    batch: &[AirQualityFields],
) -> Result<(), DBError> {
    let mut tx = conn.begin().await?;
    for fields in batch {
        sqlx::query(
            r#"INSERT INTO air_quality (pm2_5, pm10, humidity, temperature, oxygen, co2, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        )
        .bind(fields.pm2_5)
        .bind(fields.pm10)
        .bind(fields.humidity)
        .bind(fields.temperature)
        .bind(fields.oxygen)
        .bind(fields.co2)
        .bind(fields.timestamp)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn purge(conn: &sqlx::SqlitePool) -> Result<(), DBError> {
    sqlx::query("DELETE FROM air_quality").execute(conn).await?;
    // sqlite_sequence only exists once an AUTOINCREMENT insert happened
    let _ = sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'air_quality'")
        .execute(conn)
        .await;
    Ok(())
}

pub async fn count(conn: &sqlx::SqlitePool) -> Result<i64, DBError> {
    Ok(
        sqlx::query_as::<_, CountRecord>("SELECT count(*) as count FROM air_quality")
            .fetch_one(conn)
            .await?
            .count(),
    )
}
