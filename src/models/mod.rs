use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::CONFIG;
use crate::error::DBError;

pub async fn establish_db_connection() -> Option<sqlx::SqlitePool> {
    let database_url = CONFIG.database_url();
    let options = SqliteConnectOptions::from_str(database_url)
        .ok()?
        .create_if_missing(true);
    SqlitePoolOptions::new().connect_with(options).await.ok()
}

pub async fn run_migrations(conn: &sqlx::SqlitePool) -> Result<(), DBError> {
    sqlx::migrate!()
        .run(conn)
        .await
        .map_err(|err| DBError::SQLError(sqlx::Error::Migrate(Box::new(err))))
}

pub async fn check_schema(conn: &sqlx::SqlitePool) -> Result<(), DBError> {
    sqlx::query("SELECT count(*) FROM air_quality")
        .fetch_one(conn)
        .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
pub(crate) struct CountRecord {
    pub count: Option<i64>,
}

impl CountRecord {
    pub fn count(self) -> i64 {
        self.count.unwrap_or(0)
    }
}

/// Half-open UTC range `[from, until)` a listing gets narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    from: DateTime<Utc>,
    until: DateTime<Utc>,
}

impl TimeWindow {
    /// Window spanning one calendar day.
    pub fn day(date: NaiveDate) -> Option<Self> {
        Some(TimeWindow {
            from: date.and_hms_opt(0, 0, 0)?.and_utc(),
            until: date.succ_opt()?.and_hms_opt(0, 0, 0)?.and_utc(),
        })
    }

    /// Window spanning one calendar month.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let from = NaiveDate::from_ymd_opt(year, month, 1)?;
        let until = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(TimeWindow {
            from: from.and_hms_opt(0, 0, 0)?.and_utc(),
            until: until.and_hms_opt(0, 0, 0)?.and_utc(),
        })
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn until(&self) -> DateTime<Utc> {
        self.until
    }
}

#[cfg(test)]
pub(crate) async fn test_db_connection() -> sqlx::SqlitePool {
    let conn = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&conn).await.unwrap();
    conn
}

pub mod air_quality;
pub mod soil_quality;
pub mod token;
pub mod user;
pub mod water_quality;
