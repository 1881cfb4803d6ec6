use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use rand::Rng;
use tracing::info;

use crate::error::DBError;
use crate::models::air_quality::{self, AirQualityFields};
use crate::models::soil_quality::{self, SoilQualityFields};
use crate::models::water_quality::{self, WaterQualityFields};

const SAMPLE_HOURS: [u32; 6] = [0, 4, 8, 12, 16, 20];

/// Replaces all stored readings with one month of synthetic data,
/// six samples per day and reading type.
pub async fn generate(conn: &sqlx::SqlitePool, year: i32, month: u32) -> Result<(), DBError> {
    air_quality::purge(conn).await?;
    soil_quality::purge(conn).await?;
    water_quality::purge(conn).await?;

    let (air_batch, soil_batch, water_batch) = build_batches(year, month);

    air_quality::bulk_insert(conn, &air_batch).await?;
    soil_quality::bulk_insert(conn, &soil_batch).await?;
    water_quality::bulk_insert(conn, &water_batch).await?;

    info!(
        "Seeded {} readings per type for {:04}-{:02}",
        air_batch.len(),
        year,
        month
    );
    Ok(())
}

fn build_batches(
    year: i32,
    month: u32,
) -> (
    Vec<AirQualityFields>,
    Vec<SoilQualityFields>,
    Vec<WaterQualityFields>,
) {
    let mut rng = rand::thread_rng();
    let mut air_batch = Vec::new();
    let mut soil_batch = Vec::new();
    let mut water_batch = Vec::new();

    let mut date = NaiveDate::from_ymd_opt(year, month, 1).expect("Invalid seed month");
    while date.month() == month {
        for hour in SAMPLE_HOURS {
            let timestamp = Utc
                .with_ymd_and_hms(year, month, date.day(), hour, 0, 0)
                .unwrap();

            air_batch.push(AirQualityFields {
                pm2_5: rng.gen_range(10.0..50.0),
                pm10: rng.gen_range(20.0..80.0),
                humidity: rng.gen_range(30.0..90.0),
                temperature: rng.gen_range(15.0..35.0),
                oxygen: rng.gen_range(19.0..21.0),
                co2: rng.gen_range(300.0..500.0),
                timestamp,
            });
            soil_batch.push(SoilQualityFields {
                device_id: format!("Device_{}", rng.gen_range(1..=10)),
                timestamp,
                soil_moisture: rng.gen_range(10.0..40.0),
                temperature: rng.gen_range(15.0..35.0),
                humidity: rng.gen_range(20.0..70.0),
                battery_level: rng.gen_range(50.0..100.0),
            });
            water_batch.push(WaterQualityFields {
                turbidity: rng.gen_range(1.0..5.0),
                temperature: rng.gen_range(10.0..30.0),
                ph: rng.gen_range(6.0..9.0),
                tds: rng.gen_range(100.0..400.0),
                timestamp,
            });
        }

        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    (air_batch, soil_batch, water_batch)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::test_db_connection;

    #[tokio::test]
    async fn test_seed_fills_one_month() {
        // Prepare
        let conn = test_db_connection().await;

        // Execute
        generate(&conn, 2024, 2).await.unwrap();

        // Validate - 29 days in Feb 2024, 6 samples each
        let readings = air_quality::read(&conn, None).await.unwrap();
        assert_eq!(29 * 6, readings.len());
        assert!(readings.iter().all(|r| r.timestamp().month() == 2));
        assert_eq!(29 * 6, soil_quality::read(&conn, None).await.unwrap().len());
        assert_eq!(29 * 6, water_quality::read(&conn, None).await.unwrap().len());
    }

    #[tokio::test]
    async fn test_seed_restarts_ids() {
        // Prepare
        let conn = test_db_connection().await;
        generate(&conn, 2024, 1).await.unwrap();

        // Execute - reseed
        generate(&conn, 2024, 1).await.unwrap();

        // Validate - sequence reset, ids start over at 1
        let readings = air_quality::read(&conn, None).await.unwrap();
        assert_eq!(1, readings[0].id());
    }
}
