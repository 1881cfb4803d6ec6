use warp::http::StatusCode;
use warp::Filter;

use super::query::ReadingQuery;
use super::{build_empty_response, build_response, build_response_with};
use crate::auth::{self, Principal};
use crate::error::ServiceError;
use crate::models::soil_quality;

pub fn routes(
    conn: &sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    list_readings(conn.clone())
        .or(retrieve_reading(conn.clone()))
        .or(create_reading(conn.clone()))
        .or(replace_reading(conn.clone()))
        .or(modify_reading(conn.clone()))
        .or(delete_reading(conn.clone()))
}

/// GET /soil-quality
///
/// List all soil quality readings ordered by (timestamp, id)
fn list_readings(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || conn.clone())
        .and(warp::get())
        .and(warp::path!("soil-quality"))
        .and(warp::query::<ReadingQuery>())
        .and_then(|conn: sqlx::SqlitePool, query: ReadingQuery| async move {
            let resp = soil_quality::read(&conn, query.window())
                .await
                .map_err(ServiceError::from);
            build_response(resp)
        })
        .boxed()
}

/// GET /soil-quality/:id
fn retrieve_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || conn.clone())
        .and(warp::get())
        .and(warp::path!("soil-quality" / i64))
        .and_then(|conn: sqlx::SqlitePool, id: i64| async move {
            let resp = soil_quality::get(&conn, id).await.map_err(ServiceError::from);
            build_response(resp)
        })
        .boxed()
}

/// POST /soil-quality
fn create_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::post())
        .and(warp::path!("soil-quality"))
        .and(principal)
        .and(warp::body::json())
        .and_then(
            |conn: sqlx::SqlitePool, principal: Option<Principal>, body: dto::SoilQualityDto| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => match body.into_fields() {
                        Ok(fields) => soil_quality::insert(&conn, &fields)
                            .await
                            .map_err(ServiceError::from),
                        Err(errors) => Err(errors.into()),
                    },
                    Err(denied) => Err(denied),
                };
                build_response_with(resp, StatusCode::CREATED)
            },
        )
        .boxed()
}

/// PUT /soil-quality/:id
fn replace_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::put())
        .and(warp::path!("soil-quality" / i64))
        .and(principal)
        .and(warp::body::json())
        .and_then(
            |conn: sqlx::SqlitePool, id: i64, principal: Option<Principal>, body: dto::SoilQualityDto| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => match body.into_fields() {
                        Ok(fields) => soil_quality::update(&conn, id, &fields)
                            .await
                            .map_err(ServiceError::from),
                        Err(errors) => Err(errors.into()),
                    },
                    Err(denied) => Err(denied),
                };
                build_response(resp)
            },
        )
        .boxed()
}

/// PATCH /soil-quality/:id
fn modify_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::patch())
        .and(warp::path!("soil-quality" / i64))
        .and(principal)
        .and(warp::body::json())
        .and_then(
            |conn: sqlx::SqlitePool, id: i64, principal: Option<Principal>, body: dto::SoilQualityDto| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => match soil_quality::get(&conn, id).await {
                        Ok(current) => match body.merged_with(&current) {
                            Ok(fields) => soil_quality::update(&conn, id, &fields)
                                .await
                                .map_err(ServiceError::from),
                            Err(errors) => Err(errors.into()),
                        },
                        Err(err) => Err(err.into()),
                    },
                    Err(denied) => Err(denied),
                };
                build_response(resp)
            },
        )
        .boxed()
}

/// DELETE /soil-quality/:id
fn delete_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::delete())
        .and(warp::path!("soil-quality" / i64))
        .and(principal)
        .and_then(
            |conn: sqlx::SqlitePool, id: i64, principal: Option<Principal>| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => soil_quality::delete(&conn, id).await.map_err(ServiceError::from),
                    Err(denied) => Err(denied),
                };
                build_empty_response(resp, StatusCode::NO_CONTENT)
            },
        )
        .boxed()
}

///
/// DTO
///
pub mod dto {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    use crate::error::ValidationErrors;
    use crate::models::soil_quality::{SoilQualityDao, SoilQualityFields};

    const MAX_DEVICE_ID_LEN: usize = 50;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SoilQualityDto {
        pub device_id: Option<String>,
        pub timestamp: Option<DateTime<Utc>>,
        pub soil_moisture: Option<f64>,
        pub temperature: Option<f64>,
        pub humidity: Option<f64>,
        pub battery_level: Option<f64>,
    }

    impl SoilQualityDto {
        pub fn into_fields(self) -> Result<SoilQualityFields, ValidationErrors> {
            let mut errors = ValidationErrors::default();
            let device_id = errors.require("device_id", self.device_id);
            let timestamp = errors.require("timestamp", self.timestamp);
            let soil_moisture = errors.require("soil_moisture", self.soil_moisture);
            let temperature = errors.require("temperature", self.temperature);
            let humidity = errors.require("humidity", self.humidity);
            let battery_level = errors.require("battery_level", self.battery_level);
            check_device_id(&mut errors, device_id.as_deref());

            match (device_id, timestamp, soil_moisture, temperature, humidity, battery_level) {
                (
                    Some(device_id),
                    Some(timestamp),
                    Some(soil_moisture),
                    Some(temperature),
                    Some(humidity),
                    Some(battery_level),
                ) if errors.is_empty() => Ok(SoilQualityFields {
                    device_id,
                    timestamp,
                    soil_moisture,
                    temperature,
                    humidity,
                    battery_level,
                }),
                _ => Err(errors),
            }
        }

        pub fn merged_with(self, current: &SoilQualityDao) -> Result<SoilQualityFields, ValidationErrors> {
            let mut errors = ValidationErrors::default();
            check_device_id(&mut errors, self.device_id.as_deref());
            if !errors.is_empty() {
                return Err(errors);
            }

            Ok(SoilQualityFields {
                device_id: self.device_id.unwrap_or_else(|| current.device_id.clone()),
                timestamp: self.timestamp.unwrap_or(current.timestamp),
                soil_moisture: self.soil_moisture.unwrap_or(current.soil_moisture),
                temperature: self.temperature.unwrap_or(current.temperature),
                humidity: self.humidity.unwrap_or(current.humidity),
                battery_level: self.battery_level.unwrap_or(current.battery_level),
            })
        }
    }

    fn check_device_id(errors: &mut ValidationErrors, device_id: Option<&str>) {
        if device_id.map_or(false, |id| id.chars().count() > MAX_DEVICE_ID_LEN) {
            errors.add(
                "device_id",
                "Ensure this field has no more than 50 characters.",
            );
        }
    }
}

///
/// TEST
///
#[cfg(test)]
mod test {
    use super::*;
    use crate::models::soil_quality::{SoilQualityDao, SoilQualityFields};
    use crate::models::test_db_connection;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn fields_at(device_id: &str, timestamp: DateTime<Utc>) -> SoilQualityFields {
        SoilQualityFields {
            device_id: device_id.to_owned(),
            timestamp,
            soil_moisture: 22.0,
            temperature: 18.0,
            humidity: 45.0,
            battery_level: 87.5,
        }
    }

    #[tokio::test]
    async fn test_rest_create_and_retrieve_reading() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let dto = dto::SoilQualityDto {
            device_id: Some("Device_3".to_owned()),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 3, 15, 4, 0, 0).unwrap()),
            soil_moisture: Some(22.0),
            temperature: Some(18.0),
            humidity: Some(45.0),
            battery_level: Some(87.5),
        };

        // Execute
        let res = warp::test::request()
            .path("/soil-quality")
            .method("POST")
            .json(&dto)
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 201);
        let created: SoilQualityDao = serde_json::from_slice(res.body()).unwrap();
        assert_eq!("Device_3", created.device_id());

        let res = warp::test::request()
            .path(&format!("/soil-quality/{}", created.id()))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 200);
        let fetched: SoilQualityDao = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(created, fetched);
    }

    #[tokio::test]
    async fn test_rest_create_reading_device_id_too_long() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let dto = dto::SoilQualityDto {
            device_id: Some("x".repeat(51)),
            timestamp: Some(Utc::now()),
            soil_moisture: Some(22.0),
            temperature: Some(18.0),
            humidity: Some(45.0),
            battery_level: Some(87.5),
        };

        // Execute
        let res = warp::test::request()
            .path("/soil-quality")
            .method("POST")
            .json(&dto)
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 400);
        let errors: BTreeMap<String, Vec<String>> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(
            errors["device_id"],
            vec!["Ensure this field has no more than 50 characters."]
        );
    }

    #[tokio::test]
    async fn test_rest_month_filter() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        for (m, d) in [(1, 1), (1, 15), (2, 1)] {
            soil_quality::insert(
                &conn,
                &fields_at("Device_1", Utc.with_ymd_and_hms(2024, m, d, 8, 0, 0).unwrap()),
            )
            .await
            .unwrap();
        }

        // Execute
        let res = warp::test::request()
            .path("/soil-quality?month=2024-01")
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 200);
        let readings: Vec<SoilQualityDao> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(2, readings.len());
    }

    #[tokio::test]
    async fn test_rest_modify_keeps_device_id() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let created = soil_quality::insert(&conn, &fields_at("Device_7", Utc::now()))
            .await
            .unwrap();
        let patch = dto::SoilQualityDto {
            battery_level: Some(12.0),
            ..Default::default()
        };

        // Execute
        let res = warp::test::request()
            .path(&format!("/soil-quality/{}", created.id()))
            .method("PATCH")
            .json(&patch)
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 200);
        let updated: SoilQualityDao = serde_json::from_slice(res.body()).unwrap();
        assert_eq!("Device_7", updated.device_id());
        assert_eq!(12.0, updated.battery_level);
    }

    #[tokio::test]
    async fn test_rest_delete_reading() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let created = soil_quality::insert(&conn, &fields_at("Device_1", Utc::now()))
            .await
            .unwrap();

        // Execute
        let res = warp::test::request()
            .path(&format!("/soil-quality/{}", created.id()))
            .method("DELETE")
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 204);
        let res = warp::test::request()
            .path(&format!("/soil-quality/{}", created.id()))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 404);
    }
}
