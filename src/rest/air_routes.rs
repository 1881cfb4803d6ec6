use warp::http::StatusCode;
use warp::Filter;

use super::query::ReadingQuery;
use super::{build_empty_response, build_response, build_response_with};
use crate::auth::{self, Principal};
use crate::error::ServiceError;
use crate::models::air_quality;

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

/// GET /air-quality
///
/// List all air quality readings ordered by (timestamp, id)
///
/// `?date=YYYY-MM-DD` narrows to one day, `?month=YYYY-MM` to one month
fn list_readings(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || conn.clone())
        .and(warp::get())
        .and(warp::path!("air-quality"))
        .and(warp::query::<ReadingQuery>())
        .and_then(|conn: sqlx::SqlitePool, query: ReadingQuery| async move {
            let resp = air_quality::read(&conn, query.window())
                .await
                .map_err(ServiceError::from);
            build_response(resp)
        })
        .boxed()
}

/// GET /air-quality/:id
///
/// Fetch a single air quality reading
fn retrieve_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || conn.clone())
        .and(warp::get())
        .and(warp::path!("air-quality" / i64))
        .and_then(|conn: sqlx::SqlitePool, id: i64| async move {
            let resp = air_quality::get(&conn, id).await.map_err(ServiceError::from);
            build_response(resp)
        })
        .boxed()
}

/// POST /air-quality
///
/// Persist a new reading, the store assigns the id
///
/// Returns 201 with the stored record, or 400 with per-field errors
fn create_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::post())
        .and(warp::path!("air-quality"))
        .and(principal)
        .and(warp::body::json())
        .and_then(
            |conn: sqlx::SqlitePool, principal: Option<Principal>, body: dto::AirQualityDto| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => match body.into_fields() {
                        Ok(fields) => air_quality::insert(&conn, &fields)
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

/// PUT /air-quality/:id
///
/// Replace all fields of a reading
fn replace_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::put())
        .and(warp::path!("air-quality" / i64))
        .and(principal)
        .and(warp::body::json())
        .and_then(
            |conn: sqlx::SqlitePool, id: i64, principal: Option<Principal>, body: dto::AirQualityDto| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => match body.into_fields() {
                        Ok(fields) => air_quality::update(&conn, id, &fields)
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

/// PATCH /air-quality/:id
///
/// Update the supplied fields, keeping the rest
fn modify_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::patch())
        .and(warp::path!("air-quality" / i64))
        .and(principal)
        .and(warp::body::json())
        .and_then(
            |conn: sqlx::SqlitePool, id: i64, principal: Option<Principal>, body: dto::AirQualityDto| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => match air_quality::get(&conn, id).await {
                        Ok(current) => {
                            let fields = body.merged_with(&current);
                            air_quality::update(&conn, id, &fields)
                                .await
                                .map_err(ServiceError::from)
                        }
                        Err(err) => Err(err.into()),
                    },
                    Err(denied) => Err(denied),
                };
                build_response(resp)
            },
        )
        .boxed()
}

/// DELETE /air-quality/:id
///
/// Returns 204 on success, 404 for an unknown id
fn delete_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::delete())
        .and(warp::path!("air-quality" / i64))
        .and(principal)
        .and_then(
            |conn: sqlx::SqlitePool, id: i64, principal: Option<Principal>| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => air_quality::delete(&conn, id).await.map_err(ServiceError::from),
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
    use crate::models::air_quality::{AirQualityDao, AirQualityFields};

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AirQualityDto {
        pub pm2_5: Option<f64>,
        pub pm10: Option<f64>,
        pub humidity: Option<f64>,
        pub temperature: Option<f64>,
        pub oxygen: Option<f64>,
        pub co2: Option<f64>,
        pub timestamp: Option<DateTime<Utc>>,
    }

    impl AirQualityDto {
        pub fn into_fields(self) -> Result<AirQualityFields, ValidationErrors> {
            let mut errors = ValidationErrors::default();
            let pm2_5 = errors.require("pm2_5", self.pm2_5);
            let pm10 = errors.require("pm10", self.pm10);
            let humidity = errors.require("humidity", self.humidity);
            let temperature = errors.require("temperature", self.temperature);
            let oxygen = errors.require("oxygen", self.oxygen);
            let co2 = errors.require("co2", self.co2);
            let timestamp = errors.require("timestamp", self.timestamp);

            match (pm2_5, pm10, humidity, temperature, oxygen, co2, timestamp) {
                (
                    Some(pm2_5),
                    Some(pm10),
                    Some(humidity),
                    Some(temperature),
                    Some(oxygen),
                    Some(co2),
                    Some(timestamp),
                ) => Ok(AirQualityFields {
                    pm2_5,
                    pm10,
                    humidity,
                    temperature,
                    oxygen,
                    co2,
                    timestamp,
                }),
                _ => Err(errors),
            }
        }

        pub fn merged_with(self, current: &AirQualityDao) -> AirQualityFields {
            AirQualityFields {
                pm2_5: self.pm2_5.unwrap_or(current.pm2_5),
                pm10: self.pm10.unwrap_or(current.pm10),
                humidity: self.humidity.unwrap_or(current.humidity),
                temperature: self.temperature.unwrap_or(current.temperature),
                oxygen: self.oxygen.unwrap_or(current.oxygen),
                co2: self.co2.unwrap_or(current.co2),
                timestamp: self.timestamp.unwrap_or(current.timestamp),
            }
        }
    }
}

///
/// TEST
///
#[cfg(test)]
mod test {
    use super::*;
    use crate::models::air_quality::{AirQualityDao, AirQualityFields};
    use crate::models::test_db_connection;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn fields_at(timestamp: DateTime<Utc>) -> AirQualityFields {
        AirQualityFields {
            pm2_5: 25.0,
            pm10: 40.0,
            humidity: 60.0,
            temperature: 21.5,
            oxygen: 20.5,
            co2: 415.0,
            timestamp,
        }
    }

    fn request_dto(timestamp: DateTime<Utc>) -> dto::AirQualityDto {
        dto::AirQualityDto {
            pm2_5: Some(25.0),
            pm10: Some(40.0),
            humidity: Some(60.0),
            temperature: Some(21.5),
            oxygen: Some(20.5),
            co2: Some(415.0),
            timestamp: Some(timestamp),
        }
    }

    #[tokio::test]
    async fn test_rest_create_and_retrieve_reading() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let dto = request_dto(Utc.with_ymd_and_hms(2024, 3, 15, 4, 0, 0).unwrap());

        // Execute
        let res = warp::test::request()
            .path("/air-quality")
            .method("POST")
            .json(&dto)
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 201);
        let created: AirQualityDao = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(created.id(), 1);

        let res = warp::test::request()
            .path(&format!("/air-quality/{}", created.id()))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 200);
        let fetched: AirQualityDao = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(created, fetched);
    }

    #[tokio::test]
    async fn test_rest_create_reading_missing_fields() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let dto = dto::AirQualityDto {
            pm2_5: Some(25.0),
            ..Default::default()
        };

        // Execute
        let res = warp::test::request()
            .path("/air-quality")
            .method("POST")
            .json(&dto)
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 400);
        let errors: BTreeMap<String, Vec<String>> = serde_json::from_slice(res.body()).unwrap();
        assert!(errors.get("pm2_5").is_none());
        assert_eq!(errors["pm10"], vec!["This field is required."]);
        assert_eq!(errors["timestamp"], vec!["This field is required."]);
    }

    #[tokio::test]
    async fn test_rest_retrieve_unknown_reading() {
        let conn = test_db_connection().await;
        let routes = routes(&conn);

        let res = warp::test::request()
            .path("/air-quality/4711")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 404);
    }

    #[tokio::test]
    async fn test_rest_list_ordered_by_timestamp_then_id() {
        // Prepare - insert out of order
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        air_quality::insert(&conn, &fields_at(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()))
            .await
            .unwrap();
        air_quality::insert(&conn, &fields_at(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()))
            .await
            .unwrap();
        air_quality::insert(&conn, &fields_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()))
            .await
            .unwrap();

        // Execute
        let res = warp::test::request().path("/air-quality").reply(&routes).await;

        // Validate
        assert_eq!(res.status(), 200);
        let readings: Vec<AirQualityDao> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(3, readings.len());
        let timestamps: Vec<DateTime<Utc>> = readings.iter().map(|r| r.timestamp()).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(sorted, timestamps);
    }

    #[tokio::test]
    async fn test_rest_month_filter() {
        // Prepare - readings at 2024-01-01, 2024-01-15, 2024-02-01
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        for (y, m, d) in [(2024, 1, 1), (2024, 1, 15), (2024, 2, 1)] {
            air_quality::insert(&conn, &fields_at(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()))
                .await
                .unwrap();
        }

        // Execute
        let res = warp::test::request()
            .path("/air-quality?month=2024-01")
            .reply(&routes)
            .await;

        // Validate - exactly the two January readings, in timestamp order
        assert_eq!(res.status(), 200);
        let readings: Vec<AirQualityDao> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(2, readings.len());
        assert_eq!(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(), readings[0].timestamp());
        assert_eq!(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(), readings[1].timestamp());
    }

    #[tokio::test]
    async fn test_rest_date_filter_exact_day() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        air_quality::insert(&conn, &fields_at(Utc.with_ymd_and_hms(2024, 3, 14, 23, 59, 59).unwrap()))
            .await
            .unwrap();
        let on_day =
            air_quality::insert(&conn, &fields_at(Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap()))
                .await
                .unwrap();
        air_quality::insert(&conn, &fields_at(Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap()))
            .await
            .unwrap();

        // Execute
        let res = warp::test::request()
            .path("/air-quality?date=2024-03-15")
            .reply(&routes)
            .await;

        // Validate
        let readings: Vec<AirQualityDao> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(1, readings.len());
        assert_eq!(on_day.id(), readings[0].id());
    }

    #[tokio::test]
    async fn test_rest_date_wins_over_month() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        air_quality::insert(&conn, &fields_at(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()))
            .await
            .unwrap();
        air_quality::insert(&conn, &fields_at(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()))
            .await
            .unwrap();

        // Execute - month names January, but date wins
        let res = warp::test::request()
            .path("/air-quality?date=2024-03-15&month=2024-01")
            .reply(&routes)
            .await;

        // Validate
        let readings: Vec<AirQualityDao> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(1, readings.len());
        assert_eq!(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap(), readings[0].timestamp());
    }

    #[tokio::test]
    async fn test_rest_unparseable_date_lists_everything() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        for d in [1, 2, 3] {
            air_quality::insert(&conn, &fields_at(Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()))
                .await
                .unwrap();
        }

        // Execute
        let res = warp::test::request()
            .path("/air-quality?date=not-a-date")
            .reply(&routes)
            .await;

        // Validate - same as an unfiltered listing
        let readings: Vec<AirQualityDao> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(3, readings.len());
    }

    #[tokio::test]
    async fn test_rest_replace_reading() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let created = air_quality::insert(
            &conn,
            &fields_at(Utc.with_ymd_and_hms(2024, 3, 15, 4, 0, 0).unwrap()),
        )
        .await
        .unwrap();

        let mut dto = request_dto(Utc.with_ymd_and_hms(2024, 3, 15, 4, 0, 0).unwrap());
        dto.co2 = Some(999.0);

        // Execute
        let res = warp::test::request()
            .path(&format!("/air-quality/{}", created.id()))
            .method("PUT")
            .json(&dto)
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 200);
        let updated: AirQualityDao = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(created.id(), updated.id());

        let res = warp::test::request()
            .path(&format!("/air-quality/{}", created.id()))
            .reply(&routes)
            .await;
        let fetched: AirQualityDao = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(updated, fetched);
    }

    #[tokio::test]
    async fn test_rest_replace_unknown_reading() {
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let dto = request_dto(Utc::now());

        let res = warp::test::request()
            .path("/air-quality/4711")
            .method("PUT")
            .json(&dto)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 404);
    }

    #[tokio::test]
    async fn test_rest_replace_reading_missing_field() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let created = air_quality::insert(&conn, &fields_at(Utc::now())).await.unwrap();
        let mut dto = request_dto(Utc::now());
        dto.humidity = None;

        // Execute
        let res = warp::test::request()
            .path(&format!("/air-quality/{}", created.id()))
            .method("PUT")
            .json(&dto)
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 400);
        let errors: BTreeMap<String, Vec<String>> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(errors["humidity"], vec!["This field is required."]);
    }

    #[tokio::test]
    async fn test_rest_modify_reading_partially() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let created = air_quality::insert(
            &conn,
            &fields_at(Utc.with_ymd_and_hms(2024, 3, 15, 4, 0, 0).unwrap()),
        )
        .await
        .unwrap();
        let patch = dto::AirQualityDto {
            temperature: Some(30.0),
            ..Default::default()
        };

        // Execute
        let res = warp::test::request()
            .path(&format!("/air-quality/{}", created.id()))
            .method("PATCH")
            .json(&patch)
            .reply(&routes)
            .await;

        // Validate - only temperature changed
        assert_eq!(res.status(), 200);
        let updated: AirQualityDao = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(30.0, updated.temperature);
        assert_eq!(created.pm2_5, updated.pm2_5);
        assert_eq!(created.timestamp(), updated.timestamp());
    }

    #[tokio::test]
    async fn test_rest_delete_reading() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let created = air_quality::insert(&conn, &fields_at(Utc::now())).await.unwrap();

        // Execute
        let res = warp::test::request()
            .path(&format!("/air-quality/{}", created.id()))
            .method("DELETE")
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 204);
        let res = warp::test::request()
            .path(&format!("/air-quality/{}", created.id()))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 404);
    }

    #[tokio::test]
    async fn test_rest_delete_unknown_reading() {
        let conn = test_db_connection().await;
        let routes = routes(&conn);

        let res = warp::test::request()
            .path("/air-quality/4711")
            .method("DELETE")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 404);
    }
}
