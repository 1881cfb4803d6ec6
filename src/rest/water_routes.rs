use warp::http::StatusCode;
use warp::Filter;

use super::query::ReadingQuery;
use super::{build_empty_response, build_response, build_response_with};
use crate::auth::{self, Principal};
use crate::error::ServiceError;
use crate::models::water_quality;

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

/// GET /water-quality
///
/// List all water quality readings ordered by (timestamp, id)
fn list_readings(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || conn.clone())
        .and(warp::get())
        .and(warp::path!("water-quality"))
        .and(warp::query::<ReadingQuery>())
        .and_then(|conn: sqlx::SqlitePool, query: ReadingQuery| async move {
            let resp = water_quality::read(&conn, query.window())
                .await
                .map_err(ServiceError::from);
            build_response(resp)
        })
        .boxed()
}

/// GET /water-quality/:id
fn retrieve_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || conn.clone())
        .and(warp::get())
        .and(warp::path!("water-quality" / i64))
        .and_then(|conn: sqlx::SqlitePool, id: i64| async move {
            let resp = water_quality::get(&conn, id).await.map_err(ServiceError::from);
            build_response(resp)
        })
        .boxed()
}

/// POST /water-quality
fn create_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::post())
        .and(warp::path!("water-quality"))
        .and(principal)
        .and(warp::body::json())
        .and_then(
            |conn: sqlx::SqlitePool, principal: Option<Principal>, body: dto::WaterQualityDto| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => match body.into_fields() {
                        Ok(fields) => water_quality::insert(&conn, &fields)
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

/// PUT /water-quality/:id
fn replace_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::put())
        .and(warp::path!("water-quality" / i64))
        .and(principal)
        .and(warp::body::json())
        .and_then(
            |conn: sqlx::SqlitePool, id: i64, principal: Option<Principal>, body: dto::WaterQualityDto| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => match body.into_fields() {
                        Ok(fields) => water_quality::update(&conn, id, &fields)
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

/// PATCH /water-quality/:id
fn modify_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::patch())
        .and(warp::path!("water-quality" / i64))
        .and(principal)
        .and(warp::body::json())
        .and_then(
            |conn: sqlx::SqlitePool, id: i64, principal: Option<Principal>, body: dto::WaterQualityDto| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => match water_quality::get(&conn, id).await {
                        Ok(current) => {
                            let fields = body.merged_with(&current);
                            water_quality::update(&conn, id, &fields)
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

/// DELETE /water-quality/:id
fn delete_reading(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::delete())
        .and(warp::path!("water-quality" / i64))
        .and(principal)
        .and_then(
            |conn: sqlx::SqlitePool, id: i64, principal: Option<Principal>| async move {
                let resp = match auth::enforce_write(&principal) {
                    Ok(()) => water_quality::delete(&conn, id).await.map_err(ServiceError::from),
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
    use crate::models::water_quality::{WaterQualityDao, WaterQualityFields};

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct WaterQualityDto {
        pub turbidity: Option<f64>,
        pub temperature: Option<f64>,
        pub ph: Option<f64>,
        pub tds: Option<f64>,
        pub timestamp: Option<DateTime<Utc>>,
    }

    impl WaterQualityDto {
        pub fn into_fields(self) -> Result<WaterQualityFields, ValidationErrors> {
            let mut errors = ValidationErrors::default();
            let turbidity = errors.require("turbidity", self.turbidity);
            let temperature = errors.require("temperature", self.temperature);
            let ph = errors.require("ph", self.ph);
            let tds = errors.require("tds", self.tds);
            let timestamp = errors.require("timestamp", self.timestamp);

            match (turbidity, temperature, ph, tds, timestamp) {
                (Some(turbidity), Some(temperature), Some(ph), Some(tds), Some(timestamp)) => {
                    Ok(WaterQualityFields {
                        turbidity,
                        temperature,
                        ph,
                        tds,
                        timestamp,
                    })
                }
                _ => Err(errors),
            }
        }

        pub fn merged_with(self, current: &WaterQualityDao) -> WaterQualityFields {
            WaterQualityFields {
                turbidity: self.turbidity.unwrap_or(current.turbidity),
                temperature: self.temperature.unwrap_or(current.temperature),
                ph: self.ph.unwrap_or(current.ph),
                tds: self.tds.unwrap_or(current.tds),
                timestamp: self.timestamp.unwrap_or(current.timestamp),
            }
        }
    }
}
