use warp::Filter;

use super::build_response;
use crate::models::{self, air_quality, soil_quality, water_quality};

pub fn routes(
    conn: &sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    health(conn.clone())
}

/// GET /api/health
fn health(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || conn.clone())
        .and(warp::get())
        .and(warp::path!("api" / "health"))
        .and_then(|conn: sqlx::SqlitePool| async move {
            let database_state = match models::check_schema(&conn).await {
                Ok(()) => "connected".to_owned(),
                Err(err) => format!("{}", err),
            };
            let ret = dto::HealthyDto {
                healthy: true,
                database_state,
                air_quality_count: air_quality::count(&conn).await.unwrap_or(0),
                soil_quality_count: soil_quality::count(&conn).await.unwrap_or(0),
                water_quality_count: water_quality::count(&conn).await.unwrap_or(0),
            };
            build_response(Ok(ret))
        })
        .boxed()
}

mod dto {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HealthyDto {
        pub healthy: bool,
        pub database_state: String,
        pub air_quality_count: i64,
        pub soil_quality_count: i64,
        pub water_quality_count: i64,
    }
}
