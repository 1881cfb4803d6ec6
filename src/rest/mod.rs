use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{debug, error, info, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::config::CONFIG;
use crate::error::ServiceError;

pub mod air_routes;
pub mod auth_routes;
pub mod health_routes;
pub mod query;
pub mod soil_routes;
pub mod water_routes;

pub fn routes(
    conn: &sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    air_routes::routes(conn)
        .or(soil_routes::routes(conn))
        .or(water_routes::routes(conn))
        .or(auth_routes::routes(conn))
        .or(health_routes::routes(conn))
        .recover(handle_rejection)
}

pub async fn dispatch_server(conn: sqlx::SqlitePool) {
    let bind_addr: SocketAddr = format!("0.0.0.0:{}", CONFIG.server_port())
        .parse()
        .expect("Invalid SERVER_PORT");

    info!("Starting webserver at: {}", bind_addr);
    warp::serve(routes(&conn)).run(bind_addr).await;
}

pub(crate) fn build_response<T: serde::Serialize>(
    resp: Result<T, ServiceError>,
) -> Result<Box<dyn Reply>, Rejection> {
    build_response_with(resp, StatusCode::OK)
}

pub(crate) fn build_response_with<T: serde::Serialize>(
    resp: Result<T, ServiceError>,
    success: StatusCode,
) -> Result<Box<dyn Reply>, Rejection> {
    match resp {
        Ok(data) => Ok(Box::new(warp::reply::with_status(
            warp::reply::json(&data),
            success,
        ))),
        Err(err) => build_error_response(err),
    }
}

/// For replies without a body, e.g. 204 after a delete.
pub(crate) fn build_empty_response(
    resp: Result<(), ServiceError>,
    success: StatusCode,
) -> Result<Box<dyn Reply>, Rejection> {
    match resp {
        Ok(()) => Ok(Box::new(success)),
        Err(err) => build_error_response(err),
    }
}

fn build_error_response(err: ServiceError) -> Result<Box<dyn Reply>, Rejection> {
    let reply: Box<dyn Reply> = match err {
        ServiceError::NotFound(msg) => {
            debug!("{}", msg);
            error_reply(StatusCode::NOT_FOUND, msg)
        }
        ServiceError::Validation(errors) => {
            warn!("{}", errors);
            Box::new(warp::reply::with_status(
                warp::reply::json(&errors),
                StatusCode::BAD_REQUEST,
            ))
        }
        ServiceError::Unauthenticated(msg) => {
            debug!("{}", msg);
            error_reply(StatusCode::UNAUTHORIZED, msg)
        }
        ServiceError::User(msg) => {
            warn!("{}", msg);
            error_reply(StatusCode::BAD_REQUEST, msg)
        }
        ServiceError::Internal(err) => {
            error!("{}", err);
            Box::new(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };
    Ok(reply)
}

fn error_reply(status: StatusCode, error: String) -> Box<dyn Reply> {
    Box::new(warp::reply::with_status(
        warp::reply::json(&dto::ErrorResponseDto { error }),
        status,
    ))
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_owned())
    } else if let Some(body_err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, body_err.to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_owned())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_owned())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_owned(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&dto::ErrorResponseDto { error: message }),
        status,
    ))
}

///
/// DTO
///
pub mod dto {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorResponseDto {
        pub error: String,
    }
}
