use tracing::info;
use warp::http::StatusCode;
use warp::Filter;

use super::{build_empty_response, build_response, build_response_with};
use crate::auth::{self, Principal};
use crate::error::{AuthError, DBError, ServiceError, ValidationErrors};
use crate::models::user as user_model;

pub fn routes(
    conn: &sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    register_user(conn.clone())
        .or(activate_account(conn.clone()))
        .or(login(conn.clone()))
        .or(logout(conn.clone()))
        .or(verify_token(conn.clone()))
}

/// POST /auth/users
///
/// Register a new, initially inactive account
///
/// The activation link is written to the log, mail delivery is
/// handled outside this service
fn register_user(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || conn.clone())
        .and(warp::post())
        .and(warp::path!("auth" / "users"))
        .and(warp::body::json())
        .and_then(
            |conn: sqlx::SqlitePool, body: dto::UserCreateDto| async move {
                let resp = create_account(&conn, body).await;
                build_response_with(resp, StatusCode::CREATED)
            },
        )
        .boxed()
}

/// GET /auth/activate/:uidb64/:token
///
/// Activate an account through its signed activation link
fn activate_account(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || conn.clone())
        .and(warp::get())
        .and(warp::path!("auth" / "activate" / String / String))
        .and_then(
            |conn: sqlx::SqlitePool, uidb64: String, token: String| async move {
                let resp = activate(&conn, &uidb64, &token).await;
                build_response(resp)
            },
        )
        .boxed()
}

/// POST /auth/token/login
///
/// Issue a bearer token for an active account
fn login(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || conn.clone())
        .and(warp::post())
        .and(warp::path!("auth" / "token" / "login"))
        .and(warp::body::json())
        .and_then(|conn: sqlx::SqlitePool, body: dto::LoginDto| async move {
            let resp = issue_token(&conn, body).await;
            build_response(resp)
        })
        .boxed()
}

/// POST /auth/token/logout
///
/// Revoke the presented token
fn logout(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::post())
        .and(warp::path!("auth" / "token" / "logout"))
        .and(principal)
        .and_then(
            |conn: sqlx::SqlitePool, principal: Option<Principal>| async move {
                let resp = match auth::require(principal) {
                    Ok(principal) => auth::revoke_token(&conn, &principal).await,
                    Err(denied) => Err(denied),
                };
                build_empty_response(resp, StatusCode::NO_CONTENT)
            },
        )
        .boxed()
}

/// GET /auth/token/verify
///
/// 200 if the presented token resolves to an active account
fn verify_token(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let principal = auth::principal(conn.clone());
    warp::any()
        .map(move || conn.clone())
        .and(warp::get())
        .and(warp::path!("auth" / "token" / "verify"))
        .and(principal)
        .and_then(
            |_conn: sqlx::SqlitePool, principal: Option<Principal>| async move {
                let resp = auth::require(principal).map(|_| dto::DetailDto {
                    detail: "Token is valid".to_owned(),
                });
                build_response(resp)
            },
        )
        .boxed()
}

async fn create_account(
    conn: &sqlx::SqlitePool,
    body: dto::UserCreateDto,
) -> Result<dto::UserDto, ServiceError> {
    let (email, username, password) = body.into_validated()?;
    let password_hash = auth::hash_password(&password)?;

    let user = match user_model::insert(conn, &email, &username, &password_hash).await {
        Ok(user) => user,
        Err(DBError::SQLError(sqlx::Error::Database(db)))
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
        {
            let mut errors = ValidationErrors::default();
            errors.add("email", "user with this email address already exists.");
            return Err(errors.into());
        }
        Err(err) => return Err(err.into()),
    };

    info!(
        "Activation link for {}: /auth/activate/{}/{}",
        user.email(),
        auth::encode_uid(user.id()),
        auth::activation_token(&user)
    );

    Ok(dto::UserDto {
        id: user.id(),
        username: user.username().to_owned(),
        email: user.email().to_owned(),
    })
}

async fn activate(
    conn: &sqlx::SqlitePool,
    uidb64: &str,
    token: &str,
) -> Result<dto::StatusDto, ServiceError> {
    let id = auth::decode_uid(uidb64)?;
    let user = user_model::get(conn, id)
        .await
        .map_err(|_| AuthError::InvalidActivationLink)?;
    auth::check_activation_token(&user, token)?;
    user_model::activate(conn, user.id()).await?;

    info!("Activated account {}", user.email());
    Ok(dto::StatusDto {
        status: "Account activated".to_owned(),
    })
}

async fn issue_token(
    conn: &sqlx::SqlitePool,
    body: dto::LoginDto,
) -> Result<dto::TokenResponseDto, ServiceError> {
    let (email, password) = body.into_validated()?;
    let token = auth::issue_token(conn, &email, &password).await?;
    Ok(dto::TokenResponseDto {
        auth_token: token.key().to_owned(),
    })
}

///
/// DTO
///
pub mod dto {
    use serde::{Deserialize, Serialize};

    use crate::error::ValidationErrors;

    const MIN_PASSWORD_LEN: usize = 8;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UserCreateDto {
        pub username: Option<String>,
        pub email: Option<String>,
        pub password: Option<String>,
    }

    impl UserCreateDto {
        pub fn into_validated(self) -> Result<(String, String, String), ValidationErrors> {
            let mut errors = ValidationErrors::default();
            let email = errors.require("email", self.email);
            let username = errors.require("username", self.username);
            let password = errors.require("password", self.password);

            if email.as_deref().map_or(false, |e| !e.contains('@')) {
                errors.add("email", "Enter a valid email address.");
            }
            if password
                .as_deref()
                .map_or(false, |p| p.chars().count() < MIN_PASSWORD_LEN)
            {
                errors.add("password", "Ensure this field has at least 8 characters.");
            }

            match (email, username, password) {
                (Some(email), Some(username), Some(password)) if errors.is_empty() => {
                    Ok((email, username, password))
                }
                _ => Err(errors),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserDto {
        pub id: i64,
        pub username: String,
        pub email: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LoginDto {
        pub email: Option<String>,
        pub password: Option<String>,
    }

    impl LoginDto {
        pub fn into_validated(self) -> Result<(String, String), ValidationErrors> {
            let mut errors = ValidationErrors::default();
            let email = errors.require("email", self.email);
            let password = errors.require("password", self.password);
            match (email, password) {
                (Some(email), Some(password)) => Ok((email, password)),
                _ => Err(errors),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TokenResponseDto {
        pub auth_token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatusDto {
        pub status: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DetailDto {
        pub detail: String,
    }
}

///
/// TEST
///
#[cfg(test)]
mod test {
    use super::*;
    use crate::models::test_db_connection;
    use std::collections::BTreeMap;

    fn register_dto() -> dto::UserCreateDto {
        dto::UserCreateDto {
            username: Some("observer".to_owned()),
            email: Some("observer@example.com".to_owned()),
            password: Some("correct horse battery".to_owned()),
        }
    }

    async fn register(conn: &sqlx::SqlitePool) -> dto::UserDto {
        create_account(conn, register_dto()).await.unwrap()
    }

    #[tokio::test]
    async fn test_rest_register_activate_login_logout() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);

        let res = warp::test::request()
            .path("/auth/users")
            .method("POST")
            .json(&register_dto())
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 201);
        let user: dto::UserDto = serde_json::from_slice(res.body()).unwrap();
        assert_eq!("observer@example.com", user.email);

        // Login before activation fails
        let login = dto::LoginDto {
            email: Some(user.email.clone()),
            password: Some("correct horse battery".to_owned()),
        };
        let res = warp::test::request()
            .path("/auth/token/login")
            .method("POST")
            .json(&login)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 400);

        // Activate through the signed link
        let dao = user_model::get(&conn, user.id).await.unwrap();
        let res = warp::test::request()
            .path(&format!(
                "/auth/activate/{}/{}",
                auth::encode_uid(dao.id()),
                auth::activation_token(&dao)
            ))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 200);

        // Login now issues a token
        let res = warp::test::request()
            .path("/auth/token/login")
            .method("POST")
            .json(&login)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 200);
        let token: dto::TokenResponseDto = serde_json::from_slice(res.body()).unwrap();

        // Token verifies
        let res = warp::test::request()
            .path("/auth/token/verify")
            .header("authorization", format!("Token {}", token.auth_token))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 200);

        // Logout revokes it
        let res = warp::test::request()
            .path("/auth/token/logout")
            .method("POST")
            .header("authorization", format!("Token {}", token.auth_token))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 204);

        let res = warp::test::request()
            .path("/auth/token/verify")
            .header("authorization", format!("Token {}", token.auth_token))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 401);
    }

    #[tokio::test]
    async fn test_rest_register_duplicate_email() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        register(&conn).await;

        // Execute
        let res = warp::test::request()
            .path("/auth/users")
            .method("POST")
            .json(&register_dto())
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 400);
        let errors: BTreeMap<String, Vec<String>> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(
            errors["email"],
            vec!["user with this email address already exists."]
        );
    }

    #[tokio::test]
    async fn test_rest_register_weak_password() {
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let mut dto = register_dto();
        dto.password = Some("short".to_owned());

        let res = warp::test::request()
            .path("/auth/users")
            .method("POST")
            .json(&dto)
            .reply(&routes)
            .await;

        assert_eq!(res.status(), 400);
        let errors: BTreeMap<String, Vec<String>> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(
            errors["password"],
            vec!["Ensure this field has at least 8 characters."]
        );
    }

    #[tokio::test]
    async fn test_rest_activation_link_invalid() {
        // Prepare
        let conn = test_db_connection().await;
        let routes = routes(&conn);
        let user = register(&conn).await;

        // Execute - tampered token
        let res = warp::test::request()
            .path(&format!(
                "/auth/activate/{}/{}",
                auth::encode_uid(user.id),
                "bogus-token"
            ))
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 400);
        let dao = user_model::get(&conn, user.id).await.unwrap();
        assert!(!dao.is_active());
    }

    #[tokio::test]
    async fn test_rest_verify_without_token() {
        let conn = test_db_connection().await;
        let routes = routes(&conn);

        let res = warp::test::request()
            .path("/auth/token/verify")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 401);

        let res = warp::test::request()
            .path("/auth/token/verify")
            .header("authorization", "Token garbage")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 401);
    }
}
