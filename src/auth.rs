use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use warp::Filter;

use crate::config::CONFIG;
use crate::error::{AuthError, ServiceError};
use crate::models::token::{self as token_model, TokenDao};
use crate::models::user::{self as user_model, UserDao};

/// An authenticated identity, resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
    pub token_key: String,
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hash(err.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn generate_token_key() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn encode_uid(id: i64) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

pub fn decode_uid(uidb64: &str) -> Result<i64, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(uidb64)
        .map_err(|_| AuthError::InvalidActivationLink)?;
    String::from_utf8(bytes)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .ok_or(AuthError::InvalidActivationLink)
}

/// Signs the user's current activation state, so outstanding links die
/// once the account is activated or the password changes.
pub fn activation_token(user: &UserDao) -> String {
    let mut hasher = Sha256::new();
    hasher.update(CONFIG.secret_key().as_bytes());
    hasher.update(user.id().to_le_bytes());
    hasher.update(user.password_hash().as_bytes());
    hasher.update([user.is_active() as u8]);
    URL_SAFE_NO_PAD.encode(&hasher.finalize()[..20])
}

pub fn check_activation_token(user: &UserDao, token: &str) -> Result<(), AuthError> {
    if activation_token(user) == token {
        Ok(())
    } else {
        Err(AuthError::InvalidActivationLink)
    }
}

/// `authenticate(token) -> principal`: resolves an `Authorization: Token <key>`
/// header against the token store.
pub async fn authenticate(
    conn: &sqlx::SqlitePool,
    header: &str,
) -> Result<Principal, AuthError> {
    let key = header
        .strip_prefix("Token ")
        .ok_or(AuthError::InvalidToken)?;
    let token = token_model::get(conn, key)
        .await
        .map_err(|_| AuthError::InvalidToken)?
        .ok_or(AuthError::InvalidToken)?;
    let user = user_model::get(conn, token.user_id())
        .await
        .map_err(|_| AuthError::InvalidToken)?;
    if !user.is_active() {
        return Err(AuthError::InvalidToken);
    }
    Ok(Principal {
        user_id: user.id(),
        email: user.email().to_owned(),
        token_key: token.key().to_owned(),
    })
}

/// `issue_token(credentials) -> token`: one error for unknown email, wrong
/// password and inactive account alike.
pub async fn issue_token(
    conn: &sqlx::SqlitePool,
    email: &str,
    password: &str,
) -> Result<TokenDao, ServiceError> {
    let user = user_model::get_by_email(conn, email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if !user.is_active() || !verify_password(password, user.password_hash()) {
        return Err(AuthError::InvalidCredentials.into());
    }
    Ok(token_model::insert(conn, &generate_token_key(), user.id()).await?)
}

pub async fn revoke_token(conn: &sqlx::SqlitePool, principal: &Principal) -> Result<(), ServiceError> {
    token_model::delete(conn, &principal.token_key).await?;
    Ok(())
}

/// Extracts the optional principal from the Authorization header.
/// An invalid or unknown token degrades to an anonymous request.
pub fn principal(
    conn: sqlx::SqlitePool,
) -> impl Filter<Extract = (Option<Principal>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let conn = conn.clone();
        async move {
            let principal = match header {
                Some(header) => authenticate(&conn, &header).await.ok(),
                None => None,
            };
            Ok::<_, warp::Rejection>(principal)
        }
    })
}

/// Gate for mutating resource endpoints, controlled by `REQUIRE_AUTH`.
pub fn enforce_write(principal: &Option<Principal>) -> Result<(), ServiceError> {
    check_write_access(CONFIG.require_auth(), principal)
}

fn check_write_access(
    require_auth: bool,
    principal: &Option<Principal>,
) -> Result<(), ServiceError> {
    if require_auth && principal.is_none() {
        return Err(AuthError::MissingCredentials.into());
    }
    Ok(())
}

pub fn require(principal: Option<Principal>) -> Result<Principal, ServiceError> {
    principal.ok_or_else(|| AuthError::MissingCredentials.into())
}
