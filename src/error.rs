use serde::Serialize;
use std::collections::BTreeMap;
use std::error;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DBError {
    #[error(transparent)]
    SQLError(#[from] sqlx::Error),
    #[error("Did not find {0} record: {1}")]
    RecordNotFound(&'static str, i64),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Authentication credentials were not provided")]
    MissingCredentials,
    #[error("Unable to log in with provided credentials")]
    InvalidCredentials,
    #[error("Activation link is invalid")]
    InvalidActivationLink,
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// Per-field error messages, serialized as a flat `field -> [messages]` map.
#[derive(Debug, Default, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.to_owned());
    }

    /// Records a "required" error if `value` is missing, passing it through otherwise.
    pub fn require<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.add(field, "This field is required.");
        }
        value
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(|k| k.as_str()).collect();
        write!(f, "Invalid fields: {}", fields.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    User(String),
    #[error(transparent)]
    Internal(Box<dyn error::Error + Send + Sync>),
}

impl From<DBError> for ServiceError {
    fn from(err: DBError) -> Self {
        match err {
            DBError::RecordNotFound(_, _) => ServiceError::NotFound(err.to_string()),
            DBError::SQLError(_) => ServiceError::Internal(Box::from(err)),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken | AuthError::MissingCredentials => {
                ServiceError::Unauthenticated(err.to_string())
            }
            AuthError::InvalidCredentials | AuthError::InvalidActivationLink => {
                ServiceError::User(err.to_string())
            }
            AuthError::Hash(_) => ServiceError::Internal(Box::from(err)),
        }
    }
}
