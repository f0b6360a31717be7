use crate::forms::FormErrors;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for datastore-ext
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[cfg(feature = "redis")]
    #[error("Redis pool error: {0}")]
    RedisPool(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Session cache error: {0}")]
    Cache(String),

    #[error("Conversion not implemented for property type: {0}")]
    NotImplemented(String),

    #[error("Form validation failed: {0}")]
    InvalidForm(FormErrors),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::CreatePoolError> for Error {
    fn from(err: deadpool_redis::CreatePoolError) -> Self {
        Self::RedisPool(format!("Pool creation error: {}", err))
    }
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::PoolError> for Error {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::RedisPool(format!("Pool error: {}", err))
    }
}

impl From<FormErrors> for Error {
    fn from(errors: FormErrors) -> Self {
        Self::InvalidForm(errors)
    }
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    pub fn not_implemented(property_type: impl Into<String>) -> Self {
        Self::NotImplemented(property_type.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if the error came from a backend (store or cache) rather than from caller input
    pub fn is_backend(&self) -> bool {
        match self {
            Error::Database(_) | Error::Storage(_) | Error::Cache(_) => true,
            #[cfg(feature = "redis")]
            Error::Redis(_) | Error::RedisPool(_) => true,
            _ => false,
        }
    }

    /// Get a stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Json(_) => "E_JSON",
            Error::Database(_) => "E_DATABASE",
            #[cfg(feature = "redis")]
            Error::Redis(_) => "E_REDIS",
            #[cfg(feature = "redis")]
            Error::RedisPool(_) => "E_REDIS_POOL",
            Error::Config(_) => "E_CONFIG",
            Error::Storage(_) => "E_STORAGE",
            Error::Cache(_) => "E_CACHE",
            Error::NotImplemented(_) => "E_NOT_IMPLEMENTED",
            Error::InvalidForm(_) => "E_INVALID_FORM",
            Error::Internal(_) => "E_INTERNAL",
        }
    }
}
