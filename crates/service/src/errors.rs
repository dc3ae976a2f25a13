use std::time::Duration;

use thiserror::Error;

use crate::domain::AuthorId;

/// Failures surfaced by every [`Storage`](crate::storage::Storage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },
    #[error("author {0} does not exist")]
    UnknownAuthor(AuthorId),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StorageError {
    pub fn post_not_found(id: i32) -> Self { Self::NotFound { entity: "post", id } }
    pub fn author_not_found(id: i32) -> Self { Self::NotFound { entity: "author", id } }
}

impl From<models::errors::ModelError> for StorageError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::Config(e) => Self::Configuration(e.to_string()),
            models::errors::ModelError::Db(e) => Self::Connection(e.to_string()),
        }
    }
}
