use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("configuration error: {0}")]
    Config(#[from] configs::ConfigError),
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}
