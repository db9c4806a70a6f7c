use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV deserialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Batch already loaded: {0}")]
    BatchAlreadyLoaded(String),

    #[error("Load cancelled before completion")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, LoaderError>;
