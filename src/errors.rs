//! Errors for vessel crawler
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlerError {
    #[error("HTTP request failed")]
    HttpError(#[from] reqwest::Error),

    #[error("Download of {url} failed after {attempts} attempts")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Serialization error")]
    SerdeError(#[from] serde_json::Error),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    ConfigurationError { message: String },

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Invalid MMSI")]
    InvalidMmsi(String),

    #[error("Invalid IMO")]
    InvalidImo(String),

    #[error("Vessel report has neither MMSI nor IMO: {url}")]
    MissingIdentity { url: String },

    #[error("Database connection error: {0}")]
    DatabaseConnectionError(String),

    #[error("Failed to create {table}: {origin}")]
    TableCreationError { table: String, origin: String },

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),
}
