// src/database.rs
//! Vessel registry and position log storage
//!
//! The same records are written to every configured store. Stores are
//! independent replicas: there is no transaction spanning them.

mod models;
mod postgres;
mod sqlite;

use std::fmt;

use async_trait::async_trait;

use crate::{
    errors::CrawlerError,
    models::{PositionRecord, VesselRecord},
};

pub use models::{PositionRow, VesselRow};
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// What a registry upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertOutcome::Inserted => write!(f, "inserted"),
            UpsertOutcome::Updated => write!(f, "updated"),
        }
    }
}

/// Destination for vessel and position records
#[async_trait]
pub trait VesselStore: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Insert the vessel, or overwrite every non-key column of the row with
    /// the same key.
    async fn upsert_vessel(&self, vessel: &VesselRecord) -> Result<UpsertOutcome, CrawlerError>;

    /// Replace any position with the same key and report time.
    async fn upsert_position(&self, position: &PositionRecord) -> Result<(), CrawlerError>;

    /// Housekeeping after a full sweep
    async fn maintain(&self) -> Result<(), CrawlerError> {
        Ok(())
    }
}
