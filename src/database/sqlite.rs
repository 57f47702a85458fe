// src/database/sqlite.rs
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use tracing::{debug, error, info};

use super::{
    models::{PositionRow, VesselRow, POSITION_COLUMNS, VESSEL_COLUMNS},
    UpsertOutcome, VesselStore,
};
use crate::{
    config::SqliteConfig,
    errors::CrawlerError,
    models::{PositionRecord, VesselKey, VesselRecord},
};

/// Local SQLite replica
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create the database file and make sure the tables exist
    pub async fn connect(config: &SqliteConfig) -> Result<Self, CrawlerError> {
        config.validate()?;
        info!("Opening database at {}", config.path.display());

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to open database: {}", e);
                CrawlerError::DatabaseConnectionError(e.to_string())
            })?;

        let store = Self { pool };
        store.create_tables_indices().await?;
        Ok(store)
    }

    /// Create tables `vessels` and `positions` with indices on the key columns
    async fn create_tables_indices(&self) -> Result<(), CrawlerError> {
        let statements = [
            (
                "vessels",
                "CREATE TABLE IF NOT EXISTS vessels (
                    idx INTEGER PRIMARY KEY AUTOINCREMENT,
                    mmsi INTEGER,
                    imo INTEGER,
                    name TEXT,
                    ship_type TEXT,
                    gt REAL,
                    built INTEGER,
                    length REAL,
                    width REAL,
                    country TEXT
                )",
            ),
            (
                "positions",
                "CREATE TABLE IF NOT EXISTS positions (
                    idx INTEGER PRIMARY KEY AUTOINCREMENT,
                    mmsi INTEGER,
                    imo INTEGER,
                    date DATETIME,
                    latitude REAL,
                    longitude REAL,
                    speed REAL
                )",
            ),
            (
                "idx_vessels_mmsi",
                "CREATE INDEX IF NOT EXISTS idx_vessels_mmsi ON vessels(mmsi)",
            ),
            (
                "idx_vessels_imo",
                "CREATE INDEX IF NOT EXISTS idx_vessels_imo ON vessels(imo)",
            ),
            (
                "idx_positions_mmsi_date",
                "CREATE INDEX IF NOT EXISTS idx_positions_mmsi_date ON positions(mmsi, date)",
            ),
            (
                "idx_positions_imo_date",
                "CREATE INDEX IF NOT EXISTS idx_positions_imo_date ON positions(imo, date)",
            ),
        ];

        for (table, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| CrawlerError::TableCreationError {
                    table: table.to_string(),
                    origin: e.to_string(),
                })?;
        }

        Ok(())
    }

    /// Registry rows stored under `key`
    pub async fn fetch_vessels(&self, key: VesselKey) -> Result<Vec<VesselRow>, CrawlerError> {
        let sql = format!(
            "SELECT {} FROM vessels WHERE {} = ?1 ORDER BY idx",
            VESSEL_COLUMNS,
            key.column()
        );
        let rows = sqlx::query_as::<_, VesselRow>(&sql)
            .bind(key.value())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Position rows stored under `key`, oldest report first
    pub async fn fetch_positions(&self, key: VesselKey) -> Result<Vec<PositionRow>, CrawlerError> {
        let sql = format!(
            "SELECT {} FROM positions WHERE {} = ?1 ORDER BY date, idx",
            POSITION_COLUMNS,
            key.column()
        );
        let rows = sqlx::query_as::<_, PositionRow>(&sql)
            .bind(key.value())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl VesselStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert_vessel(&self, vessel: &VesselRecord) -> Result<UpsertOutcome, CrawlerError> {
        let key = vessel.identity.key();
        let mut tx = self.pool.begin().await?;

        let mut found: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT idx FROM vessels WHERE {} = ?1 ORDER BY idx LIMIT 1",
            key.column()
        ))
        .bind(key.value())
        .fetch_optional(&mut *tx)
        .await?;

        if let (None, Some(fallback)) = (found, vessel.identity.fallback_key()) {
            found = sqlx::query_scalar(&format!(
                "SELECT idx FROM vessels WHERE {} = ?1 AND mmsi IS NULL ORDER BY idx LIMIT 1",
                fallback.column()
            ))
            .bind(fallback.value())
            .fetch_optional(&mut *tx)
            .await?;
        }

        let (sql, outcome) = match found {
            Some(_) => (
                "UPDATE vessels SET mmsi = ?1, imo = ?2, name = ?3, country = ?4, ship_type = ?5,
                    gt = ?6, built = ?7, length = ?8, width = ?9
                WHERE idx = ?10"
                    .to_string(),
                UpsertOutcome::Updated,
            ),
            None => (
                format!(
                    "INSERT INTO vessels ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    VESSEL_COLUMNS
                ),
                UpsertOutcome::Inserted,
            ),
        };

        let mut query = sqlx::query(&sql)
            .bind(vessel.identity.mmsi_column())
            .bind(vessel.identity.imo_column())
            .bind(vessel.name.as_deref())
            .bind(vessel.country.as_deref())
            .bind(vessel.ship_type.as_deref())
            .bind(vessel.gt)
            .bind(vessel.built)
            .bind(vessel.length)
            .bind(vessel.width);
        if let Some(idx) = found {
            query = query.bind(idx);
        }
        query.execute(&mut *tx).await?;

        tx.commit().await?;
        debug!("Vessel {} {} in sqlite", key, outcome);
        Ok(outcome)
    }

    async fn upsert_position(&self, position: &PositionRecord) -> Result<(), CrawlerError> {
        let key = position.identity.key();
        let mut tx = self.pool.begin().await?;

        // `IS` compares nulls as equal
        sqlx::query(&format!(
            "DELETE FROM positions WHERE date IS ?1 AND {} = ?2",
            key.column()
        ))
        .bind(position.date)
        .bind(key.value())
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO positions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            POSITION_COLUMNS
        ))
        .bind(position.identity.mmsi_column())
        .bind(position.identity.imo_column())
        .bind(position.date)
        .bind(position.latitude)
        .bind(position.longitude)
        .bind(position.speed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
