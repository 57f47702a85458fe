// src/database/postgres.rs
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, error, info};

use super::{
    models::{PositionRow, VesselRow, POSITION_COLUMNS, VESSEL_COLUMNS},
    UpsertOutcome, VesselStore,
};
use crate::{
    config::PostgresConfig,
    errors::CrawlerError,
    models::{PositionRecord, VesselKey, VesselRecord},
};

/// PostgreSQL replica, optionally with PostGIS geometries
pub struct PostgresStore {
    pool: PgPool,
    vessels: String,
    positions: String,
    schema: Option<String>,
    postgis: bool,
}

impl PostgresStore {
    /// Connect and make sure the tables exist
    pub async fn connect(config: &PostgresConfig) -> Result<Self, CrawlerError> {
        info!(
            "Connecting to PostgreSQL: schema={}, postgis={}",
            config.schema.as_deref().unwrap_or("<search path>"),
            config.postgis
        );

        // One long-lived connection, reused for every write
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&config.url)
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                CrawlerError::DatabaseConnectionError(e.to_string())
            })?;

        Self::new(pool, config).await
    }

    /// Wrap an existing pool
    pub async fn new(pool: PgPool, config: &PostgresConfig) -> Result<Self, CrawlerError> {
        let store = Self {
            pool,
            vessels: config.table("vessels"),
            positions: config.table("positions"),
            schema: config.schema.clone(),
            postgis: config.postgis,
        };
        store.create_tables_indices().await?;
        Ok(store)
    }

    /// Create tables `vessels` and `positions` with indices on the key columns
    async fn create_tables_indices(&self) -> Result<(), CrawlerError> {
        if let Some(schema) = &self.schema {
            self.execute_ddl(schema, &format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
                .await?;
        }

        let statements = [
            (
                "vessels",
                format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        idx SERIAL PRIMARY KEY,
                        mmsi INTEGER,
                        imo INTEGER,
                        name TEXT,
                        ship_type TEXT,
                        gt DOUBLE PRECISION,
                        built INTEGER,
                        length DOUBLE PRECISION,
                        width DOUBLE PRECISION,
                        country TEXT
                    )",
                    self.vessels
                ),
            ),
            (
                "positions",
                format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        idx SERIAL PRIMARY KEY,
                        mmsi INTEGER,
                        imo INTEGER,
                        date TIMESTAMPTZ,
                        latitude DOUBLE PRECISION,
                        longitude DOUBLE PRECISION,
                        speed DOUBLE PRECISION
                    )",
                    self.positions
                ),
            ),
            (
                "idx_vessels_mmsi",
                format!("CREATE INDEX IF NOT EXISTS idx_vessels_mmsi ON {} (mmsi)", self.vessels),
            ),
            (
                "idx_vessels_imo",
                format!("CREATE INDEX IF NOT EXISTS idx_vessels_imo ON {} (imo)", self.vessels),
            ),
            (
                "idx_positions_mmsi_date",
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_positions_mmsi_date ON {} (mmsi, date)",
                    self.positions
                ),
            ),
            (
                "idx_positions_imo_date",
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_positions_imo_date ON {} (imo, date)",
                    self.positions
                ),
            ),
        ];

        for (table, sql) in statements {
            self.execute_ddl(table, &sql).await?;
        }

        if self.postgis {
            self.execute_ddl("postgis", "CREATE EXTENSION IF NOT EXISTS postgis")
                .await?;
            self.execute_ddl(
                "positions.geom",
                &format!(
                    "ALTER TABLE {} ADD COLUMN IF NOT EXISTS geom geometry(Point, 4326)",
                    self.positions
                ),
            )
            .await?;
            self.execute_ddl(
                "idx_positions_geom",
                &format!(
                    "CREATE INDEX IF NOT EXISTS idx_positions_geom ON {} USING gist (geom)",
                    self.positions
                ),
            )
            .await?;
        }

        Ok(())
    }

    async fn execute_ddl(&self, table: &str, sql: &str) -> Result<(), CrawlerError> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| CrawlerError::TableCreationError {
                table: table.to_string(),
                origin: e.to_string(),
            })?;
        Ok(())
    }

    /// Registry rows stored under `key`
    pub async fn fetch_vessels(&self, key: VesselKey) -> Result<Vec<VesselRow>, CrawlerError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY idx",
            VESSEL_COLUMNS,
            self.vessels,
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
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY date NULLS FIRST, idx",
            POSITION_COLUMNS,
            self.positions,
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
impl VesselStore for PostgresStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn upsert_vessel(&self, vessel: &VesselRecord) -> Result<UpsertOutcome, CrawlerError> {
        let key = vessel.identity.key();
        let mut tx = self.pool.begin().await?;

        let mut found: Option<i32> = sqlx::query_scalar(&format!(
            "SELECT idx FROM {} WHERE {} = $1 ORDER BY idx LIMIT 1",
            self.vessels,
            key.column()
        ))
        .bind(key.value())
        .fetch_optional(&mut *tx)
        .await?;

        if let (None, Some(fallback)) = (found, vessel.identity.fallback_key()) {
            found = sqlx::query_scalar(&format!(
                "SELECT idx FROM {} WHERE {} = $1 AND mmsi IS NULL ORDER BY idx LIMIT 1",
                self.vessels,
                fallback.column()
            ))
            .bind(fallback.value())
            .fetch_optional(&mut *tx)
            .await?;
        }

        let (sql, outcome) = match found {
            Some(_) => (
                format!(
                    "UPDATE {} SET mmsi = $1, imo = $2, name = $3, country = $4, ship_type = $5,
                        gt = $6, built = $7, length = $8, width = $9
                    WHERE idx = $10",
                    self.vessels
                ),
                UpsertOutcome::Updated,
            ),
            None => (
                format!(
                    "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                    self.vessels, VESSEL_COLUMNS
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
        debug!("Vessel {} {} in postgres", key, outcome);
        Ok(outcome)
    }

    async fn upsert_position(&self, position: &PositionRecord) -> Result<(), CrawlerError> {
        let key = position.identity.key();
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "DELETE FROM {} WHERE date IS NOT DISTINCT FROM $1 AND {} = $2",
            self.positions,
            key.column()
        ))
        .bind(position.date)
        .bind(key.value())
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6)",
            self.positions, POSITION_COLUMNS
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

    /// Fill in geometries for positions written since the last sweep
    async fn maintain(&self) -> Result<(), CrawlerError> {
        if !self.postgis {
            return Ok(());
        }

        let result = sqlx::query(&format!(
            "UPDATE {} SET geom = ST_SetSRID(ST_MakePoint(longitude, latitude), 4326)
            WHERE geom IS NULL AND latitude IS NOT NULL AND longitude IS NOT NULL",
            self.positions
        ))
        .execute(&self.pool)
        .await?;

        debug!("Created {} position geometries", result.rows_affected());
        Ok(())
    }
}
