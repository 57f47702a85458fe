use std::env;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::postgres::PgPoolOptions;
use tempfile::{tempdir, TempDir};

use vessel_crawler::{
    config::{PostgresConfig, SqliteConfig},
    database::{PostgresStore, SqliteStore, UpsertOutcome, VesselStore},
    errors::CrawlerError,
    models::{Identity, Imo, Mmsi, PositionRecord, VesselRecord},
};

async fn setup_sqlite() -> Result<(TempDir, SqliteStore), CrawlerError> {
    let temp_dir = tempdir()?;
    let config = SqliteConfig {
        path: temp_dir.path().join("vessels.sqlite"),
    };
    let store = SqliteStore::connect(&config).await?;
    Ok((temp_dir, store))
}

fn imo(value: u32) -> Imo {
    Imo::try_from(value).unwrap()
}

fn mmsi(value: u32) -> Mmsi {
    Mmsi::try_from(value).unwrap()
}

fn report_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 5, 13, 7, 0).unwrap()
}

fn position(identity: Identity, date: Option<DateTime<Utc>>, speed: f64) -> PositionRecord {
    PositionRecord {
        identity,
        date,
        latitude: Some(34.4035),
        longitude: Some(-119.69068),
        speed: Some(speed),
    }
}

#[tokio::test]
async fn test_vessel_upsert_updates_by_imo() -> Result<(), CrawlerError> {
    let (_temp_dir, store) = setup_sqlite().await?;
    let identity = Identity::new(None, Some(imo(123))).unwrap();

    let first = VesselRecord {
        name: Some("FIRST NAME".to_string()),
        ..VesselRecord::bare(identity)
    };
    let second = VesselRecord {
        name: Some("SECOND NAME".to_string()),
        ..VesselRecord::bare(identity)
    };

    assert_eq!(store.upsert_vessel(&first).await?, UpsertOutcome::Inserted);
    assert_eq!(store.upsert_vessel(&second).await?, UpsertOutcome::Updated);

    let rows = store.fetch_vessels(identity.key()).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name.as_deref(), Some("SECOND NAME"));
    assert_eq!(rows[0].imo, Some(123));
    Ok(())
}

#[tokio::test]
async fn test_vessel_upsert_overwrites_every_field() -> Result<(), CrawlerError> {
    let (_temp_dir, store) = setup_sqlite().await?;
    let identity = Identity::new(Some(mmsi(367_568_350)), None).unwrap();

    let full = VesselRecord {
        name: Some("CONDOR EXPRESS".to_string()),
        country: Some("USA".to_string()),
        ship_type: Some("Passenger Ship".to_string()),
        gt: Some(97.0),
        built: Some(2001),
        length: Some(23.0),
        width: Some(9.0),
        ..VesselRecord::bare(identity)
    };
    store.upsert_vessel(&full).await?;

    // A later sighting with the IMO now known and fewer fields
    let later_identity = Identity::new(Some(mmsi(367_568_350)), Some(imo(9_387_421))).unwrap();
    let later = VesselRecord {
        name: Some("CONDOR EXPRESS".to_string()),
        ..VesselRecord::bare(later_identity)
    };
    store.upsert_vessel(&later).await?;

    let rows = store.fetch_vessels(identity.key()).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].imo, Some(9_387_421));
    assert_eq!(rows[0].gt, None);
    assert_eq!(rows[0].built, None);
    assert_eq!(rows[0].country, None);
    Ok(())
}

#[tokio::test]
async fn test_vessel_upsert_adopts_imo_only_row() -> Result<(), CrawlerError> {
    let (_temp_dir, store) = setup_sqlite().await?;

    // Legacy layout shows only the IMO number
    let imo_only = Identity::new(None, Some(imo(9_387_421))).unwrap();
    let old = VesselRecord {
        name: Some("OLD NAME".to_string()),
        ..VesselRecord::bare(imo_only)
    };
    assert_eq!(store.upsert_vessel(&old).await?, UpsertOutcome::Inserted);

    let both = Identity::new(Some(mmsi(367_568_350)), Some(imo(9_387_421))).unwrap();
    let new = VesselRecord {
        name: Some("NEW NAME".to_string()),
        ..VesselRecord::bare(both)
    };
    assert_eq!(store.upsert_vessel(&new).await?, UpsertOutcome::Updated);
    assert_eq!(store.upsert_vessel(&new).await?, UpsertOutcome::Updated);

    let rows = store.fetch_vessels(imo_only.key()).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].mmsi, Some(367_568_350));
    assert_eq!(rows[0].name.as_deref(), Some("NEW NAME"));
    Ok(())
}

#[tokio::test]
async fn test_vessel_upsert_keeps_rows_with_other_mmsi() -> Result<(), CrawlerError> {
    let (_temp_dir, store) = setup_sqlite().await?;
    let first = Identity::new(Some(mmsi(367_568_350)), Some(imo(9_387_421))).unwrap();
    let second = Identity::new(Some(mmsi(230_123_456)), Some(imo(9_387_421))).unwrap();

    store.upsert_vessel(&VesselRecord::bare(first)).await?;
    assert_eq!(
        store.upsert_vessel(&VesselRecord::bare(second)).await?,
        UpsertOutcome::Inserted
    );

    assert_eq!(store.fetch_vessels(first.key()).await?.len(), 1);
    assert_eq!(store.fetch_vessels(second.key()).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_vessel_identity_only_insert() -> Result<(), CrawlerError> {
    let (_temp_dir, store) = setup_sqlite().await?;
    let identity = Identity::new(Some(mmsi(230_123_456)), None).unwrap();

    store.upsert_vessel(&VesselRecord::bare(identity)).await?;

    let rows = store.fetch_vessels(identity.key()).await?;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.mmsi, Some(230_123_456));
    assert_eq!(row.imo, None);
    assert_eq!(row.name, None);
    assert_eq!(row.length, None);
    assert_eq!(row.width, None);
    Ok(())
}

#[tokio::test]
async fn test_position_upsert_replaces_same_date() -> Result<(), CrawlerError> {
    let (_temp_dir, store) = setup_sqlite().await?;
    let identity = Identity::new(Some(mmsi(367_568_350)), None).unwrap();

    store
        .upsert_position(&position(identity, Some(report_time()), 9.1))
        .await?;
    store
        .upsert_position(&position(identity, Some(report_time()), 11.4))
        .await?;

    let rows = store.fetch_positions(identity.key()).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].speed, Some(11.4));
    assert_eq!(rows[0].date, Some(report_time()));
    Ok(())
}

#[tokio::test]
async fn test_position_upsert_keeps_other_dates() -> Result<(), CrawlerError> {
    let (_temp_dir, store) = setup_sqlite().await?;
    let identity = Identity::new(Some(mmsi(367_568_350)), None).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 1, 5, 13, 17, 0).unwrap();

    store
        .upsert_position(&position(identity, Some(report_time()), 9.1))
        .await?;
    store
        .upsert_position(&position(identity, Some(later), 9.8))
        .await?;

    let rows = store.fetch_positions(identity.key()).await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].speed, Some(9.1));
    assert_eq!(rows[1].speed, Some(9.8));
    Ok(())
}

#[tokio::test]
async fn test_position_upsert_null_date_replaces_null_date() -> Result<(), CrawlerError> {
    let (_temp_dir, store) = setup_sqlite().await?;
    let identity = Identity::new(None, Some(imo(9_387_421))).unwrap();

    store.upsert_position(&position(identity, None, 1.0)).await?;
    store.upsert_position(&position(identity, None, 2.0)).await?;

    let rows = store.fetch_positions(identity.key()).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].speed, Some(2.0));
    assert_eq!(rows[0].date, None);
    Ok(())
}

#[tokio::test]
async fn test_position_keys_are_separate() -> Result<(), CrawlerError> {
    let (_temp_dir, store) = setup_sqlite().await?;
    let first = Identity::new(Some(mmsi(367_568_350)), None).unwrap();
    let second = Identity::new(Some(mmsi(230_123_456)), None).unwrap();

    store
        .upsert_position(&position(first, Some(report_time()), 9.1))
        .await?;
    store
        .upsert_position(&position(second, Some(report_time()), 4.2))
        .await?;

    assert_eq!(store.fetch_positions(first.key()).await?.len(), 1);
    assert_eq!(store.fetch_positions(second.key()).await?.len(), 1);
    Ok(())
}

async fn setup_postgres() -> PostgresStore {
    setup_postgres_in(None).await
}

async fn setup_postgres_in(schema: Option<&str>) -> PostgresStore {
    dotenvy::dotenv().ok();
    let database_url =
        env::var("DATABASE_URL").expect("Environment variable DATABASE_URL required");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let config = PostgresConfig {
        url: database_url,
        schema: schema.map(str::to_string),
        postgis: false,
    };
    PostgresStore::new(pool, &config)
        .await
        .expect("Failed to create tables")
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_postgres_vessel_upsert() {
    let store = setup_postgres().await;
    let identity = Identity::new(None, Some(imo(1_234_567))).unwrap();

    let first = VesselRecord {
        name: Some("TEST VESSEL".to_string()),
        ..VesselRecord::bare(identity)
    };
    let second = VesselRecord {
        name: Some("RENAMED VESSEL".to_string()),
        ..VesselRecord::bare(identity)
    };
    store.upsert_vessel(&first).await.expect("Failed to upsert");
    store.upsert_vessel(&second).await.expect("Failed to upsert");

    let rows = store
        .fetch_vessels(identity.key())
        .await
        .expect("Failed to retrieve vessels");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name.as_deref(), Some("RENAMED VESSEL"));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_postgres_position_upsert() {
    let store = setup_postgres().await;
    let identity = Identity::new(Some(mmsi(230_999_999)), None).unwrap();

    store
        .upsert_position(&position(identity, Some(report_time()), 10.5))
        .await
        .expect("Failed to upsert");
    store
        .upsert_position(&position(identity, Some(report_time()), 12.5))
        .await
        .expect("Failed to upsert");

    let rows = store
        .fetch_positions(identity.key())
        .await
        .expect("Failed to retrieve positions");
    let matching: Vec<_> = rows
        .iter()
        .filter(|row| row.date == Some(report_time()))
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].speed, Some(12.5));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_postgres_creates_missing_schema() {
    let store = setup_postgres_in(Some("vessel_crawler_test")).await;
    let identity = Identity::new(Some(mmsi(230_888_888)), Some(imo(7_654_321))).unwrap();

    store
        .upsert_vessel(&VesselRecord::bare(identity))
        .await
        .expect("Failed to upsert");
    let rows = store
        .fetch_vessels(identity.key())
        .await
        .expect("Failed to retrieve vessels");
    assert_eq!(rows.len(), 1);
}
