// src/database/models.rs
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct VesselRow {
    pub mmsi: Option<i32>,
    pub imo: Option<i32>,
    pub name: Option<String>,
    pub country: Option<String>,
    pub ship_type: Option<String>,
    pub gt: Option<f64>,
    pub built: Option<i32>,
    pub length: Option<f64>,
    pub width: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PositionRow {
    pub mmsi: Option<i32>,
    pub imo: Option<i32>,
    pub date: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
}

pub(super) const VESSEL_COLUMNS: &str =
    "mmsi, imo, name, country, ship_type, gt, built, length, width";

pub(super) const POSITION_COLUMNS: &str = "mmsi, imo, date, latitude, longitude, speed";
