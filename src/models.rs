//! Data models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::CrawlerError;

/// Maritime Mobile Service Identity (MMSI)
///
/// A unique nine-digit number for identifying vessels in AIS messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Mmsi(u32);

impl TryFrom<u32> for Mmsi {
    type Error = CrawlerError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value == 0 || value > 999_999_999 {
            return Err(CrawlerError::InvalidMmsi(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Mmsi {
    type Error = CrawlerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parsed = value
            .trim()
            .parse::<u32>()
            .map_err(|_| CrawlerError::InvalidMmsi(value.to_string()))?;
        Self::try_from(parsed)
    }
}

impl Mmsi {
    /// Get the raw MMSI value
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// International Maritime Organization (IMO) ship number
///
/// Seven digits, permanent for the lifetime of the hull. The source page
/// shows `0` for vessels without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Imo(u32);

impl TryFrom<u32> for Imo {
    type Error = CrawlerError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value == 0 || value > 9_999_999 {
            return Err(CrawlerError::InvalidImo(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Imo {
    type Error = CrawlerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parsed = value
            .trim()
            .parse::<u32>()
            .map_err(|_| CrawlerError::InvalidImo(value.to_string()))?;
        Self::try_from(parsed)
    }
}

impl Imo {
    /// Get the raw IMO value
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Column a vessel is looked up by in both tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VesselKey {
    Mmsi(Mmsi),
    Imo(Imo),
}

impl VesselKey {
    pub fn column(&self) -> &'static str {
        match self {
            VesselKey::Mmsi(_) => "mmsi",
            VesselKey::Imo(_) => "imo",
        }
    }

    /// Value as stored in the `integer` columns
    pub fn value(&self) -> i32 {
        // Both identifiers are range-checked well below i32::MAX
        match self {
            VesselKey::Mmsi(mmsi) => mmsi.value() as i32,
            VesselKey::Imo(imo) => imo.value() as i32,
        }
    }
}

impl fmt::Display for VesselKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.column(), self.value())
    }
}

/// Vessel identity, at least one of MMSI and IMO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Mmsi(Mmsi),
    Imo(Imo),
    Both { mmsi: Mmsi, imo: Imo },
}

impl Identity {
    pub fn new(mmsi: Option<Mmsi>, imo: Option<Imo>) -> Option<Self> {
        match (mmsi, imo) {
            (Some(mmsi), Some(imo)) => Some(Identity::Both { mmsi, imo }),
            (Some(mmsi), None) => Some(Identity::Mmsi(mmsi)),
            (None, Some(imo)) => Some(Identity::Imo(imo)),
            (None, None) => None,
        }
    }

    pub fn mmsi(&self) -> Option<Mmsi> {
        match self {
            Identity::Mmsi(mmsi) | Identity::Both { mmsi, .. } => Some(*mmsi),
            Identity::Imo(_) => None,
        }
    }

    pub fn imo(&self) -> Option<Imo> {
        match self {
            Identity::Imo(imo) | Identity::Both { imo, .. } => Some(*imo),
            Identity::Mmsi(_) => None,
        }
    }

    /// Lookup key: MMSI when known, IMO otherwise.
    ///
    /// Used for the registry lookup and the position delete alike.
    pub fn key(&self) -> VesselKey {
        match self {
            Identity::Mmsi(mmsi) | Identity::Both { mmsi, .. } => VesselKey::Mmsi(*mmsi),
            Identity::Imo(imo) => VesselKey::Imo(*imo),
        }
    }

    /// Registry key for rows written before the MMSI was known.
    ///
    /// Only a full identity has one: its IMO, matched against rows whose
    /// `mmsi` is still null.
    pub fn fallback_key(&self) -> Option<VesselKey> {
        match self {
            Identity::Both { imo, .. } => Some(VesselKey::Imo(*imo)),
            Identity::Mmsi(_) | Identity::Imo(_) => None,
        }
    }

    pub fn mmsi_column(&self) -> Option<i32> {
        self.mmsi().map(|m| m.value() as i32)
    }

    pub fn imo_column(&self) -> Option<i32> {
        self.imo().map(|i| i.value() as i32)
    }
}

/// Flat record extracted from one vessel detail page
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct VesselReport {
    pub url: String,
    pub name: Option<String>,
    /// Time of the last position report
    pub date: Option<DateTime<Utc>>,
    pub ship_type: Option<String>,
    /// Flag state
    pub country: Option<String>,
    /// Latitude in decimal degrees, negative south
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees, negative west
    pub longitude: Option<f64>,
    /// Speed over ground in knots
    pub speed: Option<f64>,
    pub imo: Option<Imo>,
    pub mmsi: Option<Mmsi>,
    /// Year of build
    pub built: Option<i32>,
    /// Length overall in metres
    pub length: Option<f64>,
    /// Beam in metres
    pub width: Option<f64>,
    /// Gross tonnage
    pub gt: Option<f64>,
}

impl VesselReport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        Identity::new(self.mmsi, self.imo)
    }

    fn require_identity(&self) -> Result<Identity, CrawlerError> {
        self.identity()
            .ok_or_else(|| CrawlerError::MissingIdentity {
                url: self.url.clone(),
            })
    }
}

/// Registry entry, one per vessel
#[derive(Debug, Clone, PartialEq)]
pub struct VesselRecord {
    pub identity: Identity,
    pub name: Option<String>,
    pub country: Option<String>,
    pub ship_type: Option<String>,
    pub gt: Option<f64>,
    pub built: Option<i32>,
    pub length: Option<f64>,
    pub width: Option<f64>,
}

impl VesselRecord {
    /// Record with identity only, every other column null
    pub fn bare(identity: Identity) -> Self {
        Self {
            identity,
            name: None,
            country: None,
            ship_type: None,
            gt: None,
            built: None,
            length: None,
            width: None,
        }
    }
}

impl TryFrom<&VesselReport> for VesselRecord {
    type Error = CrawlerError;

    fn try_from(report: &VesselReport) -> Result<Self, Self::Error> {
        Ok(Self {
            identity: report.require_identity()?,
            name: report.name.clone(),
            country: report.country.clone(),
            ship_type: report.ship_type.clone(),
            gt: report.gt,
            built: report.built,
            length: report.length,
            width: report.width,
        })
    }
}

/// Position log entry, unique per vessel and report time
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub identity: Identity,
    pub date: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
}

impl TryFrom<&VesselReport> for PositionRecord {
    type Error = CrawlerError;

    fn try_from(report: &VesselReport) -> Result<Self, Self::Error> {
        Ok(Self {
            identity: report.require_identity()?,
            date: report.date,
            latitude: report.latitude,
            longitude: report.longitude,
            speed: report.speed,
        })
    }
}
