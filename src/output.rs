//! Flat-file outputs: last-page cache and CSV report log

use std::path::{Path, PathBuf};

use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::debug;

use crate::{
    errors::CrawlerError,
    models::{VesselKey, VesselReport},
};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keeps the raw HTML of the most recent available page, for diagnostics
#[derive(Debug, Clone)]
pub struct PageCache {
    path: PathBuf,
}

impl PageCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the cache with `html`
    pub async fn store(&self, html: &str) -> Result<(), CrawlerError> {
        tokio::fs::write(&self.path, html).await?;
        debug!("Cached page to {}", self.path.display());
        Ok(())
    }
}

/// Append-only CSV log, one row per persisted report
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append `report`, keyed by `key` in the first column
    pub async fn append(&self, key: VesselKey, report: &VesselReport) -> Result<(), CrawlerError> {
        let mut line = String::new();
        write_row(&mut line, &report_row(key, report));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Cells in record order, nulls as empty strings
fn report_row(key: VesselKey, report: &VesselReport) -> Vec<String> {
    fn cell<T: ToString>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    vec![
        key.value().to_string(),
        report.url.clone(),
        cell(report.name.as_deref()),
        cell(report.date.map(|d| d.format(DATE_FORMAT))),
        cell(report.ship_type.as_deref()),
        cell(report.country.as_deref()),
        cell(report.latitude),
        cell(report.longitude),
        cell(report.speed),
        cell(report.imo.map(|i| i.value())),
        cell(report.mmsi.map(|m| m.value())),
        cell(report.built),
        cell(report.length),
        cell(report.width),
        cell(report.gt),
    ]
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row(out: &mut String, row: &[String]) {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if needs_quotes(cell) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}
