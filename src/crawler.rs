//! Fetch, extract and persist loop

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::{
    database::VesselStore,
    errors::CrawlerError,
    fetch::PageFetcher,
    models::{PositionRecord, VesselRecord, VesselReport},
    output::{CsvLog, PageCache},
    page::{PageOutcome, VesselPage},
};

/// What happened to one vessel page
#[derive(Debug, Clone, PartialEq)]
pub enum Ingest {
    /// Non-200 answer, nothing to extract
    NotFetched,
    /// The source has no current data for the vessel
    Unavailable,
    /// The report was written; `failed_stores` lists stores that rejected it
    Persisted {
        report: VesselReport,
        failed_stores: Vec<String>,
    },
}

/// Vessel crawler
pub struct Crawler {
    fetcher: PageFetcher,
    stores: Vec<Box<dyn VesselStore>>,
    cache: Option<PageCache>,
    csv: Option<CsvLog>,
    urls: Vec<String>,
    sweep_interval: Duration,
}

impl Crawler {
    /// Sweep the URL list forever, pausing between sweeps
    pub async fn run(&self) {
        loop {
            self.sweep().await;
            debug!("Sleeping {:?} until next sweep", self.sweep_interval);
            tokio::time::sleep(self.sweep_interval).await;
        }
    }

    /// Visit every URL once, in order
    pub async fn sweep(&self) {
        info!("Starting sweep of {} vessels", self.urls.len());
        for url in &self.urls {
            if let Err(e) = self.visit(url).await {
                error!("Failed to process {}: {}", url, e);
            }
        }

        for store in &self.stores {
            if let Err(e) = store.maintain().await {
                error!("Maintenance of {} store failed: {}", store.name(), e);
            }
        }
    }

    /// Fetch and ingest a single vessel page
    pub async fn visit(&self, url: &str) -> Result<Ingest, CrawlerError> {
        match self.fetcher.fetch(url).await? {
            Some(html) => self.ingest(url, &html).await,
            None => Ok(Ingest::NotFetched),
        }
    }

    /// Extract a downloaded page and write it to every output
    pub async fn ingest(&self, url: &str, html: &str) -> Result<Ingest, CrawlerError> {
        let report = match VesselPage::parse(html).extract(url) {
            PageOutcome::Report(report) => report,
            PageOutcome::Unavailable => {
                info!("Vessel temporarily not in source database: {}", url);
                return Ok(Ingest::Unavailable);
            }
        };

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(html).await {
                warn!("Could not cache page to {}: {}", cache.path().display(), e);
            }
        }

        info!(
            "Vessel Name: {} - url: {}",
            report.name.as_deref().unwrap_or("<unknown>"),
            report.url
        );

        let failed_stores = self.persist(&report).await?;
        Ok(Ingest::Persisted {
            report,
            failed_stores,
        })
    }

    /// Apply the report to every store, then to the CSV log.
    ///
    /// The position log and the registry are written independently. A
    /// failing write is logged and skipped, the other stores still get the
    /// report. Returns the names of the stores with at least one failed write.
    async fn persist(&self, report: &VesselReport) -> Result<Vec<String>, CrawlerError> {
        let vessel = VesselRecord::try_from(report)?;
        let position = PositionRecord::try_from(report)?;

        let mut failed = Vec::new();
        for store in &self.stores {
            let mut store_failed = false;

            if let Err(e) = store.upsert_position(&position).await {
                error!(
                    "Failed to write position of {} to {} store: {}",
                    report.url,
                    store.name(),
                    e
                );
                store_failed = true;
            }

            match store.upsert_vessel(&vessel).await {
                Ok(outcome) => debug!("Vessel {} in {} store", outcome, store.name()),
                Err(e) => {
                    error!(
                        "Failed to write vessel {} to {} store: {}",
                        report.url,
                        store.name(),
                        e
                    );
                    store_failed = true;
                }
            }

            if store_failed {
                failed.push(store.name().to_string());
            }
        }

        if let Some(csv) = &self.csv {
            if let Err(e) = csv.append(vessel.identity.key(), report).await {
                error!("Failed to append to CSV log: {}", e);
            }
        }

        Ok(failed)
    }
}

/// Builder for Crawler
pub struct CrawlerBuilder {
    fetcher: PageFetcher,
    stores: Vec<Box<dyn VesselStore>>,
    cache: Option<PageCache>,
    csv: Option<CsvLog>,
    urls: Vec<String>,
    sweep_interval: Option<Duration>,
}

impl CrawlerBuilder {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self {
            fetcher,
            stores: Vec::new(),
            cache: None,
            csv: None,
            urls: Vec::new(),
            sweep_interval: None,
        }
    }

    pub fn store(mut self, store: Box<dyn VesselStore>) -> Self {
        self.stores.push(store);
        self
    }

    pub fn cache(mut self, cache: PageCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn csv(mut self, csv: CsvLog) -> Self {
        self.csv = Some(csv);
        self
    }

    pub fn urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    pub fn build(self) -> Crawler {
        Crawler {
            fetcher: self.fetcher,
            stores: self.stores,
            cache: self.cache,
            csv: self.csv,
            urls: self.urls,
            sweep_interval: self.sweep_interval.unwrap_or(Duration::from_secs(600)),
        }
    }
}
