//! Vessel page download

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{info, warn};

use crate::{config::CrawlerConfig, errors::CrawlerError};

/// HTTP client for vessel detail pages
pub struct PageFetcher {
    client: Client,
    retry_delay: Duration,
    max_retries: u32,
}

impl PageFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self, CrawlerError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            retry_delay: config.retry_delay,
            max_retries: config.max_retries,
        })
    }

    /// Download `url`.
    ///
    /// Returns `None` when the server answers with anything but 200.
    /// Connection failures and timeouts are retried after a fixed delay, at
    /// most `max_retries` times.
    pub async fn fetch(&self, url: &str) -> Result<Option<String>, CrawlerError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status != StatusCode::OK {
                        warn!("Download of {} returned {}", url, status);
                        return Ok(None);
                    }
                    return Ok(Some(response.text().await?));
                }
                Err(e) if is_transient(&e) => {
                    if attempt > self.max_retries {
                        return Err(CrawlerError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            source: e,
                        });
                    }
                    info!(
                        "Download failed ({}). Retrying in {} seconds",
                        e,
                        self.retry_delay.as_secs()
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_retries: u32) -> CrawlerConfig {
        CrawlerConfig {
            urls: vec![],
            sweep_interval: Duration::from_secs(600),
            user_agent: "vessel-crawler-test".to_string(),
            retry_delay: Duration::from_millis(10),
            max_retries,
            request_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let fetcher = PageFetcher::new(&config(2)).unwrap();

        // Nothing listens on the discard port of localhost
        let result = fetcher.fetch("http://127.0.0.1:9/vessel").await;

        match result {
            Err(CrawlerError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhausted retries, got {:?}", other),
        }
    }
}
