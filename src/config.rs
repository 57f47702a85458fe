//! Application configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;
use tracing::warn;

use crate::errors::CrawlerError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:53.0) Gecko/20100101 Firefox/53.0";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub stores: StoresConfig,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    /// Vessel detail pages, visited in order on every sweep
    pub urls: Vec<String>,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub sweep_interval: Duration,
    pub user_agent: String,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub retry_delay: Duration,
    /// Retries after a connection failure before the vessel is skipped
    pub max_retries: u32,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub cache_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoresConfig {
    pub postgres: Option<PostgresConfig>,
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PostgresConfig {
    pub url: String,
    /// Schema qualifying both tables, search path if unset
    pub schema: Option<String>,
    /// Maintain a PostGIS `geom` column on positions
    #[serde(default)]
    pub postgis: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("crawler.urls", Vec::<String>::new())?
            .set_default("crawler.sweep_interval", 600)?
            .set_default("crawler.user_agent", DEFAULT_USER_AGENT)?
            .set_default("crawler.retry_delay", 5)?
            .set_default("crawler.max_retries", 10)?
            .set_default("crawler.request_timeout", 30)?
            .set_default("output.cache_path", "page.html")?
            .set_default("output.csv_path", "positions.csv")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("VESSELCRAWLER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("crawler.urls"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), CrawlerError> {
        self.crawler.validate()?;
        self.stores.validate()?;
        Ok(())
    }
}

impl CrawlerConfig {
    pub fn validate(&self) -> Result<(), CrawlerError> {
        if self.urls.is_empty() {
            return Err(CrawlerError::ConfigurationError {
                message: "At least one vessel URL is required".to_string(),
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(CrawlerError::ConfigurationError {
                message: "Sweep interval must be greater than zero".to_string(),
            });
        }
        if self.retry_delay.is_zero() {
            return Err(CrawlerError::ConfigurationError {
                message: "Retry delay must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl StoresConfig {
    pub fn validate(&self) -> Result<(), CrawlerError> {
        if self.postgres.is_none() && self.sqlite.is_none() {
            return Err(CrawlerError::ConfigurationError {
                message: "No store configured".to_string(),
            });
        }
        if let Some(postgres) = &self.postgres {
            postgres.validate()?;
        }
        if let Some(sqlite) = &self.sqlite {
            sqlite.validate()?;
        }
        Ok(())
    }
}

impl PostgresConfig {
    fn validate(&self) -> Result<(), CrawlerError> {
        if self.url.is_empty() {
            return Err(CrawlerError::ConfigurationError {
                message: "PostgreSQL URL cannot be empty".to_string(),
            });
        }
        if let Some(schema) = &self.schema {
            if !is_identifier(schema) {
                return Err(CrawlerError::ConfigurationError {
                    message: format!("Invalid schema name: {}", schema),
                });
            }
        }
        Ok(())
    }

    /// Table name qualified with the configured schema
    pub fn table(&self, name: &str) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, name),
            None => name.to_string(),
        }
    }
}

impl SqliteConfig {
    pub fn validate(&self) -> Result<(), CrawlerError> {
        self.validate_path()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                self.ensure_directory_exists(parent)?;
            }
        }
        Ok(())
    }

    fn validate_path(&self) -> Result<(), CrawlerError> {
        if self.path.to_str().unwrap_or("").is_empty() {
            return Err(CrawlerError::ConfigurationError {
                message: "Database path cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    fn ensure_directory_exists(&self, dir: &Path) -> Result<(), CrawlerError> {
        if !dir.exists() {
            warn!("Database directory does not exist, attempting to create it");
            std::fs::create_dir_all(dir).map_err(|e| CrawlerError::ConfigurationError {
                message: format!("Could not create database directory: {}", e),
            })?;
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn crawler_config() -> CrawlerConfig {
        CrawlerConfig {
            urls: vec!["https://example.com/vessel".to_string()],
            sweep_interval: Duration::from_secs(600),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry_delay: Duration::from_secs(5),
            max_retries: 3,
            request_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_load_config() {
        env::set_var("VESSELCRAWLER__CRAWLER__URLS", "https://a.example,https://b.example");
        env::set_var("VESSELCRAWLER__CRAWLER__SWEEP_INTERVAL", "60");
        env::set_var("VESSELCRAWLER__STORES__SQLITE__PATH", "/tmp/vessels.sqlite");
        env::set_var("VESSELCRAWLER__STORES__POSTGRES__URL", "postgres://localhost/whale_watch");
        env::set_var("VESSELCRAWLER__STORES__POSTGRES__SCHEMA", "public");

        let config = AppConfig::load().unwrap();
        assert_eq!(
            config.crawler.urls,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.crawler.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.crawler.retry_delay, Duration::from_secs(5));
        assert_eq!(config.crawler.user_agent, DEFAULT_USER_AGENT);

        let sqlite = config.stores.sqlite.unwrap();
        assert_eq!(sqlite.path, PathBuf::from("/tmp/vessels.sqlite"));

        let postgres = config.stores.postgres.unwrap();
        assert_eq!(postgres.url, "postgres://localhost/whale_watch");
        assert_eq!(postgres.table("vessels"), "public.vessels");
        assert!(!postgres.postgis);
    }

    #[test]
    fn test_crawler_config_validate() {
        assert!(crawler_config().validate().is_ok());
    }

    #[test]
    fn test_crawler_config_validate_no_urls() {
        let config = CrawlerConfig {
            urls: Vec::new(),
            ..crawler_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_crawler_config_validate_zero_interval() {
        let config = CrawlerConfig {
            sweep_interval: Duration::from_secs(0),
            ..crawler_config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stores_config_validate_empty() {
        assert!(StoresConfig::default().validate().is_err());
    }

    #[test]
    fn test_stores_config_validate_invalid_schema() {
        let stores = StoresConfig {
            postgres: Some(PostgresConfig {
                url: "postgres://localhost/db".to_string(),
                schema: Some("public; DROP TABLE vessels".to_string()),
                postgis: false,
            }),
            sqlite: None,
        };

        assert!(stores.validate().is_err());
    }

    #[test]
    fn test_sqlite_config_validate_invalid_path() {
        let config = SqliteConfig {
            path: PathBuf::from(""),
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_postgres_table_without_schema() {
        let config = PostgresConfig {
            url: "postgres://localhost/db".to_string(),
            schema: None,
            postgis: true,
        };

        assert_eq!(config.table("positions"), "positions");
    }
}
