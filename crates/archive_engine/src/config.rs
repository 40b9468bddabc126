use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crawl_logging::{crawl_info, crawl_warn, LogDestination};
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

use crate::{FetchSettings, PollSettings, DEFAULT_MAX_DOCUMENT_PAGES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Crawler settings, read from a RON file. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub output_dir: PathBuf,
    pub endpoint: String,
    pub proxy: Option<String>,
    pub poll_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub download_attempts: u32,
    pub max_document_pages: u32,
    pub max_page_bytes: u64,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            output_dir: PathBuf::from("."),
            endpoint: fetch.endpoint,
            proxy: None,
            poll_timeout_secs: 10,
            poll_interval_ms: 1000,
            request_timeout_secs: fetch.request_timeout.as_secs(),
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            download_attempts: fetch.attempts,
            max_document_pages: DEFAULT_MAX_DOCUMENT_PAGES,
            max_page_bytes: fetch.max_bytes,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl CrawlConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&content)?;
        crawl_info!("Loaded crawler config from {:?}", path);
        Ok(config)
    }

    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(content)?)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            timeout: Duration::from_secs(self.poll_timeout_secs),
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            endpoint: self.endpoint.clone(),
            proxy: self.proxy.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            attempts: self.download_attempts,
            max_bytes: self.max_page_bytes,
        }
    }

    /// Unknown level names fall back to `info`.
    pub fn log_level(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or_else(|_| {
            crawl_warn!("Unknown log level {:?}, using info", self.log_level);
            LevelFilter::Info
        })
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    /// Install the global logger as configured.
    pub fn init_logging(&self) {
        crawl_logging::initialize(self.log_destination(), self.log_level());
    }
}
