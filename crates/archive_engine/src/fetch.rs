use std::time::Duration;

use crawl_logging::{crawl_debug, crawl_warn};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE};

use crate::{CookieJar, FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Page-image resource; id and page index go into the query.
    pub endpoint: String,
    /// SOCKS5 proxy as `host:port` or `user:pass@host:port`.
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub attempts: u32,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://eais.tatar.ru/Pages/ImageFilePart.ashx".to_string(),
            proxy: None,
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            attempts: 5,
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub file_id: String,
    pub page: u32,
}

impl PageRequest {
    pub fn new(file_id: impl Into<String>, page: u32) -> Self {
        Self {
            file_id: file_id.into(),
            page,
        }
    }
}

/// A received response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Value of the `Content-Length` header, if any.
    pub declared_length: Option<u64>,
    pub bytes: Vec<u8>,
}

#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// `Err` only when no response arrived at all.
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FetchError>;
}

/// Fetches page images over HTTP with the browser session's cookies.
///
/// Each attempt builds a fresh client and copies the current cookie set.
#[derive(Debug, Clone)]
pub struct ReqwestPageSource {
    settings: FetchSettings,
    cookies: CookieJar,
}

impl ReqwestPageSource {
    pub fn new(settings: FetchSettings, cookies: CookieJar) -> Self {
        Self { settings, cookies }
    }

    pub fn page_url(&self, request: &PageRequest) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.settings.endpoint)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("Crop", "False")
            .append_pair("Id", &request.file_id)
            .append_pair("Page", &request.page.to_string())
            .append_pair("Zoom", "1");
        Ok(url)
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout);

        if let Some(proxy) = self.settings.proxy.as_deref() {
            let proxy_url = if proxy.contains("://") {
                proxy.to_string()
            } else {
                format!("socks5://{proxy}")
            };
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    async fn attempt(&self, url: reqwest::Url) -> Result<PageResponse, FetchError> {
        let client = self.build_client()?;
        let mut request = client.get(url);
        if let Some(cookie_header) = self.cookies.header_value() {
            request = request.header(COOKIE, cookie_header);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let declared_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        if let Some(declared) = declared_length {
            if declared > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(declared),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(PageResponse {
            status,
            content_type,
            declared_length,
            bytes,
        })
    }
}

#[async_trait::async_trait]
impl PageSource for ReqwestPageSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FetchError> {
        let url = self.page_url(request)?;
        let attempts = self.settings.attempts.max(1);

        let mut last_error = FetchError::new(FailureKind::Network, "no attempt made");
        for attempt in 1..=attempts {
            match self.attempt(url.clone()).await {
                Ok(response) => {
                    crawl_debug!(
                        "Download status for file {}, page {}: {}",
                        request.file_id,
                        request.page,
                        response.status
                    );
                    return Ok(response);
                }
                Err(err) => {
                    crawl_warn!(
                        "Failed to download file {} page {}, attempt {}/{}: {}",
                        request.file_id,
                        request.page,
                        attempt,
                        attempts,
                        err
                    );
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
