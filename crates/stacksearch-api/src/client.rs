use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{ApiQuestion, ApiSite, SearchRequest, Wrapper};
use crate::retry::{is_retryable_status, with_retry_when, RetryConfig};

pub const STACKEXCHANGE_API_BASE: &str = "https://api.stackexchange.com/2.3";

/// Largest page the API hands out
const MAX_PAGE_SIZE: u32 = 100;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API request failed: Status {status}: {detail}")]
    Status {
        status: reqwest::StatusCode,
        detail: String,
    },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("{name} ({id}): {message}")]
    Api {
        id: u32,
        name: String,
        message: String,
    },

    #[error("Invalid proxy {0}")]
    InvalidProxy(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl ApiError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimitExceeded => true,
            ApiError::Status { status, .. } => is_retryable_status(*status),
            // 502 throttle_violation, 503 temporarily_unavailable
            ApiError::Api { id, .. } => *id == 502 || *id == 503,
            ApiError::NetworkError(e) => e.is_timeout() || e.is_connect(),
            ApiError::InvalidProxy(_) | ApiError::ParseError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// How to reach the API
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// Registered app key; raises the daily quota from 300 to 10,000
    pub api_key: Option<String>,
    pub client_id: Option<String>,
    pub proxy: Option<String>,
    pub retry: RetryConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: STACKEXCHANGE_API_BASE.to_string(),
            api_key: None,
            client_id: None,
            proxy: None,
            retry: RetryConfig::default(),
        }
    }
}

pub struct StackExchangeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    client_id: Option<String>,
    retry_config: RetryConfig,
}

impl StackExchangeClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(USER_AGENT),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(proxy) = options.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ApiError::InvalidProxy(format!("{}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            api_key: options.api_key,
            client_id: options.client_id,
            retry_config: options.retry,
        })
    }

    /// Replace the retry policy, e.g. with [`RetryConfig::none`] for
    /// per-keystroke lookups
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Run `/search/advanced` for the first page of results, most relevant first
    pub async fn search_advanced(&self, request: &SearchRequest) -> Result<Wrapper<ApiQuestion>> {
        let mut params = vec![
            ("page", "1".to_string()),
            ("pagesize", request.page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("order", "desc".to_string()),
            ("sort", "relevance".to_string()),
            ("site", request.site.clone()),
        ];
        if !request.query.is_empty() {
            params.push(("q", request.query.clone()));
        }
        if !request.tags.is_empty() {
            params.push(("tagged", request.tags.join(";")));
        }

        debug!("Requesting search on {} for {:?}", request.site, request.query);
        let wrapper = self.get("/search/advanced", params).await?;
        debug!("Search returned {} questions", wrapper.items.len());
        Ok(wrapper)
    }

    /// Fetch one page of `/sites`
    pub async fn sites_page(&self, page: u32) -> Result<Wrapper<ApiSite>> {
        let params = vec![
            ("page", page.to_string()),
            ("pagesize", MAX_PAGE_SIZE.to_string()),
        ];
        self.get("/sites", params).await
    }

    /// Walk `/sites` until `has_more` is false
    pub async fn all_sites(&self) -> Result<Vec<ApiSite>> {
        let mut sites = Vec::new();
        let mut page = 1;

        loop {
            debug!("Fetching sites page {}", page);
            let wrapper = self.sites_page(page).await?;
            sites.extend(wrapper.items);

            if !wrapper.has_more {
                break;
            }
            page += 1;
        }

        debug!("Fetched {} sites over {} pages", sites.len(), page);
        Ok(sites)
    }

    /// Download raw bytes from an arbitrary URL (site icons live on a CDN,
    /// not under the API base)
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        with_retry_when(
            &self.retry_config,
            || async {
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ApiError::Status {
                        status,
                        detail: url.to_string(),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            },
            ApiError::is_retryable,
        )
        .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> Result<Wrapper<T>> {
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        if let Some(client_id) = &self.client_id {
            params.push(("client_id", client_id.clone()));
        }
        let url = format!("{}{}", self.base_url, path);

        with_retry_when(
            &self.retry_config,
            || async { self.get_once(&url, &params).await },
            ApiError::is_retryable,
        )
        .await
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<Wrapper<T>> {
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // Error wrappers come back with 4xx/5xx but a parseable body, so
        // look at the body before the status.
        let wrapper: Wrapper<T> = match serde_json::from_str(&body) {
            Ok(wrapper) => wrapper,
            Err(e) => {
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(ApiError::RateLimitExceeded);
                }
                if !status.is_success() {
                    return Err(ApiError::Status { status, detail: body });
                }
                return Err(ApiError::ParseError(e));
            }
        };

        if let Some(id) = wrapper.error_id {
            return Err(ApiError::Api {
                id,
                name: wrapper.error_name.unwrap_or_default(),
                message: wrapper.error_message.unwrap_or_default(),
            });
        }

        if !status.is_success() {
            return Err(ApiError::Status { status, detail: body });
        }

        if let Some(backoff) = wrapper.backoff {
            warn!("API asked to back off for {} seconds", backoff);
        }

        Ok(wrapper)
    }
}
