use serde::{Deserialize, Serialize};

/// Common envelope around every StackExchange API response
///
/// Error responses share the envelope: `items` is missing and the
/// `error_*` fields are set instead.
#[derive(Debug, Clone, Deserialize)]
pub struct Wrapper<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    pub quota_remaining: Option<u32>,
    pub quota_max: Option<u32>,
    /// Seconds the API asks us to wait before hitting the same method again
    pub backoff: Option<u64>,
    pub error_id: Option<u32>,
    pub error_name: Option<String>,
    pub error_message: Option<String>,
}

/// A site as returned by `/sites`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSite {
    pub api_site_parameter: String,
    pub name: String,
    #[serde(default)]
    pub audience: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub site_type: String,
    #[serde(default)]
    pub site_state: String,
}

impl ApiSite {
    pub fn is_meta(&self) -> bool {
        self.site_type == "meta_site"
    }

    pub fn is_closed_beta(&self) -> bool {
        self.site_state == "closed_beta"
    }
}

/// A question as returned by `/search/advanced`
///
/// `title` is still HTML-escaped here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiQuestion {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_answered: bool,
    #[serde(default)]
    pub score: i64,
}

/// Parameters for `/search/advanced`
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub site: String,
    /// Free text; omitted from the request when empty
    pub query: String,
    /// Sent as `tagged`, joined with `;`
    pub tags: Vec<String>,
    pub page_size: u32,
}
