use serde::{Deserialize, Serialize};

/// One StackExchange community, as persisted by the site cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// `api_site_parameter`, e.g. `stackoverflow`
    pub id: String,
    pub name: String,
    pub audience: String,
    pub icon_url: String,
    pub is_meta: bool,
}

/// A search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub title: String,
    pub link: String,
    pub tags: Vec<String>,
    pub is_answered: bool,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaInfo {
    pub quota_remaining: u32,
}

/// What gets sent to `/search/advanced`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub site_id: String,
    /// Free-text terms joined by single spaces
    pub query: String,
    pub tags: Vec<String>,
    pub page_size: u32,
}

/// A live search response
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub questions: Vec<Question>,
    pub quota: Option<QuotaInfo>,
}
