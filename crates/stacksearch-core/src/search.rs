use async_trait::async_trait;

use crate::models::{SearchQuery, SearchResponse, Site};
use crate::Result;

/// Where sites, questions and icons come from
///
/// The workflow steps only talk to this trait, so tests can swap the
/// network for a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StackExchangeSource: Send + Sync {
    /// Every open site in the network
    async fn sites(&self) -> Result<Vec<Site>>;

    /// First page of `/search/advanced`
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse>;

    /// Raw icon bytes
    async fn icon(&self, url: &str) -> Result<Vec<u8>>;
}
