// Question search with caching support
use chrono::Utc;
use stacksearch_cache::{answers_key, AnswersEntry, CacheDirectory};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    models::{Question, QuotaInfo, SearchQuery},
    query::ParsedQuery,
    search::StackExchangeSource,
    Result,
};

/// Questions for one search, plus where they came from
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub questions: Vec<Question>,
    /// Only known when the API was actually called
    pub quota: Option<QuotaInfo>,
    pub from_cache: bool,
}

/// Search engine that checks the answers cache before hitting the API
pub struct CachedSearchEngine<'a> {
    source: &'a dyn StackExchangeSource,
    cache: &'a CacheDirectory,
    max_age: Duration,
    page_size: u32,
}

impl<'a> CachedSearchEngine<'a> {
    pub fn new(
        source: &'a dyn StackExchangeSource,
        cache: &'a CacheDirectory,
        max_age: Duration,
        page_size: u32,
    ) -> Self {
        Self {
            source,
            cache,
            max_age,
            page_size,
        }
    }

    /// Search with cache-first strategy
    pub async fn search(&self, site_id: &str, parsed: &ParsedQuery) -> Result<SearchOutcome> {
        let query = parsed.query();
        let key = answers_key(site_id, &query, &parsed.tags);

        match self.cache.load_answers::<Question>(&key) {
            Ok(Some(entry)) if entry.is_fresh(self.max_age, Utc::now()) => {
                info!("Cache hit! {} questions for {:?}", entry.questions.len(), query);
                return Ok(SearchOutcome {
                    questions: entry.questions,
                    quota: None,
                    from_cache: true,
                });
            }
            Ok(Some(_)) => debug!("Cache entry {} is stale", key),
            Ok(None) => debug!("Cache miss for {}", key),
            Err(e) => warn!("Ignoring unreadable cache entry {}: {}", key, e),
        }

        info!("Requesting search API for site={:?} query={:?} tags={:?}", site_id, query, parsed.tags);
        let response = self
            .source
            .search(&SearchQuery {
                site_id: site_id.to_string(),
                query: query.clone(),
                tags: parsed.tags.clone(),
                page_size: self.page_size,
            })
            .await?;

        let mut questions = response.questions;
        // stable: relevance order holds within each group
        questions.sort_by_key(|q| !q.is_answered);

        let entry = AnswersEntry {
            cached_at: Utc::now(),
            site_id: site_id.to_string(),
            query,
            tags: parsed.tags.clone(),
            questions,
        };
        if let Err(e) = self.cache.store_answers(&key, &entry) {
            warn!("Failed to cache answers {}: {}", key, e);
        }

        Ok(SearchOutcome {
            questions: entry.questions,
            quota: response.quota,
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchResponse;
    use crate::query::parse_search_query;
    use crate::search::MockStackExchangeSource;
    use tempfile::TempDir;

    fn question(title: &str, is_answered: bool) -> Question {
        Question {
            title: title.to_string(),
            link: format!("https://stackoverflow.com/q/{}", title.len()),
            tags: vec!["rust".to_string()],
            is_answered,
            score: 1,
        }
    }

    fn response() -> SearchResponse {
        SearchResponse {
            questions: vec![
                question("open one", false),
                question("solved one", true),
                question("open two", false),
                question("solved two", true),
            ],
            quota: Some(QuotaInfo { quota_remaining: 250 }),
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let dir = TempDir::new().unwrap();
        let cache = CacheDirectory::open(dir.path()).unwrap();
        let mut source = MockStackExchangeSource::new();
        source
            .expect_search()
            .withf(|q| q.site_id == "stackoverflow" && q.query == "borrow" && q.tags == vec!["rust"] && q.page_size == 20)
            .times(1)
            .returning(|_| Ok(response()));

        let engine = CachedSearchEngine::new(&source, &cache, Duration::from_secs(3600), 20);
        let parsed = parse_search_query("borrow #rust");

        let first = engine.search("stackoverflow", &parsed).await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.quota, Some(QuotaInfo { quota_remaining: 250 }));

        let second = engine.search("stackoverflow", &parsed).await.unwrap();
        assert!(second.from_cache);
        assert!(second.quota.is_none());
        assert_eq!(second.questions, first.questions);
    }

    #[tokio::test]
    async fn test_answered_questions_first() {
        let dir = TempDir::new().unwrap();
        let cache = CacheDirectory::open(dir.path()).unwrap();
        let mut source = MockStackExchangeSource::new();
        source.expect_search().returning(|_| Ok(response()));

        let engine = CachedSearchEngine::new(&source, &cache, Duration::from_secs(3600), 20);
        let outcome = engine
            .search("stackoverflow", &parse_search_query("one two"))
            .await
            .unwrap();

        let titles: Vec<&str> = outcome.questions.iter().map(|q| q.title.as_str()).collect();
        assert_eq!(titles, vec!["solved one", "solved two", "open one", "open two"]);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refreshed() {
        let dir = TempDir::new().unwrap();
        let cache = CacheDirectory::open(dir.path()).unwrap();
        let mut source = MockStackExchangeSource::new();
        source.expect_search().times(2).returning(|_| Ok(response()));

        // zero max age: everything is stale immediately
        let engine = CachedSearchEngine::new(&source, &cache, Duration::from_secs(0), 20);
        let parsed = parse_search_query("lifetimes");

        assert!(!engine.search("stackoverflow", &parsed).await.unwrap().from_cache);
        assert!(!engine.search("stackoverflow", &parsed).await.unwrap().from_cache);
    }

    #[tokio::test]
    async fn test_sites_do_not_share_entries() {
        let dir = TempDir::new().unwrap();
        let cache = CacheDirectory::open(dir.path()).unwrap();
        let mut source = MockStackExchangeSource::new();
        source.expect_search().times(2).returning(|_| Ok(response()));

        let engine = CachedSearchEngine::new(&source, &cache, Duration::from_secs(3600), 20);
        let parsed = parse_search_query("bash");

        engine.search("stackoverflow", &parsed).await.unwrap();
        let other = engine.search("superuser", &parsed).await.unwrap();
        assert!(!other.from_cache);
    }

    #[tokio::test]
    async fn test_corrupt_entry_falls_back_to_api() {
        let dir = TempDir::new().unwrap();
        let cache = CacheDirectory::open(dir.path()).unwrap();
        let parsed = parse_search_query("tokio");
        let key = answers_key("stackoverflow", &parsed.query(), &parsed.tags);
        std::fs::write(cache.answers_path(&key), b"definitely not gzip").unwrap();

        let mut source = MockStackExchangeSource::new();
        source.expect_search().times(1).returning(|_| Ok(response()));

        let engine = CachedSearchEngine::new(&source, &cache, Duration::from_secs(3600), 20);
        let outcome = engine.search("stackoverflow", &parsed).await.unwrap();

        assert!(!outcome.from_cache);
        assert_eq!(outcome.questions.len(), 4);
    }
}
