// Question search script filter
use stacksearch_cache::CacheDirectory;
use tracing::{debug, info};

use crate::catalog::site_icon;
use crate::feedback::{Feedback, Item, ERROR_ICON};
use crate::filter::{filter_items, FuzzyFilter};
use crate::models::Question;
use crate::query::parse_search_query;
use crate::search::StackExchangeSource;
use crate::search_with_cache::CachedSearchEngine;
use crate::{Config, Result};

/// Below this many remaining requests the user gets a warning item
pub const QUOTA_WARNING_THRESHOLD: u32 = 10;

/// Script filter for searching the configured site
///
/// `raw_query` is the whole search box: `terms [#tags] [// local words]`.
pub async fn question_feedback(
    source: &dyn StackExchangeSource,
    cache: &CacheDirectory,
    filter: &dyn FuzzyFilter,
    config: &Config,
    raw_query: &str,
) -> Result<Feedback> {
    let parsed = parse_search_query(raw_query);
    info!(
        "site={:?}, query={:?}, tags={:?}, local={:?}",
        config.site_id,
        parsed.query(),
        parsed.tags,
        parsed.local
    );

    if parsed.is_empty() {
        return Ok(Feedback::message(
            format!("Search {}", config.site_name),
            "Type words to search, #tag to filter by tag, // to narrow down the results",
        ));
    }

    let engine = CachedSearchEngine::new(source, cache, config.cache_max_age(), config.result_count);
    let outcome = engine.search(&config.site_id, &parsed).await?;

    let mut questions = outcome.questions;
    if !parsed.local.is_empty() {
        questions = filter_items(filter, &parsed.local, questions, |q| q.title.as_str()).await?;
        debug!("{} questions left after local search", questions.len());
    }

    let mut items = Vec::new();
    if let Some(quota) = outcome.quota {
        if quota.quota_remaining < QUOTA_WARNING_THRESHOLD {
            items.push(
                Item::new(format!(
                    "Remaining quota less than {}: {}!",
                    QUOTA_WARNING_THRESHOLD, quota.quota_remaining
                ))
                .invalid()
                .icon(ERROR_ICON),
            );
        }
    }

    if questions.is_empty() {
        items.push(Item::new("No answer found").subtitle("Try a different query").invalid());
        return Ok(Feedback::new(items));
    }

    let icon = site_icon(cache, &config.site_id);
    items.extend(questions.iter().map(|q| question_item(q, &icon)));
    Ok(Feedback::new(items))
}

fn question_item(question: &Question, icon: &str) -> Item {
    let mut title = question.title.clone();
    if question.is_answered {
        title.push_str(" ✅");
    }
    title.push_str(&format!(" ⭐️{}", question.score));

    let subtitle = question
        .tags
        .iter()
        .map(|tag| format!("#{}", tag))
        .collect::<Vec<_>>()
        .join(" ");

    Item::new(title)
        .subtitle(subtitle)
        .arg(&question.link)
        .uid(&question.link)
        .text(&question.title)
        .icon(icon)
}
