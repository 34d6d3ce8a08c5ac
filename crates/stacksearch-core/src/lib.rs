// Workflow logic: config, site catalog, question search, launcher output
pub mod actions;
pub mod catalog;
pub mod config;
pub mod error;
pub mod feedback;
pub mod filter;
pub mod models;
pub mod providers;
pub mod query;
pub mod questions;
pub mod search;
pub mod search_with_cache;

pub use catalog::{cache_sites, site_feedback, CacheReport};
pub use config::Config;
pub use error::Error;
pub use feedback::Feedback;
pub use filter::{FuzzyFilter, FzfFilter, SkimFilter};
pub use models::{Question, Site};
pub use providers::StackExchangeProvider;
pub use query::{parse_search_query, ParsedQuery};
pub use questions::question_feedback;
pub use search::StackExchangeSource;
pub use search_with_cache::CachedSearchEngine;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
