// File-based cache under the workflow's cache directory
// Every write goes through a temp file + rename so concurrent invocations
// never read half a file

pub mod cache;

pub use cache::{answers_key, AnswersEntry, CacheDirectory, CacheError, SitesSnapshot};
