// StackExchange API client
pub mod client;
pub mod models;
pub mod retry;

// Re-export common types
pub use client::{ApiError, ClientOptions, StackExchangeClient, STACKEXCHANGE_API_BASE};
pub use models::{ApiQuestion, ApiSite, SearchRequest, Wrapper};
pub use retry::RetryConfig;
