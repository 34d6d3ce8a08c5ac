// Provider implementations for StackExchangeSource
pub mod stackexchange;

pub use stackexchange::StackExchangeProvider;
