//! Mock implementations for testing

mod covers;
mod fetcher;

pub use covers::MemoryCoverStore;
pub use fetcher::MockFetcher;
