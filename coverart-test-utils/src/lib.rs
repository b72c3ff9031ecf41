//! Test utilities for the coverart pipeline
//!
//! This crate provides mock fetchers, cover stores, and builders for
//! testing resolvers without touching the network.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{ArtworkBuilder, payloads};
pub use mocks::{MemoryCoverStore, MockFetcher};
