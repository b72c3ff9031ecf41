//! Builders for test items and payloads

mod artwork;
pub mod payloads;

pub use artwork::ArtworkBuilder;
