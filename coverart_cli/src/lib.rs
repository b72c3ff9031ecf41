//! Coverart CLI library
//!
//! Configuration, path management and the artwork service behind the
//! `coverart` binary.

pub mod config;
pub mod output;
pub mod paths;
pub mod service;
