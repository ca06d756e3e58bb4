//! Decode Atom feeds into a normalized, deduplicated feed model.
//!
//! - [`feed`] - Atom decoding and normalization
//! - [`storage`] - Persisted seen sets, one per feed source
//! - [`config`] - Optional TOML configuration for the command-line tool
//! - [`util`] - Terminal-safe text helpers

pub mod config;
pub mod feed;
pub mod storage;
pub mod util;
