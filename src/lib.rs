//! Weibo timeline crawler library.
//!
//! Walks a profile's timeline on the legacy mobile site, extracts every
//! post into typed records, and hands them to file sinks in batches.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod config;
pub mod constants;
pub mod download;
pub mod fetch;
pub mod parse;
pub mod sink;
pub mod timeline;
