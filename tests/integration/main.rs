//! Integration tests for Template-Harvest
//!
//! - `traversal_tests`: the traversal controller driven by a scripted fetcher
//! - `session_tests`: a full collection against a mock portal
//! - `download_tests`: the downloader and batch against a mock endpoint

mod download_tests;
mod traversal_tests;
