//! Integration tests for site-sync
//!
//! These tests use wiremock to stand up a mock website and a mock search
//! index, and drive full crawls and syncs end-to-end.

mod common;
mod crawl_tests;
mod sync_tests;
