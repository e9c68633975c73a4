//! # Test Utilities
//!
//! Known-good fixtures and a stub [`Fetcher`](shc_core::Fetcher) shared by
//! the workspace's tests.

pub mod fixtures;
mod fetcher;

pub use fetcher::MockFetcher;
