//! Site-scoped crawling and page text extraction.
//!
//! This crate provides:
//! - [`PageFetcher`]: HTTP page fetching with SSRF protection
//! - [`LinkCrawler`]: breadth-first, same-site link discovery
//! - [`visible_text`] / [`extract_links`]: HTML helpers

pub mod engine;
pub mod fetch;
pub mod text;

pub use engine::{CrawlResult, LinkCrawler};
pub use fetch::PageFetcher;
pub use text::{extract_links, visible_text};
