//! Crawler module for the catalog crawl chain
//!
//! This module contains the core crawling logic, including:
//! - Page fetching with retry and settle handling
//! - Field extraction from search, detail and cross-reference pages
//! - The page cursor over search results
//! - The state machine that threads one entry at a time through its fetches

mod coordinator;
mod cursor;
mod fetcher;
mod parser;

pub use coordinator::{run_crawl, starting_cursor, Coordinator, CrawlOutcome, CrawlReport};
pub use cursor::PageCursor;
pub use fetcher::{
    build_http_client, user_agent_string, Fetcher, HttpFetcher, RetryPolicy, WaitPolicy,
};
pub use parser::{Extractor, Field, Fields, PageKind, ScraperExtractor};
