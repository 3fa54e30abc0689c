//! State module for the per-entry crawl chain
//!
//! # Components
//!
//! - `CrawlState`: The stages of the crawl state machine and their legal transitions
//! - `EntryDraft`: Fields accumulated for one catalog entry across its fetches
//! - `Record`: The finalized, deduplicated view of a draft that gets persisted

mod crawl_state;
mod draft;

pub use crawl_state::CrawlState;
pub use draft::{clean_title, EntryDraft, Record, Track};
