//! Page cursor over the catalog search results

use crate::config::SiteConfig;
use crate::storage::CursorCheckpoint;
use url::Url;

/// Query parameter carrying the category filter
const CATEGORY_PARAM: &str = "genre_exact";

/// Tracks the search page being drained and the record sequence
///
/// `page_number` only moves forward when the link queue runs dry.
/// `sequence_counter` is bumped once per entry and never goes back.
#[derive(Debug, Clone)]
pub struct PageCursor {
    search_url: Url,
    page_size: u32,
    category_filter: String,
    page_number: u32,
    sequence_counter: u64,
}

impl PageCursor {
    /// Creates a cursor at `page_number` with `sequence_counter` ids
    /// already handed out
    pub fn new(
        site: &SiteConfig,
        page_number: u32,
        sequence_counter: u64,
    ) -> Result<Self, url::ParseError> {
        let search_url = Url::parse(&site.base_url)?.join(&site.search_path)?;

        Ok(Self {
            search_url,
            page_size: site.page_size,
            category_filter: site.category_filter.clone(),
            page_number: page_number.max(1),
            sequence_counter,
        })
    }

    /// Creates the cursor for a run over existing crawl files
    ///
    /// Ids continue after both the stored records and any id already handed
    /// out. With an empty link queue, a page whose entries were all popped
    /// is not searched again.
    pub fn resume(
        site: &SiteConfig,
        saved: Option<CursorCheckpoint>,
        last_record_id: Option<u64>,
        queue_is_empty: bool,
    ) -> Result<Self, url::ParseError> {
        let page_number = match saved {
            Some(saved) if queue_is_empty => saved.resume_page(),
            Some(saved) => saved.page,
            None => site.start_page,
        };
        let sequence = last_record_id
            .unwrap_or(0)
            .max(saved.map_or(0, |s| s.sequence));

        Self::new(site, page_number, sequence)
    }

    /// URL of the search-results page the cursor points at
    pub fn next_search_url(&self) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("limit", &self.page_size.to_string())
            .append_pair(CATEGORY_PARAM, &self.category_filter)
            .append_pair("page", &self.page_number.to_string());
        url
    }

    /// Moves to the next search-results page
    pub fn advance(&mut self) {
        self.page_number += 1;
    }

    /// Hands out the next record id
    pub fn next_sequence_id(&mut self) -> u64 {
        self.sequence_counter += 1;
        self.sequence_counter
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Last id handed out (0 before the first)
    pub fn sequence_counter(&self) -> u64 {
        self.sequence_counter
    }

    pub fn checkpoint(&self, drained: bool) -> CursorCheckpoint {
        CursorCheckpoint {
            page: self.page_number,
            sequence: self.sequence_counter,
            drained,
        }
    }
}
