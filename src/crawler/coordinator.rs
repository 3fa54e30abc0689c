//! Crawler coordinator - the crawl state machine
//!
//! This module drives the single chain of work:
//! - Fetch a search-results page and queue its entry links
//! - Pop one entry, fetch its detail page, then its cross-reference page
//! - Append the finished record
//! - Pop the next entry, or move to the next search page once the queue is dry
//!
//! At most one fetch is in flight and one entry is processed at a time, so the
//! link queue and record file need no locking.

use crate::config::{Config, CrawlConfig};
use crate::crawler::cursor::PageCursor;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::parser::{Extractor, Field, PageKind, ScraperExtractor};
use crate::state::{CrawlState, EntryDraft, Record};
use crate::storage::{
    CheckpointFile, JsonlLinkQueue, JsonlRecordSink, LinkQueue, QueueEntry, RecordSink,
};
use crate::ChainError;
use std::path::Path;
use tokio::sync::watch;
use url::Url;

/// Why a crawl run ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The stop signal was raised
    Stopped,

    /// Too many consecutive search pages came back empty
    Exhausted,

    /// The configured number of records was emitted
    RecordLimitReached,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,
    pub records_emitted: u64,
    pub page_number: u32,
    pub last_sequence_id: u64,
    pub pending_links: usize,
}

/// Work handed from one stage to the next
///
/// Partial results for an entry travel inside the step rather than in
/// shared state.
#[derive(Debug)]
enum Step {
    Search,
    Drain { references: Vec<String> },
    Detail,
    CrossRef { draft: EntryDraft, url: Url },
    Emit { record: Record },
    Exhausted,
}

impl Step {
    fn state(&self) -> CrawlState {
        match self {
            Self::Search => CrawlState::Searching,
            Self::Drain { .. } => CrawlState::DrainingList,
            Self::Detail => CrawlState::FetchingDetail,
            Self::CrossRef { .. } => CrawlState::FetchingCrossref,
            Self::Emit { .. } => CrawlState::Emitting,
            Self::Exhausted => CrawlState::Exhausted,
        }
    }

    /// True where no entry is in flight
    fn is_between_entries(&self) -> bool {
        matches!(self, Self::Search | Self::Detail)
    }
}

/// Main crawler coordinator structure
pub struct Coordinator<F, E> {
    fetcher: F,
    extractor: E,
    queue: JsonlLinkQueue,
    sink: JsonlRecordSink,
    cursor: PageCursor,
    checkpoint: Option<CheckpointFile>,
    base_url: Url,
    limits: CrawlConfig,
    stop: Option<watch::Receiver<bool>>,
    empty_pages: u32,
    records_emitted: u64,
}

impl<F: Fetcher, E: Extractor> Coordinator<F, E> {
    /// Creates a new coordinator instance
    ///
    /// Opens the link queue, record file and cursor checkpoint. A corrupt
    /// queue or record file is fatal.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fetcher` - Page fetcher
    /// * `extractor` - Field extractor
    /// * `fresh` - Drop pending links and the cursor checkpoint first
    pub fn new(config: &Config, fetcher: F, extractor: E, fresh: bool) -> Result<Self, ChainError> {
        let mut queue = JsonlLinkQueue::open(Path::new(&config.output.queue_path))?;
        let sink = JsonlRecordSink::open(Path::new(&config.output.records_path))?;
        let checkpoint = config
            .output
            .cursor_path
            .as_deref()
            .map(|path| CheckpointFile::new(Path::new(path)));

        if fresh {
            tracing::info!("Discarding {} pending links and cursor checkpoint", queue.len());
            queue.clear()?;
            if let Some(checkpoint) = &checkpoint {
                checkpoint.clear()?;
            }
        }

        let cursor = starting_cursor(config, &queue, &sink)?;
        let base_url = Url::parse(&config.site.base_url)?;

        Ok(Self {
            fetcher,
            extractor,
            queue,
            sink,
            cursor,
            checkpoint,
            base_url,
            limits: config.crawl.clone(),
            stop: None,
            empty_pages: 0,
            records_emitted: 0,
        })
    }

    /// Stops the run when the receiver observes `true`
    ///
    /// The signal is honored between entries; an entry that has been popped
    /// is always carried through to its record first.
    pub fn with_stop_signal(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn queue(&self) -> &JsonlLinkQueue {
        &self.queue
    }

    pub fn sink(&self) -> &JsonlRecordSink {
        &self.sink
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    /// Runs the crawl loop until stopped, exhausted, or a fatal error
    pub async fn run(&mut self) -> Result<CrawlReport, ChainError> {
        let mut step = if self.queue.is_empty() {
            Step::Search
        } else {
            tracing::info!("Resuming with {} pending links", self.queue.len());
            Step::Detail
        };

        tracing::info!(
            "Starting crawl at page {} (next id {})",
            self.cursor.page_number(),
            self.cursor.sequence_counter() + 1
        );

        let outcome = loop {
            if let Step::Exhausted = step {
                break CrawlOutcome::Exhausted;
            }

            if step.is_between_entries() {
                if self.stop_requested() {
                    tracing::info!("Stop requested, leaving crawl loop");
                    break CrawlOutcome::Stopped;
                }
                if self.record_limit_reached() {
                    tracing::info!("Reached record limit of {}", self.records_emitted);
                    break CrawlOutcome::RecordLimitReached;
                }
            }

            let from = step.state();
            let next = self.advance(step).await?;
            let to = next.state();

            if !from.can_transition_to(to) {
                return Err(ChainError::InvalidTransition { from, to });
            }
            tracing::trace!("{} -> {}", from, to);

            step = next;
        };

        let report = CrawlReport {
            outcome,
            records_emitted: self.records_emitted,
            page_number: self.cursor.page_number(),
            last_sequence_id: self.cursor.sequence_counter(),
            pending_links: self.queue.len(),
        };

        tracing::info!(
            "Crawl ended ({:?}): {} records emitted, page {}, {} links pending",
            report.outcome,
            report.records_emitted,
            report.page_number,
            report.pending_links
        );

        Ok(report)
    }

    /// Performs the work of one stage and returns the next
    async fn advance(&mut self, step: Step) -> Result<Step, ChainError> {
        match step {
            Step::Search => self.search().await,
            Step::Drain { references } => self.drain(references),
            Step::Detail => self.fetch_detail().await,
            Step::CrossRef { draft, url } => self.fetch_crossref(draft, url).await,
            Step::Emit { record } => self.emit(record),
            Step::Exhausted => Ok(Step::Exhausted),
        }
    }

    async fn search(&mut self) -> Result<Step, ChainError> {
        let url = self.cursor.next_search_url();
        tracing::debug!("Fetching search page {}: {}", self.cursor.page_number(), url);

        let content = self.fetch_page(&url, CrawlState::Searching).await?;
        let fields = self.extractor.extract(&content, PageKind::SearchResults);

        Ok(Step::Drain {
            references: fields.all(Field::EntryLink).to_vec(),
        })
    }

    fn drain(&mut self, references: Vec<String>) -> Result<Step, ChainError> {
        let found = references.len();
        let entries: Vec<QueueEntry> = references.into_iter().map(QueueEntry::new).collect();
        self.queue.push(&entries)?;

        tracing::info!(
            "Search page {} yielded {} entries ({} pending)",
            self.cursor.page_number(),
            found,
            self.queue.len()
        );

        if found == 0 {
            self.empty_pages += 1;
        } else {
            self.empty_pages = 0;
        }

        if !self.queue.is_empty() {
            return Ok(Step::Detail);
        }

        if let Some(max) = self.limits.max_empty_pages {
            if self.empty_pages >= max {
                tracing::warn!(
                    "{} consecutive empty search pages, stopping at page {}",
                    self.empty_pages,
                    self.cursor.page_number()
                );
                return Ok(Step::Exhausted);
            }
        }

        self.next_page()?;
        Ok(Step::Search)
    }

    async fn fetch_detail(&mut self) -> Result<Step, ChainError> {
        if self.queue.len() == 1 {
            // Mark the page spent before its last entry leaves the queue
            self.save_checkpoint(true)?;
        }

        // The pop is on disk before the fetch goes out
        let entry = self.queue.pop_front()?.ok_or(ChainError::EmptyQueue)?;

        let url = self.base_url.join(&entry.reference)?;
        tracing::debug!("Fetching entry {}", url);

        let content = self.fetch_page(&url, CrawlState::FetchingDetail).await?;
        let fields = self.extractor.extract(&content, PageKind::EntryDetail);

        let id = self.cursor.next_sequence_id();
        self.save_checkpoint(self.queue.is_empty())?;

        let draft = EntryDraft::from_detail(id, entry.reference, &fields);

        let crossref = match draft.crossref_link() {
            Some(link) => match self.base_url.join(link) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Unusable cross-reference link {:?} on {}: {}", link, url, e);
                    None
                }
            },
            None => {
                tracing::warn!("No cross-reference link on {}", url);
                None
            }
        };

        Ok(match crossref {
            Some(url) => Step::CrossRef { draft, url },
            None => Step::Emit {
                record: draft.finalize(None),
            },
        })
    }

    async fn fetch_crossref(&mut self, draft: EntryDraft, url: Url) -> Result<Step, ChainError> {
        tracing::debug!("Fetching cross-reference {} for record {}", url, draft.id);

        let content = self.fetch_page(&url, CrawlState::FetchingCrossref).await?;
        let fields = self.extractor.extract(&content, PageKind::CrossReference);

        Ok(Step::Emit {
            record: draft.finalize(Some(&fields)),
        })
    }

    fn emit(&mut self, record: Record) -> Result<Step, ChainError> {
        self.sink.append(&record)?;
        self.records_emitted += 1;

        tracing::info!(
            "Saved record {}: {} - {}",
            record.id,
            record.artist_name.as_deref().unwrap_or("?"),
            record.album_title.as_deref().unwrap_or("?")
        );

        if !self.queue.is_empty() {
            return Ok(Step::Detail);
        }

        self.next_page()?;
        Ok(Step::Search)
    }

    /// Fetches a page, logging enough context to resume by hand on failure
    async fn fetch_page(&self, url: &Url, state: CrawlState) -> Result<String, ChainError> {
        match self.fetcher.fetch(url).await {
            Ok(content) => Ok(content),
            Err(e) => {
                tracing::error!(
                    "Fetch failed while {} {}: {} (page {}, last id {}, {} links pending)",
                    state,
                    url,
                    e,
                    self.cursor.page_number(),
                    self.cursor.sequence_counter(),
                    self.queue.len()
                );
                Err(e.into())
            }
        }
    }

    fn next_page(&mut self) -> Result<(), ChainError> {
        self.cursor.advance();
        self.save_checkpoint(false)?;
        tracing::debug!("Advanced to search page {}", self.cursor.page_number());
        Ok(())
    }

    /// `drained` records that no entry of the current page is left queued
    fn save_checkpoint(&self, drained: bool) -> Result<(), ChainError> {
        if let Some(checkpoint) = &self.checkpoint {
            checkpoint.save(self.cursor.checkpoint(drained))?;
        }
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        self.stop.as_ref().is_some_and(|stop| *stop.borrow())
    }

    fn record_limit_reached(&self) -> bool {
        self.limits
            .max_records
            .is_some_and(|max| self.records_emitted >= max)
    }
}

/// Page cursor a crawl over the configured files would start from
///
/// Reads the cursor checkpoint when one is configured; `queue` and `sink`
/// decide whether the checkpointed page is searched again and where ids
/// continue.
pub fn starting_cursor(
    config: &Config,
    queue: &impl LinkQueue,
    sink: &impl RecordSink,
) -> Result<PageCursor, ChainError> {
    let saved = match &config.output.cursor_path {
        Some(path) => CheckpointFile::new(Path::new(path)).load()?,
        None => None,
    };

    Ok(PageCursor::resume(
        &config.site,
        saved,
        sink.last_id(),
        queue.is_empty(),
    )?)
}

/// Runs the main crawl operation with the HTTP fetcher and HTML extractor
///
/// # Example
///
/// ```no_run
/// use discogs_chain::config::load_config;
/// use discogs_chain::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = run_crawl(&config, false, None).await?;
/// println!("{} records", report.records_emitted);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    fresh: bool,
    stop: Option<watch::Receiver<bool>>,
) -> Result<CrawlReport, ChainError> {
    let fetcher = HttpFetcher::new(config)?;
    let mut coordinator = Coordinator::new(config, fetcher, ScraperExtractor::new(), fresh)?;
    if let Some(stop) = stop {
        coordinator = coordinator.with_stop_signal(stop);
    }
    coordinator.run().await
}
