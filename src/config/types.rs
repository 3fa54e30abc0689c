use serde::Deserialize;

/// Main configuration structure for Discogs-Chain
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
}

/// Catalog site and search configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root of the catalog site; relative entry links resolve against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the search-results page
    #[serde(rename = "search-path", default = "default_search_path")]
    pub search_path: String,

    /// Category the search results are filtered to (e.g. "Rock")
    #[serde(rename = "category-filter")]
    pub category_filter: String,

    /// Number of results requested per search page
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// First search page to request when no checkpoint exists
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,
}

/// Page fetch behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Wait for the page to fully load and then settle before returning
    #[serde(rename = "wait-for-load", default = "default_wait_for_load")]
    pub wait_for_load: bool,

    /// Pause after load (milliseconds)
    #[serde(rename = "settle-delay-ms", default)]
    pub settle_delay_ms: u64,

    /// Upper bound on a single request (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retries for transient failures before the crawl stops
    #[serde(rename = "max-retries", default)]
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the pending link queue (JSON lines)
    #[serde(rename = "queue-path")]
    pub queue_path: String,

    /// Path to the completed record file (JSON lines)
    #[serde(rename = "records-path")]
    pub records_path: String,

    /// Optional path to the page cursor checkpoint
    #[serde(rename = "cursor-path", default)]
    pub cursor_path: Option<String>,
}

/// Termination rules; everything unset means crawl until stopped
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlConfig {
    /// Consecutive empty search pages after which the crawl ends
    #[serde(rename = "max-empty-pages", default)]
    pub max_empty_pages: Option<u32>,

    /// Records to emit in one run before stopping
    #[serde(rename = "max-records", default)]
    pub max_records: Option<u64>,
}

fn default_search_path() -> String {
    "/search/".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_wait_for_load() -> bool {
    true
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}
