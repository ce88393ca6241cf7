use serde::Deserialize;
use serde_json::{Map, Value};

/// Main configuration structure for site-sync
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Identity stamped on every record as `crawledBy`
    pub crawler_name: String,

    /// Seed URLs
    #[serde(default)]
    pub start_urls: Vec<String>,

    /// Seed URLs replacing `start-urls` when non-empty
    #[serde(default)]
    pub list_of_urls: Vec<String>,

    /// Ordered field-name -> CSS selector pairs
    #[serde(default)]
    pub selectors: Vec<SelectorEntry>,

    /// Name of a registered page function; the built-in extractor when absent
    #[serde(default)]
    pub page_function: Option<String>,

    /// Static fields merged into every record
    #[serde(default)]
    pub additional_page_attrs: Map<String, Value>,

    /// Strip the query string from discovered links
    #[serde(default)]
    pub omit_search_params_from_url: bool,

    /// Keep the fragment in the dedup key of discovered links
    #[serde(default)]
    pub keep_url_fragment: bool,

    /// Selector for elements whose `href` is followed
    #[serde(default)]
    pub clickable_elements: Option<String>,

    /// Selector that must be present before extraction starts
    #[serde(default)]
    pub wait_for_element: Option<String>,

    /// Link allow-patterns; derived from the seeds when empty
    #[serde(default)]
    pub pseudo_urls: Vec<String>,

    /// Fields a record must carry; defaults to the selector keys
    #[serde(default)]
    pub required_attributes: Vec<String>,

    /// Do not follow links at all
    #[serde(default)]
    pub disable_crawler_cascade: bool,

    /// Reconcile even when the crawl was aborted
    #[serde(default)]
    pub accept_partial: bool,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    pub index: IndexConfig,

    pub output: OutputConfig,
}

/// A single `[[selectors]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectorEntry {
    pub key: String,
    pub value: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of pages processed at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// How many times a failing page is handed back to the queue
    #[serde(default = "default_max_request_retries")]
    pub max_request_retries: u32,

    /// Timeout for a single page fetch (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User agent sent with page fetches
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_request_retries: default_max_request_retries(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Search index connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IndexConfig {
    /// Base URL of the index service
    pub base_url: String,

    /// Name of the index records are synchronized into
    pub index_name: String,

    /// Page size used when browsing the index
    #[serde(default = "default_browse_batch_size")]
    pub browse_batch_size: u32,

    /// What to do when the snapshot cannot be read
    #[serde(default)]
    pub snapshot_errors: SnapshotErrors,
}

/// Policy for snapshot read failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotErrors {
    /// Abort the sync
    #[default]
    Fail,
    /// Log and continue with an empty snapshot
    Empty,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite record dataset
    pub database_path: String,

    /// Path to the markdown sync summary
    #[serde(default)]
    pub summary_path: Option<String>,
}

fn default_max_concurrency() -> u32 {
    10
}

fn default_max_request_retries() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("site-sync/{}", env!("CARGO_PKG_VERSION"))
}

fn default_browse_batch_size() -> u32 {
    1000
}

impl Config {
    /// Returns the seeds in effect: `list-of-urls` when set, `start-urls` otherwise
    pub fn seed_urls(&self) -> &[String] {
        if self.list_of_urls.is_empty() {
            &self.start_urls
        } else {
            &self.list_of_urls
        }
    }

    /// Returns the selector used to find followable links
    pub fn link_selector(&self) -> &str {
        self.clickable_elements.as_deref().unwrap_or("a")
    }

    /// Returns the required attributes, falling back to the selector keys
    pub fn effective_required_attributes(&self) -> Vec<String> {
        if self.required_attributes.is_empty() {
            self.selectors.iter().map(|s| s.key.clone()).collect()
        } else {
            self.required_attributes.clone()
        }
    }

    /// Returns the pseudo-URL patterns in effect, one `<seed>[.*]` per seed when none are configured
    pub fn effective_pseudo_urls(&self) -> Vec<String> {
        if self.pseudo_urls.is_empty() {
            self.seed_urls()
                .iter()
                .map(|seed| format!("{}[.*]", escape_pseudo_literal(seed)))
                .collect()
        } else {
            self.pseudo_urls.clone()
        }
    }
}

/// Escapes `[` in a literal so it is not read as a regex section
fn escape_pseudo_literal(literal: &str) -> String {
    literal.replace('[', "\\[")
}
