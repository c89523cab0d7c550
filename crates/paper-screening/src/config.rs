//! Configuration for the screening pipeline.

use std::path::PathBuf;
use std::time::Duration;

use crate::providers::{ProviderConfig, ProviderKind};

/// Endpoint and limit constants.
pub mod api {
    use std::time::Duration;

    /// arXiv Atom query endpoint.
    pub const ARXIV_API: &str = "http://export.arxiv.org/api/query";

    /// Semantic Scholar Graph API endpoint.
    pub const SEMANTIC_SCHOLAR_API: &str = "https://api.semanticscholar.org/graph/v1";

    /// Google Scholar search page (HTML only, no structured API).
    pub const SCHOLAR_SEARCH: &str = "https://scholar.google.com/scholar";

    /// Timeout for structured source APIs.
    pub const SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Timeout for HTML scraping, which is slower to respond.
    pub const SCRAPE_TIMEOUT: Duration = Duration::from_secs(15);

    /// Timeout for a single AI provider call.
    pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Retries applied by the HTTP middleware to transient failures.
    pub const MAX_RETRIES: u32 = 2;

    /// HTTP response cache TTL (5 minutes).
    pub const RESPONSE_CACHE_TTL: Duration = Duration::from_secs(300);

    /// HTTP response cache size.
    pub const RESPONSE_CACHE_MAX_SIZE: u64 = 500;

    /// Content reader cache capacity.
    pub const CONTENT_CACHE_SIZE: usize = 50;

    /// Analysis cache capacity.
    pub const ANALYSIS_CACHE_SIZE: usize = 1000;

    /// Maximum persisted analysis results.
    pub const MAX_HISTORY: usize = 100;

    /// Maximum status log entries.
    pub const MAX_STATUS_ENTRIES: usize = 50;

    /// Upper bound on records requested from a single backend.
    pub const MAX_RESULTS_PER_SOURCE: usize = 100;

    /// Maximum idle connections per host.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// Semantic Scholar field sets for API requests.
pub mod fields {
    /// Fields needed to build a canonical record from search results.
    pub const SEARCH: &[&str] = &[
        "paperId",
        "title",
        "abstract",
        "authors",
        "year",
        "citationCount",
        "influentialCitationCount",
        "fieldsOfStudy",
        "venue",
        "publicationDate",
        "openAccessPdf",
        "externalIds",
        "url",
    ];

    /// Fields requested by the content reader.
    pub const CONTENT: &[&str] = &[
        "paperId",
        "title",
        "abstract",
        "authors",
        "year",
        "citationCount",
        "references",
        "openAccessPdf",
        "url",
    ];

    /// Fields of the linked paper in citation and reference listings.
    pub const CITATION: &[&str] = &[
        "paperId",
        "title",
        "abstract",
        "authors",
        "year",
        "citationCount",
        "externalIds",
        "url",
    ];

    /// Fields requested for an author profile.
    pub const AUTHOR: &[&str] = &[
        "authorId",
        "name",
        "hIndex",
        "citationCount",
        "paperCount",
        "papers.paperId",
        "papers.title",
        "papers.year",
        "papers.citationCount",
    ];
}

/// Pipeline configuration.
#[derive(Clone)]
pub struct Config {
    /// Semantic Scholar API key (optional).
    pub semantic_scholar_api_key: Option<String>,

    /// AI provider used for analysis.
    pub provider: ProviderConfig,

    /// arXiv query endpoint.
    pub arxiv_api_url: String,

    /// Semantic Scholar Graph API base URL.
    pub semantic_scholar_api_url: String,

    /// Scholar search page URL.
    pub scholar_search_url: String,

    /// Timeout for structured source calls.
    pub source_timeout: Duration,

    /// Timeout for scraped pages.
    pub scrape_timeout: Duration,

    /// Timeout for provider calls.
    pub provider_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Transient-failure retries applied by the HTTP middleware.
    pub max_retries: u32,

    /// HTTP response cache TTL.
    pub response_cache_ttl: Duration,

    /// HTTP response cache size.
    pub response_cache_max_size: u64,

    /// Content reader cache capacity.
    pub content_cache_size: usize,

    /// Analysis cache capacity.
    pub analysis_cache_size: usize,

    /// Persisted result cap.
    pub max_history: usize,

    /// Status log cap.
    pub max_status_entries: usize,

    /// Directory for persisted collections (`None` keeps everything in memory).
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Create a configuration with production endpoints.
    #[must_use]
    pub fn new(semantic_scholar_api_key: Option<String>, provider: ProviderConfig) -> Self {
        Self {
            semantic_scholar_api_key,
            provider,
            arxiv_api_url: api::ARXIV_API.to_string(),
            semantic_scholar_api_url: api::SEMANTIC_SCHOLAR_API.to_string(),
            scholar_search_url: api::SCHOLAR_SEARCH.to_string(),
            source_timeout: api::SOURCE_TIMEOUT,
            scrape_timeout: api::SCRAPE_TIMEOUT,
            provider_timeout: api::PROVIDER_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            max_retries: api::MAX_RETRIES,
            response_cache_ttl: api::RESPONSE_CACHE_TTL,
            response_cache_max_size: api::RESPONSE_CACHE_MAX_SIZE,
            content_cache_size: api::CONTENT_CACHE_SIZE,
            analysis_cache_size: api::ANALYSIS_CACHE_SIZE,
            max_history: api::MAX_HISTORY,
            max_status_entries: api::MAX_STATUS_ENTRIES,
            data_dir: None,
        }
    }

    /// Create a test configuration with every endpoint on one mock server.
    ///
    /// The provider keeps its kind and key but is redirected to
    /// `{base_url}/provider`.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        let provider = ProviderConfig::rule_based().with_base_url(format!("{base_url}/provider"));
        Self {
            semantic_scholar_api_key: None,
            provider,
            arxiv_api_url: format!("{base_url}/api/query"),
            semantic_scholar_api_url: format!("{base_url}/graph/v1"),
            scholar_search_url: format!("{base_url}/scholar"),
            source_timeout: Duration::from_secs(5),
            scrape_timeout: Duration::from_secs(5),
            provider_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            max_retries: 0, // Tests count requests exactly
            response_cache_ttl: Duration::from_secs(0),
            response_cache_max_size: 0,
            content_cache_size: api::CONTENT_CACHE_SIZE,
            analysis_cache_size: api::ANALYSIS_CACHE_SIZE,
            max_history: api::MAX_HISTORY,
            max_status_entries: api::MAX_STATUS_ENTRIES,
            data_dir: None,
        }
    }

    /// Create configuration from environment variables (and a `.env` file if present).
    ///
    /// # Errors
    ///
    /// Returns error if `AI_PROVIDER` names an unknown provider.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let semantic_scholar_api_key = std::env::var("SEMANTIC_SCHOLAR_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let kind = match std::env::var("AI_PROVIDER") {
            Ok(name) => name.parse::<ProviderKind>()?,
            Err(_) => ProviderKind::RuleBased,
        };
        let mut provider = ProviderConfig::new(kind, std::env::var("AI_API_KEY").ok());
        if let Ok(model) = std::env::var("AI_MODEL") {
            provider = provider.with_model(model);
        }

        let mut config = Self::new(semantic_scholar_api_key, provider);
        config.data_dir = std::env::var("PAPER_SCREENING_DATA_DIR").ok().map(PathBuf::from);
        Ok(config)
    }

    /// Set the persistence directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Replace the provider, keeping any base URL override already configured.
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        let base_url = self.provider.base_url.take();
        self.provider = provider;
        if self.provider.base_url.is_none() {
            self.provider.base_url = base_url;
        }
        self
    }

    /// Check if a Semantic Scholar API key is configured.
    #[must_use]
    pub const fn has_semantic_scholar_key(&self) -> bool {
        self.semantic_scholar_api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, ProviderConfig::rule_based())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("has_semantic_scholar_key", &self.has_semantic_scholar_key())
            .field("provider", &self.provider)
            .field("arxiv_api_url", &self.arxiv_api_url)
            .field("semantic_scholar_api_url", &self.semantic_scholar_api_url)
            .field("max_history", &self.max_history)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}
