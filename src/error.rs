use thiserror::Error;

/// Failures of the price-lookup path.
///
/// A page that parses to zero listings is not an error; callers see an empty
/// `Vec` and treat it as the end of the results.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream returned HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The background search task was cancelled before it finished
    #[error("search interrupted: {0}")]
    Interrupted(String),
}

impl ScrapeError {
    /// True when the third-party site could not be reached or refused the
    /// request; these are recovered by skipping the page or falling back.
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::UpstreamStatus { .. })
    }
}
