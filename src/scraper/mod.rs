use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::ScrapeError;
use crate::traits::{PageSource, UpstreamConfig};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Server-side fetcher for upstream search pages.
///
/// Requests go out with a browser-like User-Agent and no caller context.
/// There is no retry and no caching; every call is one GET.
#[derive(Clone)]
pub struct ProxyFetcher {
    client: Client,
    upstream: UpstreamConfig,
}

impl ProxyFetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(upstream: UpstreamConfig, user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;

        Ok(Self { client, upstream })
    }
}

#[async_trait]
impl PageSource for ProxyFetcher {
    fn upstream(&self) -> &UpstreamConfig {
        &self.upstream
    }

    async fn fetch_url(&self, url: &str) -> Result<String, ScrapeError> {
        if !self.upstream.owns_url(url) {
            return Err(ScrapeError::MalformedInput(format!(
                "{url} is not a {} URL",
                self.upstream.name
            )));
        }

        debug!(%url, "Fetching upstream page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ScrapeError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Upstream returned an error status");
            return Err(ScrapeError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|source| ScrapeError::Network {
            url: url.to_string(),
            source,
        })
    }
}
