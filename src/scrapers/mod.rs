//! Site-specific result page parsers

pub mod staticice;

pub use staticice::parse_page;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::Url;

    use crate::error::ScrapeError;
    use crate::traits::{PageSource, UpstreamConfig};

    /// One StaticICE-style result row.
    pub fn listing_row(price: &str, name: &str, store_label: &str, href: &str, extra: &str) -> String {
        let store_name = store_label.split('(').next().unwrap_or(store_label).trim();
        format!(
            r#"<tr valign="top"><td><a href="{href}">{price}</a></td><td>{name}
<br><a href="/cgi-bin/redirect.cgi?store={store_name}" title="Click to visit {store_name}">{store_label}</a> {extra}</td></tr>"#
        )
    }

    pub fn results_page(rows: &[String]) -> String {
        format!(
            "<html><body><table>{}</table></body></html>",
            rows.join("\n")
        )
    }

    /// A page of `count` distinct listings priced from `base_price` downwards.
    pub fn numbered_page(page: u32, count: u32, base_price: u32) -> String {
        let rows: Vec<String> = (0..count)
            .map(|i| {
                listing_row(
                    &format!("${}.00", base_price - i),
                    &format!("Item p{page} #{i}"),
                    "Scorptec (VIC)",
                    &format!("/cgi-bin/redirect.cgi?page={page}&n={i}"),
                    "In Stock",
                )
            })
            .collect();
        results_page(&rows)
    }

    /// Canned response for one upstream URL
    #[derive(Debug, Clone)]
    pub enum Scripted {
        Markup(String),
        Fail(u16),
    }

    /// In-memory page source keyed by result offset.
    ///
    /// Offsets without a script answer with an empty page. Every requested
    /// URL is recorded.
    pub struct ScriptedSource {
        upstream: UpstreamConfig,
        pages: HashMap<u32, Scripted>,
        single: Option<Scripted>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        pub fn new() -> Self {
            Self {
                upstream: UpstreamConfig::staticice("https://www.staticice.com.au"),
                pages: HashMap::new(),
                single: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_page(mut self, start: u32, page: Scripted) -> Self {
            self.pages.insert(start, page);
            self
        }

        pub fn with_single(mut self, page: Scripted) -> Self {
            self.single = Some(page);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// `start` offsets of the paginated requests, in request order
        pub fn requested_offsets(&self) -> Vec<u32> {
            self.calls()
                .iter()
                .filter_map(|url| start_param(url))
                .collect()
        }
    }

    fn start_param(url: &str) -> Option<u32> {
        Url::parse(url)
            .ok()?
            .query_pairs()
            .find(|(key, _)| key == "start")
            .and_then(|(_, value)| value.parse().ok())
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        fn upstream(&self) -> &UpstreamConfig {
            &self.upstream
        }

        async fn fetch_url(&self, url: &str) -> Result<String, ScrapeError> {
            self.calls.lock().unwrap().push(url.to_string());

            let script = match start_param(url) {
                Some(start) => self.pages.get(&start),
                None => self.single.as_ref(),
            };

            match script {
                Some(Scripted::Markup(html)) => Ok(html.clone()),
                Some(Scripted::Fail(status)) => Err(ScrapeError::UpstreamStatus {
                    status: *status,
                    url: url.to_string(),
                }),
                None => Ok(results_page(&[])),
            }
        }
    }
}
