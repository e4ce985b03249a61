use crate::app::ports::HttpClientPort;
use crate::config::CrawlerConfig;
use crate::error::{Result, ScraperError};
use crate::types::Link;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

static LAST_PAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"bpn-last-page-link"><a href=".+?/page/(\d+?)/.+" title="Navigate to last page">"#,
    )
    .expect("last-page pattern compiles")
});

/// Outcome of walking the paginated index.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// In page order, duplicates kept
    pub links: Vec<Link>,
    pub last_page: u32,
    /// Index pages after the first that could not be fetched
    pub failed_pages: Vec<u32>,
}

pub struct LinkCrawler {
    http: Arc<dyn HttpClientPort>,
    config: CrawlerConfig,
    link_re: Regex,
}

impl LinkCrawler {
    pub fn new(http: Arc<dyn HttpClientPort>, config: CrawlerConfig) -> Result<Self> {
        let pattern = format!(
            r#"<h3 class="event-title"><a href="({}.+?/)" title=".+?">.+?</a></h3>"#,
            regex::escape(&config.event_link_prefix)
        );
        let link_re = Regex::new(&pattern)
            .map_err(|e| ScraperError::Config(format!("bad event link prefix: {e}")))?;
        Ok(Self {
            http,
            config,
            link_re,
        })
    }

    pub fn page_url(&self, page_no: u32) -> String {
        format!("{}{}/", self.config.index_url, page_no)
    }

    pub fn last_page_no(body: &str) -> Result<u32> {
        let caps = LAST_PAGE_RE.captures(body).ok_or_else(|| {
            ScraperError::Crawl("last-page pagination marker not found on index page 1".into())
        })?;
        caps[1]
            .parse()
            .map_err(|e| ScraperError::Crawl(format!("bad last page number '{}': {e}", &caps[1])))
    }

    pub fn extract_links(&self, body: &str) -> Vec<Link> {
        self.link_re
            .captures_iter(body)
            .map(|c| c[1].to_string())
            .collect()
    }

    /// Walks pages `1..=last_page`. Only page 1 is load-bearing: without it
    /// there is no bound, so its failure aborts the crawl.
    #[instrument(skip(self), fields(index = %self.config.index_url))]
    pub async fn crawl(&self) -> Result<CrawlReport> {
        let first_url = self.page_url(1);
        let first = self
            .http
            .get(&first_url)
            .await
            .map_err(|e| ScraperError::Crawl(format!("index page 1 unavailable: {e}")))?
            .text();

        let mut last_page = Self::last_page_no(&first)?;
        if let Some(cap) = self.config.max_pages {
            if cap < last_page {
                info!(last_page, cap, "Capping pagination");
                last_page = cap;
            }
        }
        info!(last_page, "Discovered pagination bound");

        let mut links = self.extract_links(&first);
        counter!("seattle_events_index_pages_fetched_total").increment(1);
        debug!(page = 1, found = links.len(), "Index page scanned");

        let mut failed_pages = Vec::new();
        for page_no in 2..=last_page {
            if self.config.page_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)).await;
            }
            let url = self.page_url(page_no);
            match self.http.get(&url).await {
                Ok(resp) => {
                    let found = self.extract_links(&resp.text());
                    debug!(page = page_no, found = found.len(), "Index page scanned");
                    counter!("seattle_events_index_pages_fetched_total").increment(1);
                    links.extend(found);
                }
                Err(e) => {
                    warn!(page = page_no, error = %e, "Skipping index page");
                    counter!("seattle_events_index_page_errors_total").increment(1);
                    failed_pages.push(page_no);
                }
            }
        }

        counter!("seattle_events_links_discovered_total").increment(links.len() as u64);
        info!(
            links = links.len(),
            failed_pages = failed_pages.len(),
            "Link crawl finished"
        );
        Ok(CrawlReport {
            links,
            last_page,
            failed_pages,
        })
    }
}
