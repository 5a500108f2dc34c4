use crate::fetcher::HtmlFetcher;
use crate::html::{canonicalize, extract_links, strip_html};
use crate::CrawlError;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use wordex_core::{InvertedIndex, Spawner, WordIndex, WorkQueue};

/// Redirects followed per page.
pub const REDIRECT_LIMIT: usize = 3;

/// Where crawled pages come from. [`HtmlFetcher`] is the network
/// implementation; anything returning HTML bodies by URL will do.
pub trait PageSource: Send + Sync {
    /// HTML body of `url`, or `None` if the page should contribute nothing.
    fn fetch(&self, url: &Url, redirects: usize) -> Option<String>;
}

impl PageSource for HtmlFetcher {
    fn fetch(&self, url: &Url, redirects: usize) -> Option<String> {
        HtmlFetcher::fetch(self, url, redirects)
    }
}

/// Outcome of one crawl: pages scheduled (including ones that failed to
/// fetch) and pages whose text reached the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub visited: usize,
    pub indexed: usize,
}

struct CrawlState {
    index: Arc<InvertedIndex>,
    source: Arc<dyn PageSource>,
    visited: RwLock<HashSet<String>>,
    max: usize,
    indexed: AtomicUsize,
}

impl CrawlState {
    fn crawl_page(self: Arc<Self>, url: Url, spawner: Spawner) {
        let Some(body) = self.source.fetch(&url, REDIRECT_LIMIT) else {
            debug!(url = %url, "no content");
            return;
        };

        let links = extract_links(&body, &url);
        {
            // membership test, budget check and scheduling happen under one write lock
            let mut visited = self.visited.write();
            for link in links {
                if visited.len() >= self.max {
                    break;
                }
                if visited.insert(link.as_str().to_string()) {
                    let state = Arc::clone(&self);
                    let next = spawner.clone();
                    spawner.execute(move || state.crawl_page(link, next));
                }
            }
        }

        let local = WordIndex::from_document(url.as_str(), &strip_html(&body));
        debug!(url = %url, words = local.num_words(), "indexed page");
        self.index.merge(local);
        self.indexed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Breadth-limited crawler feeding a shared [`InvertedIndex`].
#[derive(Clone)]
pub struct WebCrawler {
    index: Arc<InvertedIndex>,
    source: Arc<dyn PageSource>,
}

impl WebCrawler {
    pub fn new(index: Arc<InvertedIndex>, source: Arc<dyn PageSource>) -> Self {
        Self { index, source }
    }

    /// Crawler backed by a default [`HtmlFetcher`].
    pub fn with_fetcher(index: Arc<InvertedIndex>) -> Result<Self, crate::FetchError> {
        Ok(Self::new(index, Arc::new(HtmlFetcher::new()?)))
    }

    pub fn index(&self) -> &Arc<InvertedIndex> { &self.index }

    /// Crawls from `seed`, visiting at most `max` distinct canonical URLs.
    /// Blocks until `queue` drains. Only bad arguments are errors; pages that
    /// fail to fetch are skipped.
    pub fn crawl(&self, seed: &str, max: usize, queue: &WorkQueue) -> Result<CrawlSummary, CrawlError> {
        let seed = seed.trim();
        if seed.is_empty() {
            return Err(CrawlError::InvalidArgument("seed url is empty".into()));
        }
        if max == 0 {
            return Err(CrawlError::InvalidArgument("max pages must be at least 1".into()));
        }
        let seed = Url::parse(seed).map_err(|e| CrawlError::InvalidUrl(format!("{seed}: {e}")))?;
        if !matches!(seed.scheme(), "http" | "https") {
            return Err(CrawlError::InvalidUrl(format!("{seed}: only http and https are crawled")));
        }
        let seed = canonicalize(&seed);

        let state = Arc::new(CrawlState {
            index: Arc::clone(&self.index),
            source: Arc::clone(&self.source),
            visited: RwLock::new(HashSet::from([seed.as_str().to_string()])),
            max,
            indexed: AtomicUsize::new(0),
        });

        info!(seed = %seed, max, workers = queue.size(), "crawl started");
        let spawner = queue.spawner();
        let task_state = Arc::clone(&state);
        let task_spawner = spawner.clone();
        if !spawner.execute(move || task_state.crawl_page(seed, task_spawner)) {
            return Err(CrawlError::InvalidArgument("work queue is shut down".into()));
        }
        queue.finish();

        let summary = CrawlSummary {
            visited: state.visited.read().len(),
            indexed: state.indexed.load(Ordering::Relaxed),
        };
        info!(visited = summary.visited, indexed = summary.indexed, "crawl finished");
        Ok(summary)
    }
}
