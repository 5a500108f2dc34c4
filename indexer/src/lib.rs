//! Ingestion pipeline shared by the `wordex` CLI and the search server:
//! pick a source, fill the index (optionally on a worker pool), then write
//! whichever artifacts were asked for.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wordex_core::persist::{save_counts, save_index};
use wordex_core::work_queue::DEFAULT_THREADS;
use wordex_core::{FileIndexer, InvertedIndex, QueryHandler, WorkQueue};
use wordex_crawler::WebCrawler;

/// Where documents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A text file, or a directory walked for `.txt`/`.text` files.
    Text(PathBuf),
    /// A crawl seed and its page budget.
    Html { seed: String, max: usize },
}

/// One run of the pipeline. Every output is optional and independent.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub source: Option<Source>,
    /// `Some(n)` runs ingestion and queries on an `n`-thread pool.
    pub threads: Option<usize>,
    pub partial: bool,
    pub index_out: Option<PathBuf>,
    pub counts_out: Option<PathBuf>,
    pub queries: Option<PathBuf>,
    pub results_out: Option<PathBuf>,
}

impl Options {
    /// Crawls always need a pool; text ingestion only when threads were requested.
    pub fn worker_threads(&self) -> Option<usize> {
        match (&self.source, self.threads) {
            (_, Some(n)) => Some(n),
            (Some(Source::Html { .. }), None) => Some(DEFAULT_THREADS),
            _ => None,
        }
    }
}

/// Shared index, its query handler and the (optional) worker pool.
pub struct Engine {
    index: Arc<InvertedIndex>,
    queries: QueryHandler,
    queue: Option<WorkQueue>,
}

impl Engine {
    pub fn new(threads: Option<usize>, partial: bool) -> Result<Self> {
        let index = Arc::new(InvertedIndex::new());
        let queue = match threads {
            Some(n) => Some(WorkQueue::new(n).context("starting worker threads")?),
            None => None,
        };
        let queries = QueryHandler::new(Arc::clone(&index), partial);
        Ok(Self { index, queries, queue })
    }

    pub fn index(&self) -> &Arc<InvertedIndex> { &self.index }

    pub fn queries(&self) -> &QueryHandler { &self.queries }

    pub fn is_concurrent(&self) -> bool { self.queue.is_some() }

    /// Fills the index from `source`; returns the files or pages indexed.
    pub fn ingest(&self, source: &Source) -> Result<usize> {
        match source {
            Source::Text(path) => {
                let indexer = FileIndexer::new(Arc::clone(&self.index));
                let built = match &self.queue {
                    Some(queue) => indexer.build_concurrent(path, queue),
                    None => indexer.build(path),
                };
                built.with_context(|| format!("indexing {}", path.display()))
            }
            Source::Html { seed, max } => {
                let crawler = WebCrawler::with_fetcher(Arc::clone(&self.index))?;
                let summary = match &self.queue {
                    Some(queue) => crawler.crawl(seed, *max, queue)?,
                    None => {
                        let queue = WorkQueue::with_default_threads()?;
                        crawler.crawl(seed, *max, &queue)?
                    }
                };
                Ok(summary.indexed)
            }
        }
    }

    pub fn write_index(&self, path: &Path) -> Result<()> {
        save_index(path, &self.index).with_context(|| format!("writing index to {}", path.display()))
    }

    pub fn write_counts(&self, path: &Path) -> Result<()> {
        save_counts(path, &self.index)
            .with_context(|| format!("writing counts to {}", path.display()))
    }

    pub fn handle_queries(&self, path: &Path) -> Result<()> {
        match &self.queue {
            Some(queue) => self.queries.handle_file_concurrent(path, queue),
            None => self.queries.handle_file(path),
        }
    }

    pub fn write_results(&self, path: &Path) -> Result<()> {
        self.queries.write_results(path)
    }

    /// Stops the pool, waiting for in-flight work.
    pub fn shutdown(self) {
        if let Some(queue) = self.queue {
            queue.join();
        }
    }
}

/// Runs every requested stage in order. A failing stage is logged and the
/// later stages still run against whatever the index holds; only pool
/// start-up failure aborts.
pub fn run(opts: &Options) -> Result<Engine> {
    let engine = Engine::new(opts.worker_threads(), opts.partial)?;

    if let Some(source) = &opts.source {
        match engine.ingest(source) {
            Ok(n) => tracing::info!(
                documents = n,
                words = engine.index.num_words(),
                locations = engine.index.num_locations(),
                "index built"
            ),
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "ingestion failed"),
        }
    }

    let stages: [(&Option<PathBuf>, &str, fn(&Engine, &Path) -> Result<()>); 4] = [
        (&opts.index_out, "index", Engine::write_index),
        (&opts.counts_out, "counts", Engine::write_counts),
        (&opts.queries, "queries", Engine::handle_queries),
        (&opts.results_out, "results", Engine::write_results),
    ];
    for (path, stage, step) in stages {
        let Some(path) = path else { continue };
        if let Err(e) = step(&engine, path) {
            tracing::warn!(stage, path = %path.display(), error = %format!("{e:#}"), "stage failed");
        }
    }
    Ok(engine)
}
