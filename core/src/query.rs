use crate::index::InvertedIndex;
use crate::result::QueryResult;
use crate::tokenizer::unique_stems;
use crate::work_queue::WorkQueue;
use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

pub type QueryCache = BTreeMap<String, Vec<QueryResult>>;

/// Cache key of a query: its unique sorted stems joined by single spaces.
pub fn query_key(stems: &BTreeSet<String>) -> String {
    stems.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

/// Turns query lines into ranked results, memoizing one result list per
/// normalized query. Clones share the same index and cache.
#[derive(Clone)]
pub struct QueryHandler {
    index: Arc<InvertedIndex>,
    partial: bool,
    cache: Arc<RwLock<QueryCache>>,
}

impl QueryHandler {
    pub fn new(index: Arc<InvertedIndex>, partial: bool) -> Self {
        Self { index, partial, cache: Arc::new(RwLock::new(QueryCache::new())) }
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn index(&self) -> &Arc<InvertedIndex> {
        &self.index
    }

    /// Searches for `line` and caches the results under its normalized key.
    /// Blank lines (no stems) are ignored.
    pub fn handle_line(&self, line: &str) {
        let stems = unique_stems(line);
        if stems.is_empty() {
            return;
        }
        let key = query_key(&stems);
        if self.cache.read().contains_key(&key) {
            return;
        }
        let results = self.index.search(&stems, self.partial);
        // a concurrent task may have stored the same key meanwhile; same value
        self.cache.write().insert(key, results);
    }

    /// Handles every line of a query file on the calling thread.
    pub fn handle_file(&self, path: &Path) -> Result<()> {
        let reader = open_queries(path)?;
        for line in reader.lines() {
            self.handle_line(&line?);
        }
        Ok(())
    }

    /// Submits one task per query line and waits for all of them.
    pub fn handle_file_concurrent(&self, path: &Path, queue: &WorkQueue) -> Result<()> {
        let reader = open_queries(path)?;
        let mut read_error = None;
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    let handler = self.clone();
                    queue.execute(move || handler.handle_line(&line));
                }
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            }
        }
        queue.finish();
        match read_error {
            Some(e) => Err(e).with_context(|| format!("reading queries from {}", path.display())),
            None => Ok(()),
        }
    }

    /// Results for an ad-hoc query. Cached results are returned when present;
    /// otherwise the search runs without touching the cache, so interactive
    /// lookups never change what [`QueryHandler::results`] reports.
    pub fn results_for(&self, line: &str) -> Vec<QueryResult> {
        let stems = unique_stems(line);
        if stems.is_empty() {
            return Vec::new();
        }
        if let Some(cached) = self.cache.read().get(&query_key(&stems)) {
            return cached.clone();
        }
        self.index.search(&stems, self.partial)
    }

    pub fn query_lines(&self) -> Vec<String> {
        self.cache.read().keys().cloned().collect()
    }

    pub fn has_query(&self, key: &str) -> bool {
        self.cache.read().contains_key(key)
    }

    /// Snapshot of every cached query and its ranked results.
    pub fn results(&self) -> QueryCache {
        self.cache.read().clone()
    }

    pub fn write_results(&self, path: &Path) -> Result<()> {
        crate::persist::save_results(path, &self.cache.read())
    }
}

fn open_queries(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("opening query file {}", path.display()))?;
    Ok(BufReader::new(file))
}
