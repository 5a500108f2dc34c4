use crate::index::{InvertedIndex, WordIndex};
use crate::tokenizer::tokenize;
use crate::work_queue::WorkQueue;
use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const TEXT_EXTENSIONS: &[&str] = &[".txt", ".text"];

/// True for names ending in `.txt` or `.text`, ignoring case.
pub fn is_text_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .is_some_and(|name| TEXT_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
}

/// Files to index under `root`. A root that is itself a file is always
/// included; inside directories only text files are.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        bail!("input path {} does not exist", root.display());
    }
    if !root.is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_text_file(entry.path()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "skipping unreadable entry"),
        }
    }
    Ok(files)
}

/// Location string used for a file in the index.
pub fn location_of(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Builds the shared index from a local file tree.
#[derive(Clone)]
pub struct FileIndexer {
    index: Arc<InvertedIndex>,
}

impl FileIndexer {
    pub fn new(index: Arc<InvertedIndex>) -> Self {
        Self { index }
    }

    /// Indexes every file on the calling thread, one posting at a time.
    /// Unreadable files are logged and skipped. Returns the number indexed.
    pub fn build(&self, root: &Path) -> Result<usize> {
        let mut indexed = 0;
        for file in collect_files(root)? {
            match fs::read_to_string(&file) {
                Ok(text) => {
                    let location = location_of(&file);
                    for (stem, position) in tokenize(&text) {
                        self.index.add(&stem, &location, position);
                    }
                    indexed += 1;
                }
                Err(e) => tracing::warn!(file = %file.display(), error = %e, "skipping file"),
            }
        }
        tracing::info!(files = indexed, words = self.index.num_words(), "indexed file tree");
        Ok(indexed)
    }

    /// One task per file; each builds a local index and merges it once.
    /// Returns after the queue has drained, with the number of files scheduled.
    pub fn build_concurrent(&self, root: &Path, queue: &WorkQueue) -> Result<usize> {
        let files = collect_files(root)?;
        let scheduled = files.len();
        for file in files {
            let indexer = self.clone();
            queue.execute(move || {
                if let Err(e) = indexer.index_file(&file) {
                    tracing::warn!(file = %file.display(), error = %e, "skipping file");
                }
            });
        }
        queue.finish();
        tracing::info!(files = scheduled, words = self.index.num_words(), "indexed file tree");
        Ok(scheduled)
    }

    pub fn index_file(&self, file: &Path) -> std::io::Result<()> {
        let text = fs::read_to_string(file)?;
        let local = WordIndex::from_document(&location_of(file), &text);
        tracing::debug!(file = %file.display(), words = local.num_words(), "merging file");
        self.index.merge(local);
        Ok(())
    }
}
