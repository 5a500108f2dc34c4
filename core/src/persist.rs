//! JSON artifacts written at the end of a run: the index, the word counts and
//! the query results. All three are pretty-printed with two-space indentation
//! and keep their keys in ascending order.

use crate::index::{InvertedIndex, WordIndex};
use crate::query::QueryCache;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// `{ word: { location: [positions] } }`
pub fn save_index(path: &Path, index: &InvertedIndex) -> Result<()> {
    let guard = index.read();
    save_word_index(path, &guard)
}

pub fn save_word_index(path: &Path, index: &WordIndex) -> Result<()> {
    save_json(path, index.postings())
}

/// `{ location: word count }`
pub fn save_counts(path: &Path, index: &InvertedIndex) -> Result<()> {
    let guard = index.read();
    save_json(path, guard.counts())
}

/// `{ query: [ { count, score, where } ] }`
pub fn save_results(path: &Path, results: &QueryCache) -> Result<()> {
    save_json(path, results)
}
