use crate::result::QueryResult;
use crate::tokenizer::tokenize;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

/// Sorted, duplicate-free 1-based word positions within one location.
pub type Positions = BTreeSet<usize>;
/// Location (file path or canonical URL) -> positions of one word.
pub type PostingList = BTreeMap<String, Positions>;

/// Word-position index with per-location word counts.
///
/// Not synchronized; this is both the storage behind [`InvertedIndex`] and the
/// local index a single ingestion task builds for one document before merging.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WordIndex {
    words: BTreeMap<String, PostingList>,
    counts: BTreeMap<String, usize>,
}

impl WordIndex {
    pub fn new() -> Self { Self::default() }

    /// Local index of one document: every stem of `text` at its 1-based position.
    pub fn from_document(location: &str, text: &str) -> Self {
        let mut local = Self::new();
        for (stem, position) in tokenize(text) {
            local.add(&stem, location, position);
        }
        local
    }

    /// Records `word` at `position` in `location`. Returns false (and leaves
    /// the count alone) if that triple was already present.
    pub fn add(&mut self, word: &str, location: &str, position: usize) -> bool {
        let positions = self
            .words
            .entry(word.to_string())
            .or_default()
            .entry(location.to_string())
            .or_default();
        if !positions.insert(position) {
            return false;
        }
        *self.counts.entry(location.to_string()).or_insert(0) += 1;
        true
    }

    /// Unions `positions` into `word`/`location`; returns how many were new.
    pub fn add_all<I>(&mut self, word: &str, location: &str, positions: I) -> usize
    where
        I: IntoIterator<Item = usize>,
    {
        let existing = self
            .words
            .entry(word.to_string())
            .or_default()
            .entry(location.to_string())
            .or_default();
        let before = existing.len();
        existing.extend(positions);
        let added = existing.len() - before;
        if added > 0 {
            *self.counts.entry(location.to_string()).or_insert(0) += added;
        }
        added
    }

    /// Folds `other` into this index. Counts grow by the number of positions
    /// that were actually new, never by `other`'s own counts.
    pub fn merge(&mut self, other: WordIndex) {
        for (word, postings) in other.words {
            let target = self.words.entry(word).or_default();
            for (location, positions) in postings {
                let added = match target.entry(location.clone()) {
                    Entry::Vacant(slot) => {
                        let added = positions.len();
                        slot.insert(positions);
                        added
                    }
                    Entry::Occupied(mut slot) => {
                        let existing = slot.get_mut();
                        let before = existing.len();
                        existing.extend(positions);
                        existing.len() - before
                    }
                };
                if added > 0 {
                    *self.counts.entry(location).or_insert(0) += added;
                }
            }
        }
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    pub fn has_location(&self, word: &str, location: &str) -> bool {
        self.words.get(word).is_some_and(|postings| postings.contains_key(location))
    }

    pub fn has_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.positions_of(word, location).is_some_and(|p| p.contains(&position))
    }

    pub fn has_count(&self, location: &str) -> bool {
        self.counts.contains_key(location)
    }

    /// All indexed words in ascending order.
    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.words.keys().map(String::as_str)
    }

    pub fn locations_of(&self, word: &str) -> Option<&PostingList> {
        self.words.get(word)
    }

    pub fn positions_of(&self, word: &str, location: &str) -> Option<&Positions> {
        self.words.get(word)?.get(location)
    }

    pub fn count_of(&self, location: &str) -> usize {
        self.counts.get(location).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn postings(&self) -> &BTreeMap<String, PostingList> {
        &self.words
    }

    pub fn num_words(&self) -> usize { self.words.len() }
    pub fn num_locations(&self) -> usize { self.counts.len() }
    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    pub fn clear(&mut self) {
        self.words.clear();
        self.counts.clear();
    }

    pub fn search(&self, queries: &BTreeSet<String>, partial: bool) -> Vec<QueryResult> {
        if partial { self.partial_search(queries) } else { self.exact_search(queries) }
    }

    pub fn exact_search(&self, queries: &BTreeSet<String>) -> Vec<QueryResult> {
        let matched = queries.iter().filter_map(|query| self.words.get(query));
        self.score(matched)
    }

    /// Every indexed word starting with a query stem matches. A word reachable
    /// from several stems ("ru", "run" -> "running") is still counted once.
    pub fn partial_search(&self, queries: &BTreeSet<String>) -> Vec<QueryResult> {
        let mut matched: BTreeMap<&str, &PostingList> = BTreeMap::new();
        for stem in queries {
            let tail = self
                .words
                .range::<str, _>((Bound::Included(stem.as_str()), Bound::Unbounded))
                .take_while(|(word, _)| word.starts_with(stem.as_str()));
            for (word, postings) in tail {
                matched.insert(word.as_str(), postings);
            }
        }
        self.score(matched.into_values())
    }

    fn score<'a, I>(&'a self, matched: I) -> Vec<QueryResult>
    where
        I: IntoIterator<Item = &'a PostingList>,
    {
        let mut results: Vec<QueryResult> = Vec::new();
        let mut lookup: HashMap<&str, usize> = HashMap::new();
        for postings in matched {
            for (location, positions) in postings {
                let slot = *lookup.entry(location.as_str()).or_insert_with(|| {
                    results.push(QueryResult::new(location.as_str(), self.count_of(location)));
                    results.len() - 1
                });
                results[slot].add_matches(positions.len());
            }
        }
        results.sort();
        results
    }
}

/// Thread-safe [`WordIndex`].
///
/// Postings and counts sit behind one reader-writer lock, so a reader never
/// sees a location whose postings and count disagree. Accessors that return
/// views hold the read lock for as long as the view lives; do not call a
/// mutating method on the same thread while one is alive.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    inner: RwLock<WordIndex>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// See [`WordIndex::add`].
    pub fn add(&self, word: &str, location: &str, position: usize) -> bool {
        self.inner.write().add(word, location, position)
    }

    /// Folds a whole per-document index in under a single write lock.
    pub fn merge(&self, local: WordIndex) {
        if local.is_empty() {
            return;
        }
        self.inner.write().merge(local);
    }

    pub fn search(&self, queries: &BTreeSet<String>, partial: bool) -> Vec<QueryResult> {
        self.inner.read().search(queries, partial)
    }

    /// Read-only snapshot for several consistent lookups in a row.
    pub fn read(&self) -> RwLockReadGuard<'_, WordIndex> {
        self.inner.read()
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.inner.read().has_word(word)
    }

    pub fn has_location(&self, word: &str, location: &str) -> bool {
        self.inner.read().has_location(word, location)
    }

    pub fn has_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.inner.read().has_position(word, location, position)
    }

    pub fn locations_of(&self, word: &str) -> Option<MappedRwLockReadGuard<'_, PostingList>> {
        RwLockReadGuard::try_map(self.inner.read(), |index| index.locations_of(word)).ok()
    }

    pub fn positions_of(&self, word: &str, location: &str) -> Option<MappedRwLockReadGuard<'_, Positions>> {
        RwLockReadGuard::try_map(self.inner.read(), |index| index.positions_of(word, location)).ok()
    }

    pub fn count_of(&self, location: &str) -> usize {
        self.inner.read().count_of(location)
    }

    pub fn num_words(&self) -> usize { self.inner.read().num_words() }
    pub fn num_locations(&self) -> usize { self.inner.read().num_locations() }
    pub fn is_empty(&self) -> bool { self.inner.read().is_empty() }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

impl From<WordIndex> for InvertedIndex {
    fn from(index: WordIndex) -> Self {
        Self { inner: RwLock::new(index) }
    }
}
