use serde::ser::{Error as _, SerializeStruct};
use serde::{Serialize, Serializer};
use serde_json::value::RawValue;
use std::cmp::Ordering;

/// One ranked hit of a query at a location.
///
/// Created the first time a query word is seen at `location`, with the
/// location's word count captured at that moment; every further matching word
/// is folded in with [`QueryResult::add_matches`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    location: String,
    matches: usize,
    total_words: usize,
    score: f64,
}

impl QueryResult {
    pub fn new(location: impl Into<String>, total_words: usize) -> Self {
        Self { location: location.into(), matches: 0, total_words, score: 0.0 }
    }

    pub fn add_matches(&mut self, matches: usize) {
        self.matches += matches;
        self.score = if self.total_words == 0 {
            0.0
        } else {
            self.matches as f64 / self.total_words as f64
        };
    }

    pub fn location(&self) -> &str { &self.location }
    pub fn matches(&self) -> usize { self.matches }
    pub fn total_words(&self) -> usize { self.total_words }
    pub fn score(&self) -> f64 { self.score }
}

impl Eq for QueryResult {}

impl Ord for QueryResult {
    /// Best first: higher score, then fewer total words, then the
    /// lexicographically later location.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.total_words.cmp(&other.total_words))
            .then_with(|| other.location.cmp(&self.location))
    }
}

impl PartialOrd for QueryResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for QueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // scores are always written with exactly 8 decimal places
        let score = RawValue::from_string(format!("{:.8}", self.score)).map_err(S::Error::custom)?;
        let mut entry = serializer.serialize_struct("QueryResult", 3)?;
        entry.serialize_field("count", &self.matches)?;
        entry.serialize_field("score", &score)?;
        entry.serialize_field("where", &self.location)?;
        entry.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(location: &str, matches: usize, total: usize) -> QueryResult {
        let mut r = QueryResult::new(location, total);
        r.add_matches(matches);
        r
    }

    #[test]
    fn ranks_by_score_then_length_then_reverse_location() {
        let mut results = vec![
            result("a", 1, 4),
            result("b", 2, 4),
            result("c", 1, 2),
            result("d", 1, 2),
            result("e", 1, 10),
        ];
        results.sort();
        let order: Vec<&str> = results.iter().map(QueryResult::location).collect();
        assert_eq!(order, vec!["d", "c", "b", "a", "e"]);
    }

    #[test]
    fn serializes_with_fixed_precision() {
        let json = serde_json::to_string(&result("doc1", 1, 3)).unwrap();
        assert_eq!(json, r#"{"count":1,"score":0.33333333,"where":"doc1"}"#);
    }
}
