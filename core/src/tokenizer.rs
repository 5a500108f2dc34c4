use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Anything that is neither a letter nor whitespace, including the combining
    // marks left behind by canonical decomposition.
    static ref CLEAN: Regex = Regex::new(r"[^\p{Alphabetic}\s]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Decompose (NFD), drop non-alphabetic characters and lowercase.
pub fn clean(text: &str) -> String {
    let decomposed = text.nfd().collect::<String>();
    CLEAN.replace_all(&decomposed, "").to_lowercase()
}

/// Clean and split into words, in document order.
pub fn parse(text: &str) -> Vec<String> {
    clean(text).split_whitespace().map(str::to_string).collect()
}

pub fn stem(word: &str) -> String {
    STEMMER.stem(word).into_owned()
}

/// Cleaned and stemmed words in document order.
pub fn list_stems(text: &str) -> Vec<String> {
    clean(text).split_whitespace().map(stem).collect()
}

/// Sorted, deduplicated stems of a line. This is what a query is made of.
pub fn unique_stems(text: &str) -> BTreeSet<String> {
    clean(text).split_whitespace().map(stem).collect()
}

/// Tokenize text into (stem, position) pairs with 1-based positions.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    list_stems(text)
        .into_iter()
        .enumerate()
        .map(|(i, stem)| (stem, i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Running, runner's run!");
        assert_eq!(t.first(), Some(&("run".to_string(), 1)));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn clean_strips_digits_and_accents() {
        assert_eq!(clean("Sally sells 76 sea-shells, soirée!"), "sally sells  seashells soiree");
    }
}
