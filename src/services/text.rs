//! Text scoring primitives for post search: a field-weighted lexical rank over
//! English-stemmed lexemes and trigram similarity over raw words.

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

pub const TITLE_WEIGHT: f64 = 1.0;
pub const BODY_WEIGHT: f64 = 0.4;

// sum(1/i^2) for i = 1..inf
const RANK_NORMALIZER: f64 = 1.644_934_066_85;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "did", "do", "does", "doing", "don", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "s", "same", "she",
    "should", "so", "some", "such", "t", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Lower-cased runs of alphanumeric characters.
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

fn english_stemmer() -> Stemmer {
    Stemmer::create(Algorithm::English)
}

fn lexemes_with<'a>(stemmer: &'a Stemmer, text: &'a str) -> impl Iterator<Item = String> + 'a {
    words(text)
        .filter(|w| !is_stop_word(w))
        .map(move |w| stemmer.stem(&w).into_owned())
}

/// Stemmed, stop-word-free words of a text, so that "cooking" and "cooks"
/// both become "cook".
pub fn lexemes(text: &str) -> Vec<String> {
    let stemmer = english_stemmer();
    lexemes_with(&stemmer, text).collect()
}

/// The distinct searchable terms of a query, in first-seen order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    lexemes(query)
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Whether two texts consist of the same words, ignoring case and punctuation.
pub fn same_words(a: &str, b: &str) -> bool {
    words(a).eq(words(b))
}

/// Weighted term-match score of a document made of a title and a body.
///
/// `terms` must come from [`query_terms`]; the document is stemmed the same
/// way before matching. Every occurrence of a term contributes its field weight, damped by the
/// square of its ordinal (title occurrences come first). Term scores are
/// averaged over the query; a document missing any term scores zero.
pub fn lexical_rank(terms: &[String], title: &str, body: &str) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }

    let stemmer = english_stemmer();
    let title_words: Vec<String> = lexemes_with(&stemmer, title).collect();
    let body_words: Vec<String> = lexemes_with(&stemmer, body).collect();

    let mut total = 0.0;
    for term in terms {
        let weights = title_words
            .iter()
            .filter(|w| *w == term)
            .map(|_| TITLE_WEIGHT)
            .chain(body_words.iter().filter(|w| *w == term).map(|_| BODY_WEIGHT));

        let mut accumulated = 0.0;
        let mut best_weight = -1.0;
        let mut best_index = 0usize;
        for (j, weight) in weights.enumerate() {
            let damping = ((j + 1) * (j + 1)) as f64;
            accumulated += weight / damping;
            if weight > best_weight {
                best_weight = weight;
                best_index = j;
            }
        }

        if best_weight < 0.0 {
            return 0.0;
        }

        let best_damping = ((best_index + 1) * (best_index + 1)) as f64;
        total += (best_weight + accumulated - best_weight / best_damping) / RANK_NORMALIZER;
    }

    total / terms.len() as f64
}

/// The set of three-character windows over each word of a text, with every
/// word padded by two leading blanks and one trailing blank.
#[derive(Debug, Clone, Default)]
pub struct Trigrams(HashSet<[char; 3]>);

impl Trigrams {
    pub fn new(text: &str) -> Self {
        let mut set = HashSet::new();
        for word in words(text) {
            let padded: Vec<char> = [' ', ' ']
                .into_iter()
                .chain(word.chars())
                .chain(std::iter::once(' '))
                .collect();
            for window in padded.windows(3) {
                set.insert([window[0], window[1], window[2]]);
            }
        }
        Self(set)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shared trigrams over the union of both sets, in [0, 1].
    pub fn similarity(&self, other: &Trigrams) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let shared = self.0.intersection(&other.0).count();
        let union = self.len() + other.len() - shared;
        shared as f64 / union as f64
    }
}

pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    Trigrams::new(a).similarity(&Trigrams::new(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn words_are_lowercased_alphanumeric_runs() {
        let w: Vec<String> = words("Hello, World! Rust-2024").collect();
        assert_eq!(w, vec!["hello", "world", "rust", "2024"]);
    }

    #[test]
    fn query_terms_drop_stop_words_and_duplicates() {
        assert_eq!(query_terms("The rust and THE Rust book"), vec!["rust", "book"]);
        assert!(query_terms("the of and").is_empty());
    }

    #[test]
    fn query_terms_are_stemmed() {
        assert_eq!(query_terms("Cooking posts"), vec!["cook", "post"]);
        assert_eq!(query_terms("cooks cooking"), vec!["cook"]);
    }

    #[test]
    fn inflected_query_matches_base_form() {
        let terms = query_terms("cooking");
        let rank = lexical_rank(&terms, "Cook", "");
        assert!(approx(rank, 1.0 / RANK_NORMALIZER));

        let terms = query_terms("post");
        assert!(lexical_rank(&terms, "Other", "Older posts") > 0.0);
    }

    #[test]
    fn same_words_ignores_case_and_punctuation() {
        assert!(same_words("Rust", "  rust "));
        assert!(same_words("Hello, World!", "hello world"));
        assert!(!same_words("Notes on rust", "Rust"));
        assert!(!same_words("", "rust"));
    }

    #[test]
    fn single_title_hit_scores_full_weight() {
        let terms = query_terms("rust");
        let rank = lexical_rank(&terms, "Rust", "");
        assert!(approx(rank, 1.0 / RANK_NORMALIZER));
    }

    #[test]
    fn single_body_hit_scores_body_weight() {
        let terms = query_terms("rust");
        let rank = lexical_rank(&terms, "Other", "about rust");
        assert!(approx(rank, BODY_WEIGHT / RANK_NORMALIZER));
    }

    #[test]
    fn title_outranks_body() {
        let terms = query_terms("ownership");
        let in_title = lexical_rank(&terms, "Ownership", "");
        let in_body = lexical_rank(&terms, "Intro", "ownership");
        assert!(in_title > in_body);
    }

    #[test]
    fn repeated_occurrences_increase_rank() {
        let terms = query_terms("borrow");
        let once = lexical_rank(&terms, "", "borrow");
        let twice = lexical_rank(&terms, "", "borrow borrow");
        assert!(twice > once);
    }

    #[test]
    fn missing_term_zeroes_rank() {
        let terms = query_terms("rust python");
        assert_eq!(lexical_rank(&terms, "Rust", "only rust here"), 0.0);
    }

    #[test]
    fn identical_strings_have_similarity_one() {
        assert!(approx(trigram_similarity("word", "word"), 1.0));
    }

    #[test]
    fn similarity_matches_reference_values() {
        // "word" -> {"  w"," wo","wor","ord","rd "}, "two words" adds 8 more.
        let sim = trigram_similarity("word", "two words");
        assert!(approx(sim, 4.0 / 11.0));
    }

    #[test]
    fn unrelated_strings_have_no_similarity() {
        assert_eq!(trigram_similarity("abc", "xyz"), 0.0);
        assert_eq!(trigram_similarity("", "xyz"), 0.0);
    }

    #[test]
    fn similarity_is_case_insensitive() {
        assert!(approx(trigram_similarity("Rust", "rust"), 1.0));
    }
}
