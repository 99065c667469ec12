//! Category naming from member titles.
//!
//! Each cluster is named independently: TF-IDF runs over the cluster's
//! own titles (one title = one document), the top-weighted terms are
//! picked, capitalized and joined into a short label. When the titles
//! carry too little signal the name degrades through a raw-frequency
//! ranking down to a generic placeholder, so naming never fails a run.

use keyword_extraction::tf_idf::{TfIdf, TfIdfParams};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Shared English stopword list.
static STOPWORDS: Lazy<Vec<String>> = Lazy::new(|| stop_words::get(stop_words::LANGUAGE::English));

/// Name used when no informative term survives filtering.
const FALLBACK_NAME: &str = "Miscellaneous";

/// How many terms make up a category name.
const LABEL_TERMS: usize = 3;

/// How many ranked terms to pull from TF-IDF before composing the label.
const RANKED_POOL: usize = 12;

/// Compose a short human-readable name for one cluster of titles.
pub fn name_cluster(titles: &[String]) -> String {
    if titles.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let mut terms = tfidf_ranked(titles);
    if terms.is_empty() {
        terms = frequency_ranked(titles);
    }
    if terms.is_empty() {
        log::debug!(
            "no informative terms in {} titles, using fallback name",
            titles.len()
        );
        return FALLBACK_NAME.to_string();
    }

    terms.truncate(LABEL_TERMS);
    compose_label(&terms)
}

/// Rank terms by TF-IDF weight across the cluster's titles. Ties are
/// broken alphabetically so the label is reproducible run to run.
fn tfidf_ranked(titles: &[String]) -> Vec<String> {
    let stop_words: &[String] = &STOPWORDS;
    let params = TfIdfParams::UnprocessedDocuments(titles, stop_words, None);
    let tfidf = TfIdf::new(params);

    let mut ranked: Vec<(String, f32)> = tfidf.get_ranked_word_scores(RANKED_POOL);
    ranked.retain(|(word, _)| word.chars().any(|c| c.is_alphanumeric()));
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    ranked.into_iter().map(|(word, _)| word).collect()
}

/// Raw term-frequency ranking, used when TF-IDF produces nothing (for
/// instance a cluster of one-word titles all sharing the same term).
fn frequency_ranked(titles: &[String]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for title in titles {
        for token in tokenize(title) {
            *counts.entry(token).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ranked.into_iter().map(|(word, _)| word).collect()
}

/// Lowercased alphanumeric tokens with stopwords and single letters
/// removed.
fn tokenize(title: &str) -> impl Iterator<Item = String> + '_ {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 1)
        .map(|token| token.to_lowercase())
        .filter(|token| !STOPWORDS.iter().any(|s| s == token))
}

fn compose_label(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| capitalize(t))
        .collect::<Vec<_>>()
        .join(" / ")
}

fn capitalize(term: &str) -> String {
    let mut chars = term.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
