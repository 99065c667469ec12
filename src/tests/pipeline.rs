//! Full-pipeline tests against the real embedding model.
//!
//! These download model files on first run and are ignored by default:
//! cargo test -- --ignored

use crate::articles::Article;
use crate::categorize::{Categorizer, ClusterParams};
use crate::config::Config;
use crate::store::VectorStorage;

fn article(id: &str, title: &str) -> Article {
    Article {
        id: id.to_string(),
        title: title.to_string(),
    }
}

fn default_params() -> ClusterParams {
    ClusterParams {
        min_cluster_size: 2,
        similarity_threshold: 0.75,
    }
}

fn finance_and_sports() -> Vec<Article> {
    vec![
        article("1", "Stock Market Reaches All-Time High"),
        article("2", "Stocks Surge on Earnings"),
        article("3", "Local Team Wins Championship"),
    ]
}

fn model_id_hash(name: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.finalize().into()
}

#[test]
#[ignore = "requires model download"]
fn test_categorize_groups_similar_titles() {
    let dir = tempfile::tempdir().unwrap();
    let categorizer = Categorizer::new(Config::default(), dir.path().to_path_buf());

    let result = categorizer
        .categorize(&finance_and_sports(), default_params())
        .unwrap();

    assert_eq!(result.categories.len(), 1);
    let category = &result.categories[0];
    assert!(!category.category_name.is_empty());

    let member_ids: Vec<&str> = category.articles.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(member_ids, vec!["1", "2"]);

    assert_eq!(result.uncategorized.len(), 1);
    assert_eq!(result.uncategorized[0].id, "3");
}

#[test]
#[ignore = "requires model download"]
fn test_reingest_does_not_duplicate_store_records() {
    let dir = tempfile::tempdir().unwrap();
    let categorizer = Categorizer::new(Config::default(), dir.path().to_path_buf());

    let articles = finance_and_sports();
    let first = categorizer.categorize(&articles, default_params()).unwrap();
    let second = categorizer.categorize(&articles, default_params()).unwrap();

    // Result never double-counts on re-ingest
    let count = |r: &crate::categorize::CategorySet| {
        r.categories.iter().map(|c| c.article_count).sum::<usize>() + r.uncategorized.len()
    };
    assert_eq!(count(&first), articles.len());
    assert_eq!(count(&second), articles.len());

    // And neither does the store
    let storage = VectorStorage::new(dir.path().join("vectors.bin"));
    let index = storage
        .load(&model_id_hash("all-MiniLM-L6-v2"), 384)
        .unwrap();
    assert_eq!(index.len(), articles.len());
}

#[test]
#[ignore = "requires model download"]
fn test_repeat_run_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let categorizer = Categorizer::new(Config::default(), dir.path().to_path_buf());

    let articles = finance_and_sports();
    let first = categorizer.categorize(&articles, default_params()).unwrap();
    let second = categorizer.categorize(&articles, default_params()).unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
#[ignore = "requires model download"]
fn test_search_returns_most_similar_stored_article() {
    let dir = tempfile::tempdir().unwrap();
    let categorizer = Categorizer::new(Config::default(), dir.path().to_path_buf());

    categorizer
        .categorize(&finance_and_sports(), default_params())
        .unwrap();

    let hits = categorizer.search("stock market", 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert!(
        hits[0].article_id == "1" || hits[0].article_id == "2",
        "expected a finance article, got {}",
        hits[0].article_id
    );

    let all = categorizer.search("stock market", 10).unwrap();
    assert_eq!(all.len(), 3);
    // Descending similarity
    for pair in all.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
}
