//! Article model and TSV ingestion.
//!
//! Input files are tab-separated with a header row of `article_id` and
//! `title`. Rows with an empty id or title are rejected up front so the
//! pipeline never starts on malformed data.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A news article as it flows through the pipeline. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "article_id")]
    pub id: String,
    pub title: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: csv::Error,
    },

    #[error("malformed row at line {line}: {source}")]
    Malformed { line: usize, source: csv::Error },

    #[error("empty article_id at line {line}")]
    EmptyId { line: usize },

    #[error("empty title at line {line} (article_id {id})")]
    EmptyTitle { line: usize, id: String },
}

/// Load articles from a TSV file.
///
/// Whitespace around fields is trimmed. Duplicate ids are kept here and
/// surfaced by the pipeline, which collapses them to the first occurrence.
pub fn load_articles(path: &Path) -> Result<Vec<Article>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|source| LoadError::Read {
            path: path.display().to_string(),
            source,
        })?;

    let mut articles = Vec::new();

    for (idx, record) in reader.deserialize::<Article>().enumerate() {
        // Header occupies line 1, data starts on line 2
        let line = idx + 2;
        let record = record.map_err(|source| LoadError::Malformed { line, source })?;

        let article = Article {
            id: record.id.trim().to_string(),
            title: record.title.trim().to_string(),
        };

        if article.id.is_empty() {
            return Err(LoadError::EmptyId { line });
        }
        if article.title.is_empty() {
            return Err(LoadError::EmptyTitle {
                line,
                id: article.id,
            });
        }

        articles.push(article);
    }

    log::debug!("loaded {} articles from {}", articles.len(), path.display());

    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tsv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_basic() {
        let file = write_tsv("article_id\ttitle\n1\tStock Market Reaches All-Time High\n2\tLocal Team Wins Championship\n");
        let articles = load_articles(file.path()).unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].id, "1");
        assert_eq!(articles[0].title, "Stock Market Reaches All-Time High");
        assert_eq!(articles[1].id, "2");
    }

    #[test]
    fn test_load_trims_whitespace() {
        let file = write_tsv("article_id\ttitle\n 1 \t  Padded Title  \n");
        let articles = load_articles(file.path()).unwrap();

        assert_eq!(articles[0].id, "1");
        assert_eq!(articles[0].title, "Padded Title");
    }

    #[test]
    fn test_load_empty_file_yields_no_articles() {
        let file = write_tsv("article_id\ttitle\n");
        let articles = load_articles(file.path()).unwrap();
        assert!(articles.is_empty());
    }

    #[test]
    fn test_empty_title_rejected() {
        let file = write_tsv("article_id\ttitle\n1\tFirst\n2\t   \n");
        let result = load_articles(file.path());
        assert!(matches!(result, Err(LoadError::EmptyTitle { line: 3, .. })));
    }

    #[test]
    fn test_empty_id_rejected() {
        let file = write_tsv("article_id\ttitle\n\tOrphaned Title\n");
        let result = load_articles(file.path());
        assert!(matches!(result, Err(LoadError::EmptyId { line: 2 })));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = load_articles(Path::new("/nonexistent/articles.tsv"));
        assert!(matches!(result, Err(LoadError::Read { .. })));
    }

    #[test]
    fn test_duplicate_ids_kept_for_downstream() {
        let file = write_tsv("article_id\ttitle\n1\tFirst\n1\tSecond\n");
        let articles = load_articles(file.path()).unwrap();
        // Deduplication is the pipeline's job, not the loader's
        assert_eq!(articles.len(), 2);
    }

    #[test]
    fn test_json_shape() {
        let article = Article {
            id: "42".to_string(),
            title: "Hello".to_string(),
        };
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["article_id"], "42");
        assert_eq!(json["title"], "Hello");
    }
}
