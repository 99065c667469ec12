use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_PERSIST_DIR;

#[derive(Parser, Debug)]
#[command(name = "newscat", version, about = "Groups news article titles into named semantic categories")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Categorize articles from a TSV file
    Categorize {
        /// Input TSV file (article_id, title)
        #[clap(short, long)]
        input: PathBuf,

        /// Output JSON file
        #[clap(short, long, default_value = "categories.json")]
        output: PathBuf,

        /// Minimum number of articles that can form a category
        #[clap(long)]
        min_cluster_size: Option<usize>,

        /// Cosine similarity threshold in [0.0, 1.0]
        #[clap(long)]
        similarity_threshold: Option<f32>,

        /// Directory for the vector store
        #[clap(long, default_value = DEFAULT_PERSIST_DIR)]
        persist_dir: PathBuf,
    },

    /// Load articles from a TSV file and print them
    Load {
        /// Input TSV file (article_id, title)
        #[clap(short, long)]
        input: PathBuf,

        /// Maximum articles to print
        #[clap(short, long, default_value = "50")]
        limit: usize,
    },

    /// Search stored articles by semantic similarity
    Search {
        /// Query text
        #[clap(short, long)]
        query: String,

        /// Number of results
        #[clap(short, long, default_value = "5")]
        n_results: usize,

        /// Directory for the vector store
        #[clap(long, default_value = DEFAULT_PERSIST_DIR)]
        persist_dir: PathBuf,
    },
}
