use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use serde_json::json;

mod articles;
mod categorize;
mod cli;
mod cluster;
mod config;
mod embedding;
mod lock;
mod naming;
mod store;
#[cfg(test)]
mod tests;

use categorize::{Categorizer, ClusterParams};
use config::Config;

/// Summary line printed after a successful categorize run.
#[derive(Serialize)]
struct RunSummary {
    success: bool,
    total_articles: usize,
    categories_count: usize,
    uncategorized_count: usize,
    output_file: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("newscat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    if let Err(err) = run(args) {
        // Machine-readable error on stdout, details on stderr
        log::error!("{err:?}");
        println!("{}", json!({ "error": err.to_string() }));
        std::process::exit(1);
    }
}

fn run(args: cli::Args) -> anyhow::Result<()> {
    match args.command {
        cli::Command::Categorize {
            input,
            output,
            min_cluster_size,
            similarity_threshold,
            persist_dir,
        } => run_categorize(
            &input,
            &output,
            min_cluster_size,
            similarity_threshold,
            persist_dir,
        ),

        cli::Command::Load { input, limit } => {
            let articles = articles::load_articles(&input)?;
            let preview: Vec<&articles::Article> = articles.iter().take(limit).collect();
            println!(
                "{}",
                json!({ "count": articles.len(), "articles": preview })
            );
            Ok(())
        }

        cli::Command::Search {
            query,
            n_results,
            persist_dir,
        } => {
            let config = Config::load(&persist_dir)?;
            let categorizer = Categorizer::new(config, persist_dir);
            let results = categorizer.search(&query, n_results)?;
            println!("{}", json!({ "query": query, "results": results }));
            Ok(())
        }
    }
}

fn run_categorize(
    input: &Path,
    output: &Path,
    min_cluster_size: Option<usize>,
    similarity_threshold: Option<f32>,
    persist_dir: PathBuf,
) -> anyhow::Result<()> {
    let articles = articles::load_articles(input)?;

    std::fs::create_dir_all(&persist_dir)
        .with_context(|| format!("cannot create persist dir {}", persist_dir.display()))?;

    let config = Config::load(&persist_dir)?;
    let params = ClusterParams {
        min_cluster_size: min_cluster_size.unwrap_or(config.min_cluster_size),
        similarity_threshold: similarity_threshold.unwrap_or(config.similarity_threshold),
    };

    // One writer per store at a time
    let _lock = lock::RunLock::try_acquire(&persist_dir)
        .with_context(|| format!("cannot lock persist dir {}", persist_dir.display()))?;

    let categorizer = Categorizer::new(config, persist_dir);
    let result = categorizer.categorize(&articles, params)?;

    let pretty = serde_json::to_string_pretty(&result)?;
    std::fs::write(output, pretty)
        .with_context(|| format!("cannot write results to {}", output.display()))?;

    let summary = RunSummary {
        success: true,
        total_articles: articles.len(),
        categories_count: result.categories.len(),
        uncategorized_count: result.uncategorized.len(),
        output_file: output.display().to_string(),
    };
    println!("{}", serde_json::to_string(&summary)?);

    Ok(())
}
