use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docrank_core::{Corpus, DocId, SearchHit};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Parser)]
#[command(name = "docrank")]
#[command(about = "Load a document corpus and run TF-IDF relevance queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a corpus file and run one relevance query
    Search {
        /// Corpus file, one "<id>,<text>" document per line
        #[arg(long)]
        input: String,
        /// Query text
        #[arg(long)]
        query: String,
        /// Number of results to return
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Emit results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load a corpus file and print one document
    Get {
        /// Corpus file, one "<id>,<text>" document per line
        #[arg(long)]
        input: String,
        /// Document id
        #[arg(long)]
        id: DocId,
    },
}

#[derive(Serialize)]
struct SearchOutput {
    query: String,
    total: usize,
    results: Vec<SearchHit>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { input, query, top, json } => {
            let corpus = load_corpus(Path::new(&input))?;
            let results = corpus.search_top(&query, top);
            if json {
                let out = SearchOutput { total: results.len(), query, results };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                for (rank, hit) in results.iter().enumerate() {
                    println!("{:>3}. [{}] {:.6}  {}", rank + 1, hit.doc_id, hit.score, hit.text);
                }
            }
        }
        Commands::Get { input, id } => {
            let corpus = load_corpus(Path::new(&input))?;
            match corpus.get_document(id) {
                Some(text) => println!("{text}"),
                None => bail!("document {id} not found"),
            }
        }
    }
    Ok(())
}

/// Build a corpus from a line-oriented file, one `"<id>,<text>"` per line.
///
/// The id/text delimiter is the first comma; the rest of the line is the
/// document text verbatim and may itself contain commas. Malformed lines and
/// documents the corpus rejects are logged and skipped.
fn load_corpus(path: &Path) -> Result<Corpus> {
    let file =
        File::open(path).with_context(|| format!("opening corpus file {}", path.display()))?;
    let reader = BufReader::new(file);
    let corpus = Corpus::new();
    let mut loaded = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let Some((raw_id, text)) = line.split_once(',') else {
            tracing::warn!(line = idx + 1, "skipping line without id delimiter");
            continue;
        };
        let doc_id: DocId = match raw_id.trim().parse() {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!(line = idx + 1, raw_id, "skipping line with non-numeric id");
                continue;
            }
        };
        if corpus.add_document(doc_id, text) {
            loaded += 1;
        } else {
            tracing::warn!(
                line = idx + 1,
                doc_id,
                "corpus rejected document (duplicate id or empty text)"
            );
        }
    }

    tracing::info!(loaded, "corpus loaded");
    Ok(corpus)
}
