use clap::Parser;
use std::path::PathBuf;

use coursedb_cli::{init_tracing, load_courses};
use coursedb_core::config::Settings;
use coursedb_embed::EmbeddingEncoder;
use coursedb_vector::{build_embeddings, BuildOptions, EmbeddingStore};

/// Embed every course and store the vectors for search.
#[derive(Debug, Parser)]
#[command(name = "coursedb-indexer", version)]
struct Args {
    /// Scraper output directory; defaults to data.courses_dir
    data_dir: Option<PathBuf>,
    /// Only index these term codes; defaults to data.terms
    #[arg(long, num_args = 1..)]
    terms: Vec<String>,
    /// Replace an existing embeddings table
    #[arg(long)]
    overwrite: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = Settings::load()?;

    let data_dir = args.data_dir.unwrap_or_else(|| settings.courses_dir());
    let terms = if args.terms.is_empty() { settings.data.terms.clone() } else { args.terms };
    let courses = load_courses(&data_dir, &terms)?;

    let encoder = EmbeddingEncoder::from_settings(&settings)?;
    let store = EmbeddingStore::from_settings(&settings);
    let opts = BuildOptions { batch_size: settings.embedding.batch_size, overwrite: args.overwrite, show_progress: true };
    let report = build_embeddings(&courses, &encoder, &store, &opts).await?;

    println!(
        "Indexed {} courses from {} into {}/{} ({} encoded, {} reused, model {})",
        report.total,
        data_dir.display(),
        store.dir().display(),
        store.table(),
        report.encoded,
        report.reused,
        encoder.model_id()
    );
    Ok(())
}
