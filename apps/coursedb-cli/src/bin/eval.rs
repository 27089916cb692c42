use clap::Parser;
use std::path::PathBuf;

use coursedb_cli::{init_tracing, open_engine};
use coursedb_core::config::Settings;
use coursedb_hybrid::EvaluationHarness;

/// Precision@k and recall@k over a labeled query set.
#[derive(Debug, Parser)]
#[command(name = "coursedb-eval", version)]
struct Args {
    /// JSON array of {"query": ..., "expected": [course ids]}
    labels: PathBuf,
    #[arg(long, default_value_t = 10)]
    k: usize,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = Settings::load()?;
    let labels = EvaluationHarness::load_labels(&args.labels)?;
    let engine = open_engine(&settings).await?;
    let report = EvaluationHarness::evaluate(&engine, &labels, args.k)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for q in &report.queries {
        println!("P@{k}={:.3} R@{k}={:.3}  {}", q.precision, q.recall, q.query, k = report.k);
    }
    println!("mean P@{k}={:.3} mean R@{k}={:.3} over {} queries", report.mean_precision, report.mean_recall, report.queries.len(), k = report.k);
    Ok(())
}
