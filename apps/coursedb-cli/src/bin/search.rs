use clap::Parser;

use coursedb_cli::{describe_filters, format_result, init_tracing, open_engine};
use coursedb_core::config::Settings;
use coursedb_core::{Filters, Level};

/// Search the course catalog in plain language.
#[derive(Debug, Parser)]
#[command(name = "coursedb-search", version)]
struct Args {
    /// Free-text query, or an instructor name with --instructor
    query: String,
    /// Restrict to term codes such as 202508 (repeatable)
    #[arg(long = "term", num_args = 1..)]
    terms: Vec<String>,
    #[arg(long)]
    department: Option<String>,
    /// Lower, Upper, Grad or Undergrad
    #[arg(long)]
    level: Option<String>,
    #[arg(long)]
    min_credits: Option<f32>,
    /// Defaults to search.default_limit
    #[arg(long)]
    limit: Option<usize>,
    /// Semantic weight in [0, 1]; defaults to search.default_alpha
    #[arg(long)]
    alpha: Option<f32>,
    /// Treat the query as an instructor name
    #[arg(long)]
    instructor: bool,
    /// Show extracted filters and component scores
    #[arg(long)]
    explain: bool,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = Settings::load()?;

    let mut builder = Filters::builder().terms(args.terms.iter().cloned());
    if let Some(d) = &args.department { builder = builder.department(d.clone()); }
    if let Some(l) = &args.level { builder = builder.level(l.parse::<Level>()?); }
    if let Some(c) = args.min_credits { builder = builder.min_credits(c); }
    let explicit = builder.build()?;

    let engine = open_engine(&settings).await?;

    let limit = args.limit.unwrap_or_else(|| engine.default_limit());
    let results = if args.instructor {
        engine.search_by_instructor(&args.query, limit, &explicit)?
    } else {
        let alpha = args.alpha.unwrap_or_else(|| engine.default_alpha());
        engine.search_with_alpha(&args.query, limit, alpha, &explicit)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if args.explain {
        if args.instructor {
            println!("filters: {}", describe_filters(&explicit));
        } else {
            let extracted = engine.extract_filters(&args.query)?;
            println!("extracted filters: {}", describe_filters(&extracted));
            println!("effective filters: {}", describe_filters(&explicit.clone().merged_over(extracted)));
        }
    }
    if results.is_empty() {
        println!("No courses found for \"{}\"", args.query);
    }
    for (i, r) in results.iter().enumerate() {
        println!("{}", format_result(i + 1, r, args.explain));
    }
    Ok(())
}
