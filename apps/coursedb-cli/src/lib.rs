use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coursedb_core::config::Settings;
use coursedb_core::loader::CourseLoader;
use coursedb_core::{Error, Filters, RankedResult};
use coursedb_embed::EmbeddingEncoder;
use coursedb_hybrid::CourseSearchEngine;
use coursedb_vector::{load_snapshot, EmbeddingStore, IndexHandle};

/// Logs go to stderr so stdout only carries results. `RUST_LOG` overrides
/// the default `info` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the catalog and the stored vectors and wires up a search engine.
pub async fn open_engine(settings: &Settings) -> anyhow::Result<CourseSearchEngine> {
    let encoder = EmbeddingEncoder::from_settings(settings)?;
    let courses = load_courses(&settings.courses_dir(), &settings.data.terms)?;
    let store = EmbeddingStore::from_settings(settings);
    if !store.exists().await? {
        return Err(Error::config(format!(
            "no embeddings table '{}' in {}; run coursedb-indexer first",
            store.table(),
            store.dir().display()
        ))
        .into());
    }
    let snapshot = load_snapshot(courses, &store, settings.embedding.dimension, encoder.model_id()).await?;
    info!(courses = snapshot.len(), vectors = snapshot.vector_count(), model = encoder.model_id(), "search index loaded");
    let engine = CourseSearchEngine::from_settings(settings, Arc::new(IndexHandle::new(snapshot)), encoder)?;
    Ok(engine)
}

pub fn load_courses(data_dir: &Path, terms: &[String]) -> anyhow::Result<Vec<coursedb_core::Course>> {
    let loader = CourseLoader::new(terms)?;
    let report = loader.load_dir(data_dir).with_context(|| format!("loading courses from {}", data_dir.display()))?;
    Ok(report.courses)
}

pub fn describe_filters(filters: &Filters) -> String {
    let mut parts = Vec::new();
    if let Some(terms) = filters.terms() { parts.push(format!("term in [{}]", terms.iter().cloned().collect::<Vec<_>>().join(", "))); }
    if let Some(d) = filters.department() { parts.push(format!("department = {}", d)); }
    if let Some(l) = filters.level() { parts.push(format!("level = {}", l)); }
    if let Some(c) = filters.min_credits() { parts.push(format!("credits >= {}", c)); }
    if parts.is_empty() { "none".to_string() } else { parts.join(", ") }
}

pub fn format_result(rank: usize, r: &RankedResult, explain: bool) -> String {
    let c = &r.course;
    let credits = c.credits.map(|v| format!("{}", v)).unwrap_or_else(|| "?".to_string());
    let mut line = format!(
        "{:>2}. {} ({}) {} | {} | {} | {} cr | score={:.4}",
        rank, c.course_id, c.term, c.title, c.department, c.level, credits, r.combined_score
    );
    if explain {
        line.push_str(&format!("\n    semantic={:.4} keyword={:.4}", r.semantic_score, r.keyword_score));
        if !c.instructors.is_empty() { line.push_str(&format!("\n    instructors: {}", c.instructors.join(", "))); }
    }
    line
}
