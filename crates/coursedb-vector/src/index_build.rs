use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

use coursedb_core::{Course, Error, IdentityKey, TextRepresentationBuilder};
use coursedb_embed::EmbeddingEncoder;

use crate::snapshot::SearchIndexSnapshot;
use crate::store::{EmbeddingStore, StoredEmbedding};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub batch_size: usize,
    /// Replace an existing table. Without it an existing table is an error.
    pub overwrite: bool,
    pub show_progress: bool,
}

impl Default for BuildOptions {
    fn default() -> Self { Self { batch_size: 32, overwrite: false, show_progress: true } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub total: usize,
    pub reused: usize,
    pub encoded: usize,
}

pub fn content_hash(text: &str) -> String { blake3::hash(text.as_bytes()).to_hex().to_string() }

/// Renders, encodes and stores a vector for every course. Rows whose text
/// hash and model id match what is already stored are carried over as-is.
pub async fn build_embeddings(
    courses: &[Course],
    encoder: &EmbeddingEncoder,
    store: &EmbeddingStore,
    opts: &BuildOptions,
) -> Result<BuildReport> {
    let started = Instant::now();
    let exists = store.exists().await?;
    if exists && !opts.overwrite {
        return Err(Error::invalid(format!(
            "embeddings table '{}' already exists in {}; rebuild with overwrite",
            store.table(),
            store.dir().display()
        ))
        .into());
    }

    let previous: HashMap<IdentityKey, StoredEmbedding> = if exists {
        match store.load_all().await {
            Ok(rows) => rows.into_iter().map(|r| (r.key.clone(), r)).collect(),
            Err(e) => {
                warn!(error = %e, "existing embeddings are unusable, re-encoding everything");
                HashMap::new()
            }
        }
    } else {
        HashMap::new()
    };

    let model_id = encoder.model_id().to_string();
    let mut rows: Vec<StoredEmbedding> = Vec::with_capacity(courses.len());
    let mut pending: Vec<(IdentityKey, String, String)> = Vec::new();
    for course in courses {
        let key = course.key();
        let text = TextRepresentationBuilder::render(course);
        let hash = content_hash(&text);
        match previous.get(&key) {
            Some(prev) if prev.content_hash == hash && prev.model_id == model_id && prev.vector.dim() == encoder.dim() => {
                rows.push(prev.clone());
            }
            _ => pending.push((key, hash, text)),
        }
    }
    let reused = rows.len();

    let pb = if opts.show_progress { ProgressBar::new(pending.len() as u64) } else { ProgressBar::hidden() };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} courses ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    for batch in pending.chunks(opts.batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|(_, _, text)| text.clone()).collect();
        let vectors = encoder.encode_batch(&texts)?;
        for ((key, hash, _), vector) in batch.iter().zip(vectors) {
            rows.push(StoredEmbedding { key: key.clone(), content_hash: hash.clone(), model_id: model_id.clone(), vector });
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("embeddings done");

    rows.sort_by(|a, b| a.key.cmp(&b.key));
    store.write_all(&rows).await?;

    let report = BuildReport { total: rows.len(), reused, encoded: pending.len() };
    info!(
        total = report.total,
        reused = report.reused,
        encoded = report.encoded,
        model = %model_id,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "embedding build finished"
    );
    Ok(report)
}

/// Pairs loaded courses with stored vectors. Vectors produced by a model
/// other than `model_id` are a configuration error: the query would be
/// compared against a different embedding space.
pub async fn load_snapshot(courses: Vec<Course>, store: &EmbeddingStore, dim: usize, model_id: &str) -> Result<SearchIndexSnapshot> {
    let rows = store.load_all().await?;
    if let Some(foreign) = rows.iter().find(|r| r.model_id != model_id) {
        return Err(Error::config(format!(
            "stored vectors were built with '{}' but the encoder is '{}'; rebuild the index",
            foreign.model_id, model_id
        ))
        .into());
    }
    let snapshot = SearchIndexSnapshot::build(dim, courses, rows.into_iter().map(|r| (r.key, r.vector)))?;
    Ok(snapshot)
}
