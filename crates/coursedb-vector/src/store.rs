use anyhow::{anyhow, Context, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use lancedb::database::CreateTableMode;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use coursedb_core::config::Settings;
use coursedb_core::{EmbeddingVector, Error, IdentityKey};

use crate::schema::{build_embeddings_schema, vector_width};

const WRITE_BATCH_ROWS: usize = 1000;

#[derive(Debug, Clone)]
pub struct StoredEmbedding {
    pub key: IdentityKey,
    /// blake3 of the text the vector was computed from.
    pub content_hash: String,
    pub model_id: String,
    pub vector: EmbeddingVector,
}

/// Persisted `(course_id, term) → vector` pairs in one LanceDB table.
pub struct EmbeddingStore {
    dir: PathBuf,
    table: String,
    dim: usize,
}

impl EmbeddingStore {
    pub fn new(dir: impl Into<PathBuf>, table: impl Into<String>, dim: usize) -> Self {
        Self { dir: dir.into(), table: table.into(), dim }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.index_dir(), settings.data.table.clone(), settings.embedding.dimension)
    }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn table(&self) -> &str { &self.table }

    async fn open_db(&self) -> Result<Connection> {
        let uri = self.dir.to_string_lossy();
        connect(uri.as_ref()).execute().await.with_context(|| format!("opening LanceDB at {}", uri))
    }

    pub async fn exists(&self) -> Result<bool> {
        if !self.dir.exists() { return Ok(false); }
        let conn = self.open_db().await?;
        Ok(conn.table_names().execute().await?.contains(&self.table))
    }

    /// Replaces the table with exactly `rows`. Batches are assembled before
    /// the store is touched.
    pub async fn write_all(&self, rows: &[StoredEmbedding]) -> Result<()> {
        if let Some(bad) = rows.iter().find(|r| r.vector.dim() != self.dim) {
            return Err(Error::config(format!("vector for {} has {} dimensions, expected {}", bad.key, bad.vector.dim(), self.dim)).into());
        }
        let schema = build_embeddings_schema(self.dim as i32);
        let now = Utc::now().timestamp_millis();
        let batches = rows
            .chunks(WRITE_BATCH_ROWS)
            .map(|chunk| self.rows_to_batch(chunk, now))
            .collect::<Result<Vec<_>>>()?;

        std::fs::create_dir_all(&self.dir).with_context(|| format!("creating {}", self.dir.display()))?;
        let reader = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);
        let conn = self.open_db().await?;
        // Overwrite commits a new table version; a failed write leaves the previous one readable.
        debug!(table = %self.table, "replacing embeddings table");
        conn.create_table(&self.table, Box::new(reader)).mode(CreateTableMode::Overwrite).execute().await?;
        info!(rows = rows.len(), table = %self.table, dir = %self.dir.display(), "wrote embeddings table");
        Ok(())
    }

    fn rows_to_batch(&self, rows: &[StoredEmbedding], now: i64) -> Result<RecordBatch> {
        let mut course_ids = Vec::with_capacity(rows.len());
        let mut terms = Vec::with_capacity(rows.len());
        let mut hashes = Vec::with_capacity(rows.len());
        let mut models = Vec::with_capacity(rows.len());
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(rows.len());
        for r in rows {
            course_ids.push(r.key.course_id.clone());
            terms.push(r.key.term.clone());
            hashes.push(r.content_hash.clone());
            models.push(r.model_id.clone());
            vectors.push(Some(r.vector.as_slice().iter().map(|&x| Some(x)).collect()));
        }
        let batch = RecordBatch::try_new(
            build_embeddings_schema(self.dim as i32),
            vec![
                Arc::new(StringArray::from(course_ids)),
                Arc::new(StringArray::from(terms)),
                Arc::new(StringArray::from(hashes)),
                Arc::new(StringArray::from(models)),
                Arc::new(TimestampMillisecondArray::from(vec![now; rows.len()])),
                Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), self.dim as i32)),
            ],
        )?;
        Ok(batch)
    }

    /// Every stored row. A missing table yields no rows; a table whose vector
    /// width differs from the configured dimension is a configuration error.
    pub async fn load_all(&self) -> Result<Vec<StoredEmbedding>> {
        if !self.exists().await? { return Ok(vec![]); }
        let conn = self.open_db().await?;
        let table = conn.open_table(&self.table).execute().await?;

        let schema = table.schema().await?;
        match vector_width(&schema) {
            Some(w) if w as usize == self.dim => {}
            Some(w) => {
                return Err(Error::config(format!(
                    "table {} stores {}-d vectors but the configured dimension is {}",
                    self.table, w, self.dim
                ))
                .into())
            }
            None => return Err(Error::config(format!("table {} has no vector column", self.table)).into()),
        }

        let total = table.count_rows(None).await?;
        let mut out = Vec::with_capacity(total);
        if total == 0 { return Ok(out); }
        let mut stream = table.query().limit(total).execute().await?;
        while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
            let course_ids = string_col(&batch, "course_id")?;
            let terms = string_col(&batch, "term")?;
            let hashes = string_col(&batch, "content_hash")?;
            let models = string_col(&batch, "model_id")?;
            let vectors = batch
                .column_by_name("vector")
                .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
                .ok_or_else(|| anyhow!("vector column missing or not a fixed-size list"))?;
            for i in 0..batch.num_rows() {
                if vectors.is_null(i) { continue; }
                let values = vectors.value(i).as_primitive::<Float32Type>().values().to_vec();
                out.push(StoredEmbedding {
                    key: IdentityKey::new(course_ids.value(i), terms.value(i)),
                    content_hash: hashes.value(i).to_string(),
                    model_id: models.value(i).to_string(),
                    vector: EmbeddingVector::new(values),
                });
            }
        }
        debug!(rows = out.len(), table = %self.table, "loaded stored embeddings");
        Ok(out)
    }
}

fn string_col<'b>(batch: &'b RecordBatch, name: &str) -> Result<&'b StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("{} column missing or not utf8", name))
}
