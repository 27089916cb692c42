use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use coursedb_core::config::{SearchSettings, Settings};
use coursedb_core::{Error, FilterEngine, Filters, RankedResult, Result, ScoredHit, TextRepresentationBuilder};
use coursedb_embed::EmbeddingEncoder;
use coursedb_text::{KeywordMatcher, QueryUnderstanding};
use coursedb_vector::{semantic_scores, IndexHandle, SearchIndexSnapshot};

use crate::ranker::HybridRanker;

/// Query facade over the published snapshot. Every call reads the snapshot
/// once, so a concurrent `publish` never changes a search mid-way.
pub struct CourseSearchEngine {
    handle: Arc<IndexHandle>,
    encoder: EmbeddingEncoder,
    understanding: QueryUnderstanding,
    settings: SearchSettings,
}

impl CourseSearchEngine {
    pub fn new(handle: Arc<IndexHandle>, encoder: EmbeddingEncoder, understanding: QueryUnderstanding, settings: SearchSettings) -> Result<Self> {
        let dim = handle.current().dim();
        if dim != encoder.dim() {
            return Err(Error::config(format!("index holds {}-d vectors but the encoder produces {}-d", dim, encoder.dim())));
        }
        HybridRanker::new(settings.default_alpha).map_err(|_| Error::config("search.default_alpha must lie in [0, 1]"))?;
        Ok(Self { handle, encoder, understanding, settings })
    }

    pub fn from_settings(settings: &Settings, handle: Arc<IndexHandle>, encoder: EmbeddingEncoder) -> Result<Self> {
        let understanding = QueryUnderstanding::from_settings(&settings.query)?;
        Self::new(handle, encoder, understanding, settings.search.clone())
    }

    pub fn handle(&self) -> &Arc<IndexHandle> { &self.handle }

    pub fn default_alpha(&self) -> f32 { self.settings.default_alpha }

    /// Result count used when a caller does not ask for one.
    pub fn default_limit(&self) -> usize { self.settings.default_limit }

    pub fn max_limit(&self) -> usize { self.settings.max_limit }

    pub fn extract_filters(&self, query: &str) -> Result<Filters> { self.understanding.extract(query) }

    /// Hybrid search with the configured default alpha.
    pub fn search(&self, query: &str, limit: usize, filters: &Filters) -> Result<Vec<RankedResult>> {
        self.search_with_alpha(query, limit, self.settings.default_alpha, filters)
    }

    pub fn hybrid_search(&self, query: &str, limit: usize, alpha: f32) -> Result<Vec<RankedResult>> {
        self.search_with_alpha(query, limit, alpha, &Filters::none())
    }

    /// Extracted filters are laid under `filters`; semantic and keyword
    /// candidates are filtered separately, then fused.
    pub fn search_with_alpha(&self, query: &str, limit: usize, alpha: f32, filters: &Filters) -> Result<Vec<RankedResult>> {
        let started = Instant::now();
        if query.trim().is_empty() { return Err(Error::invalid("query is blank")); }
        self.check_limit(limit)?;
        let ranker = HybridRanker::new(alpha)?;

        let snapshot = self.handle.current();
        let filters = filters.clone().merged_over(self.understanding.extract(query)?);
        let query_vec = self.encoder.encode(query)?;

        let semantic = self.semantic_candidates(&snapshot, &query_vec, limit, self.settings.overfetch_factor, |hit| {
            filters.matches(hit.course)
        })?;

        let keyword_all = KeywordMatcher::search(snapshot.courses(), query, snapshot.len().max(1))?;
        let keyword: Vec<ScoredHit<'_>> = FilterEngine::apply(keyword_all, &filters)
            .into_iter()
            .filter(|hit| {
                let key = hit.course.key();
                if snapshot.has_vector(&key) { return true; }
                let err = Error::IndexConsistency { key };
                warn!(error = %err, "skipping keyword candidate");
                false
            })
            .collect();

        let results = ranker.fuse(&semantic, &keyword, limit);
        info!(
            query,
            limit,
            alpha,
            semantic = semantic.len(),
            keyword = keyword.len(),
            returned = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );
        Ok(results)
    }

    /// Purely semantic ranking of courses taught by someone whose name
    /// contains `name` (case-insensitive).
    pub fn search_by_instructor(&self, name: &str, limit: usize, filters: &Filters) -> Result<Vec<RankedResult>> {
        let name = name.trim();
        if name.is_empty() { return Err(Error::invalid("instructor name is blank")); }
        self.check_limit(limit)?;

        let snapshot = self.handle.current();
        let needle = name.to_lowercase();
        let query_vec = self.encoder.encode(&TextRepresentationBuilder::instructor_query(name))?;
        let hits = self.semantic_candidates(&snapshot, &query_vec, limit, self.settings.instructor_overfetch, |hit| {
            filters.matches(hit.course) && hit.course.instructors.iter().any(|i| i.to_lowercase().contains(&needle))
        })?;

        let results: Vec<RankedResult> = hits
            .into_iter()
            .take(limit)
            .map(|hit| RankedResult {
                course: hit.course.clone(),
                semantic_score: hit.score,
                keyword_score: 0.0,
                combined_score: hit.score,
            })
            .collect();
        info!(instructor = name, limit, returned = results.len(), "instructor search finished");
        Ok(results)
    }

    fn check_limit(&self, limit: usize) -> Result<()> {
        if limit == 0 { return Err(Error::invalid("limit must be at least 1")); }
        if limit > self.settings.max_limit {
            return Err(Error::invalid(format!("limit {} exceeds the maximum of {}", limit, self.settings.max_limit)));
        }
        Ok(())
    }

    /// Fetches `limit * factor` nearest courses, normalises their scores,
    /// keeps those passing `keep`, and doubles the fetch while fewer than
    /// `limit` survive and the index has more to give.
    fn semantic_candidates<'s>(
        &self,
        snapshot: &'s SearchIndexSnapshot,
        query: &coursedb_core::EmbeddingVector,
        limit: usize,
        factor: usize,
        keep: impl Fn(&ScoredHit<'s>) -> bool,
    ) -> Result<Vec<ScoredHit<'s>>> {
        let available = snapshot.vector_count();
        let mut fetch = limit.saturating_mul(factor.max(1)).max(limit);
        loop {
            let k = fetch.min(available.max(1));
            let hits = snapshot.search(query, k)?;
            let survivors: Vec<ScoredHit<'s>> = semantic_scores(&hits).into_iter().filter(|h| keep(h)).collect();
            if survivors.len() >= limit || k >= available {
                debug!(fetched = hits.len(), survivors = survivors.len(), "semantic candidates");
                return Ok(survivors);
            }
            fetch = fetch.saturating_mul(2);
        }
    }
}
