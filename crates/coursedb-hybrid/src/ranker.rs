use std::cmp::Ordering;
use std::collections::HashMap;

use coursedb_core::{Course, Error, RankedResult, Result, ScoredHit};

/// Weighted linear fusion of semantic and keyword scores:
/// `combined = alpha * semantic + (1 - alpha) * keyword`.
#[derive(Debug, Clone, Copy)]
pub struct HybridRanker {
    alpha: f32,
}

struct Fused<'s> {
    course: &'s Course,
    semantic: f32,
    keyword: f32,
    semantic_rank: Option<usize>,
    keyword_rank: Option<usize>,
    combined: f32,
}

impl HybridRanker {
    pub fn new(alpha: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(Error::invalid(format!("alpha must lie in [0, 1], got {}", alpha)));
        }
        Ok(Self { alpha })
    }

    pub fn alpha(&self) -> f32 { self.alpha }

    /// Merges both candidate lists by identity key (a key repeated within one
    /// list keeps its first entry), then sorts by combined score descending,
    /// ties by course id then term. At `alpha` 1 or 0 the dominant list's
    /// own order is kept exactly, followed by the other list's leftovers.
    pub fn fuse(&self, semantic: &[ScoredHit<'_>], keyword: &[ScoredHit<'_>], limit: usize) -> Vec<RankedResult> {
        let mut slots: HashMap<(&str, &str), Fused<'_>> = HashMap::new();
        for (rank, hit) in semantic.iter().enumerate() {
            let c = hit.course;
            slots.entry((c.course_id.as_str(), c.term.as_str())).or_insert(Fused {
                course: c,
                semantic: hit.score,
                keyword: 0.0,
                semantic_rank: Some(rank),
                keyword_rank: None,
                combined: 0.0,
            });
        }
        for (rank, hit) in keyword.iter().enumerate() {
            let c = hit.course;
            let slot = slots.entry((c.course_id.as_str(), c.term.as_str())).or_insert(Fused {
                course: c,
                semantic: 0.0,
                keyword: 0.0,
                semantic_rank: None,
                keyword_rank: None,
                combined: 0.0,
            });
            if slot.keyword_rank.is_none() {
                slot.keyword = hit.score;
                slot.keyword_rank = Some(rank);
            }
        }

        let mut fused: Vec<Fused<'_>> = slots.into_values().collect();
        for f in &mut fused {
            f.combined = self.alpha * f.semantic + (1.0 - self.alpha) * f.keyword;
        }

        if self.alpha == 1.0 {
            fused.sort_by(|a, b| by_rank(a.semantic_rank, b.semantic_rank).then_with(|| a.course.cmp_key(b.course)));
        } else if self.alpha == 0.0 {
            fused.sort_by(|a, b| by_rank(a.keyword_rank, b.keyword_rank).then_with(|| a.course.cmp_key(b.course)));
        } else {
            fused.sort_by(|a, b| b.combined.total_cmp(&a.combined).then_with(|| a.course.cmp_key(b.course)));
        }
        fused.truncate(limit);

        fused
            .into_iter()
            .map(|f| RankedResult {
                course: f.course.clone(),
                semantic_score: f.semantic,
                keyword_score: f.keyword,
                combined_score: f.combined,
            })
            .collect()
    }
}

/// Present ranks first, ascending; absent ranks tie with each other.
fn by_rank(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
