use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use coursedb_core::{Error, Filters, Result};

use crate::engine::CourseSearchEngine;

/// Anything that returns ranked course ids for a query.
pub trait Retriever {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>>;
}

impl Retriever for CourseSearchEngine {
    /// `k` above the engine's `max_limit` is clamped so one large cut-off
    /// does not fail the whole evaluation.
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let limit = k.min(self.max_limit());
        Ok(self.search(query, limit, &Filters::none())?.into_iter().map(|r| r.course.course_id).collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledQuery {
    pub query: String,
    pub expected: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryEvaluation {
    pub query: String,
    pub returned: Vec<String>,
    pub precision: f64,
    pub recall: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub k: usize,
    pub queries: Vec<QueryEvaluation>,
    pub mean_precision: f64,
    pub mean_recall: f64,
}

pub struct EvaluationHarness;

impl EvaluationHarness {
    /// precision@k and recall@k per query, plus the means. Returned ids are
    /// de-duplicated first, so one course offered in several terms counts
    /// once.
    pub fn evaluate<R: Retriever + ?Sized>(retriever: &R, labeled: &[LabeledQuery], k: usize) -> Result<EvaluationReport> {
        if k == 0 { return Err(Error::invalid("k must be at least 1")); }
        let mut queries = Vec::with_capacity(labeled.len());
        for lq in labeled {
            let mut seen = HashSet::new();
            let returned: Vec<String> = retriever.retrieve(&lq.query, k)?.into_iter().filter(|id| seen.insert(id.clone())).collect();
            let expected: HashSet<&str> = lq.expected.iter().map(String::as_str).collect();
            let (precision, recall) = precision_recall(&returned, &expected);
            queries.push(QueryEvaluation { query: lq.query.clone(), returned, precision, recall });
        }
        let n = queries.len();
        let mean = |f: fn(&QueryEvaluation) -> f64| if n == 0 { 0.0 } else { queries.iter().map(f).sum::<f64>() / n as f64 };
        let mean_precision = mean(|q| q.precision);
        let mean_recall = mean(|q| q.recall);
        Ok(EvaluationReport { k, queries, mean_precision, mean_recall })
    }

    pub fn load_labels(path: &Path) -> anyhow::Result<Vec<LabeledQuery>> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let labels = serde_json::from_str(&text).with_context(|| format!("parsing labeled queries in {}", path.display()))?;
        Ok(labels)
    }
}

/// Empty `returned` gives precision 0; empty `expected` gives recall 0.
pub fn precision_recall(returned: &[String], expected: &HashSet<&str>) -> (f64, f64) {
    let hits = returned.iter().filter(|id| expected.contains(id.as_str())).count() as f64;
    let precision = if returned.is_empty() { 0.0 } else { hits / returned.len() as f64 };
    let recall = if expected.is_empty() { 0.0 } else { hits / expected.len() as f64 };
    (precision, recall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Canned(HashMap<String, Vec<String>>);

    impl Retriever for Canned {
        fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
            Ok(self.0.get(query).cloned().unwrap_or_default().into_iter().take(k).collect())
        }
    }

    fn canned(pairs: &[(&str, &[&str])]) -> Canned {
        Canned(pairs.iter().map(|(q, ids)| (q.to_string(), ids.iter().map(|s| s.to_string()).collect())).collect())
    }

    fn label(query: &str, expected: &[&str]) -> LabeledQuery {
        LabeledQuery { query: query.into(), expected: expected.iter().map(|s| s.to_string()).collect() }
    }

    #[test]
    fn half_right_is_half_precision_and_recall() {
        let r = canned(&[("ml", &["X", "Z"][..])]);
        let report = EvaluationHarness::evaluate(&r, &[label("ml", &["X", "Y"])], 10).unwrap();
        assert_eq!(report.queries[0].precision, 0.5);
        assert_eq!(report.queries[0].recall, 0.5);
        assert_eq!(report.mean_precision, 0.5);
    }

    #[test]
    fn duplicates_count_once() {
        let r = canned(&[("ml", &["X", "X", "Y"][..])]);
        let report = EvaluationHarness::evaluate(&r, &[label("ml", &["X", "Y"])], 10).unwrap();
        assert_eq!(report.queries[0].returned, vec!["X", "Y"]);
        assert_eq!(report.queries[0].precision, 1.0);
        assert_eq!(report.queries[0].recall, 1.0);
    }

    #[test]
    fn empty_edges_are_zero() {
        let r = canned(&[]);
        let report = EvaluationHarness::evaluate(&r, &[label("nothing", &["X"]), label("no labels", &[])], 5).unwrap();
        assert_eq!(report.queries[0].precision, 0.0);
        assert_eq!(report.queries[1].recall, 0.0);

        let empty = EvaluationHarness::evaluate(&r, &[], 5).unwrap();
        assert_eq!((empty.mean_precision, empty.mean_recall), (0.0, 0.0));
        assert!(matches!(EvaluationHarness::evaluate(&r, &[], 0), Err(Error::InvalidArgument(_))));
    }
}
