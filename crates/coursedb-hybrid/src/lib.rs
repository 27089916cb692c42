pub mod engine;
pub mod eval;
pub mod ranker;

pub use engine::CourseSearchEngine;
pub use eval::{EvaluationHarness, EvaluationReport, LabeledQuery, Retriever};
pub use ranker::HybridRanker;
