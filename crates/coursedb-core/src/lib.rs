pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod text_repr;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use filter::{FilterEngine, Filters, FiltersBuilder};
pub use text_repr::TextRepresentationBuilder;
pub use types::{Candidate, Course, EmbeddingVector, IdentityKey, Level, RankedResult, ScoredHit};
