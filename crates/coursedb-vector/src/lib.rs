//! Exact cosine retrieval over an immutable in-memory snapshot, plus the
//! LanceDB table the snapshot's vectors are persisted in.

pub mod index_build;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod vector;

pub use index_build::{build_embeddings, content_hash, load_snapshot, BuildOptions, BuildReport};
pub use snapshot::{semantic_scores, IndexHandle, SearchIndexSnapshot, VectorHit};
pub use store::{EmbeddingStore, StoredEmbedding};
pub use vector::VectorIndex;
