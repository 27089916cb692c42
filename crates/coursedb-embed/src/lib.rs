pub mod bert;
pub mod device;
pub mod encoder;
pub mod hash;
pub mod pool;
pub mod tokenize;

pub use bert::BertEmbedder;
pub use encoder::{load_embedder, EmbeddingEncoder};
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;
