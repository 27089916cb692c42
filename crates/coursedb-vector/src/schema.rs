use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub fn build_embeddings_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("course_id", DataType::Utf8, false),
        Field::new("term", DataType::Utf8, false),
        Field::new("content_hash", DataType::Utf8, false),
        Field::new("model_id", DataType::Utf8, false),
        Field::new("embedded_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}

/// Width of the `vector` column, if the schema has one.
pub fn vector_width(schema: &Schema) -> Option<i32> {
    match schema.field_with_name("vector").ok()?.data_type() {
        DataType::FixedSizeList(_, n) => Some(*n),
        _ => None,
    }
}
