use std::sync::Arc;

use coursedb_core::{Course, EmbeddingVector, Error, IdentityKey, Level};
use coursedb_embed::{EmbeddingEncoder, HashEmbedder};
use coursedb_vector::{build_embeddings, content_hash, load_snapshot, BuildOptions, EmbeddingStore, StoredEmbedding};
use tempfile::TempDir;

fn course(id: &str, title: &str) -> Course {
    Course {
        course_id: id.into(),
        term: "202508".into(),
        title: title.into(),
        department: "Computer Science".into(),
        level: Level::Undergrad,
        credits: Some(3.0),
        description: format!("{} description", title),
        gen_ed: Default::default(),
        instructors: vec![],
    }
}

fn quiet() -> BuildOptions { BuildOptions { batch_size: 2, overwrite: false, show_progress: false } }

#[tokio::test]
async fn write_then_load_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path(), "course_embeddings", 3);
    assert!(!store.exists().await.unwrap());
    assert!(store.load_all().await.unwrap().is_empty());

    let rows = vec![
        StoredEmbedding {
            key: IdentityKey::new("CMSC131", "202508"),
            content_hash: content_hash("a"),
            model_id: "test".into(),
            vector: EmbeddingVector::new(vec![1.0, 0.0, 0.0]),
        },
        StoredEmbedding {
            key: IdentityKey::new("MATH140", "202508"),
            content_hash: content_hash("b"),
            model_id: "test".into(),
            vector: EmbeddingVector::new(vec![0.0, 0.5, 0.5]),
        },
    ];
    store.write_all(&rows).await.unwrap();
    assert!(store.exists().await.unwrap());

    let mut loaded = store.load_all().await.unwrap();
    loaded.sort_by(|a, b| a.key.cmp(&b.key));
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].key, IdentityKey::new("MATH140", "202508"));
    assert_eq!(loaded[1].vector.as_slice(), &[0.0, 0.5, 0.5]);
    assert_eq!(loaded[0].content_hash, content_hash("a"));
}

#[tokio::test]
async fn stored_width_mismatch_is_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let narrow = EmbeddingStore::new(tmp.path(), "course_embeddings", 2);
    narrow
        .write_all(&[StoredEmbedding {
            key: IdentityKey::new("CMSC131", "202508"),
            content_hash: content_hash("a"),
            model_id: "test".into(),
            vector: EmbeddingVector::new(vec![1.0, 0.0]),
        }])
        .await
        .unwrap();

    let wide = EmbeddingStore::new(tmp.path(), "course_embeddings", 3);
    let err = wide.load_all().await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Configuration(_))));
}

#[tokio::test]
async fn rebuild_reuses_unchanged_vectors() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path(), "course_embeddings", 256);
    let encoder = EmbeddingEncoder::new(Arc::new(HashEmbedder::new(256)), 256).unwrap();

    let mut courses = vec![course("CMSC131", "Intro Programming"), course("CMSC216", "Systems"), course("MATH140", "Calculus")];
    let first = build_embeddings(&courses, &encoder, &store, &quiet()).await.unwrap();
    assert_eq!((first.total, first.reused, first.encoded), (3, 0, 3));

    let refused = build_embeddings(&courses, &encoder, &store, &quiet()).await.unwrap_err();
    assert!(matches!(refused.downcast_ref::<Error>(), Some(Error::InvalidArgument(_))));

    courses[1].description = "Changed description".into();
    let opts = BuildOptions { overwrite: true, ..quiet() };
    let second = build_embeddings(&courses, &encoder, &store, &opts).await.unwrap();
    assert_eq!((second.total, second.reused, second.encoded), (3, 2, 1));

    let snap = load_snapshot(courses.clone(), &store, 256, encoder.model_id()).await.unwrap();
    assert_eq!(snap.vector_count(), 3);
    let hits = snap.search(&encoder.encode("Calculus").unwrap(), 1).unwrap();
    assert_eq!(hits[0].course.course_id, "MATH140");

    let foreign = load_snapshot(courses, &store, 256, "some-other-model").await.unwrap_err();
    assert!(matches!(foreign.downcast_ref::<Error>(), Some(Error::Configuration(_))));
}

fn row(id: &str, vector: Vec<f32>) -> StoredEmbedding {
    StoredEmbedding {
        key: IdentityKey::new(id, "202508"),
        content_hash: content_hash(id),
        model_id: "test".into(),
        vector: EmbeddingVector::new(vector),
    }
}

#[tokio::test]
async fn rewrite_replaces_rows_and_failed_rewrite_keeps_them() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path(), "course_embeddings", 3);
    store.write_all(&[row("CMSC131", vec![1.0, 0.0, 0.0]), row("CMSC216", vec![0.0, 1.0, 0.0])]).await.unwrap();

    store.write_all(&[row("MATH140", vec![0.0, 0.0, 1.0])]).await.unwrap();
    let loaded = store.load_all().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].key, IdentityKey::new("MATH140", "202508"));

    let err = store.write_all(&[row("MATH240", vec![0.0, 1.0, 0.0]), row("BAD100", vec![1.0, 0.0])]).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Configuration(_))));
    assert!(store.exists().await.unwrap());
    let kept = store.load_all().await.unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].vector.as_slice(), &[0.0, 0.0, 1.0]);
}
