use coursedb_core::config::Settings;
use coursedb_core::Error;
use coursedb_embed::load_embedder;

#[test]
fn missing_model_dir_is_configuration_error() {
    if std::env::var("APP_USE_FAKE_EMBEDDINGS").is_ok() { return; }
    let mut settings = Settings::default();
    settings.embedding.model = "bert".into();
    settings.embedding.model_dir = "/definitely/not/here".into();
    assert!(matches!(load_embedder(&settings).err(), Some(Error::Configuration(_))));
}
