//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars, then validates once. Every table here is fixed at
//! start-up; nothing is mutable per request.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::filter::is_term_code;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data: DataSettings,
    pub embedding: EmbeddingSettings,
    pub search: SearchSettings,
    pub query: QuerySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Scraper output: one JSON file per course, any depth.
    pub courses_dir: String,
    /// LanceDB directory holding the embeddings table.
    pub index_dir: String,
    pub table: String,
    /// Terms to load; empty loads every term found.
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// `bert` (sentence-transformer checkpoint) or `hash`.
    pub model: String,
    /// Versioned name recorded next to every stored vector.
    pub model_id: String,
    pub model_dir: String,
    pub dimension: usize,
    pub max_len: usize,
    pub batch_size: usize,
    /// Only `cosine` is supported.
    pub metric: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    pub default_limit: usize,
    pub max_limit: usize,
    pub default_alpha: f32,
    /// First retrieval fetches `limit * overfetch_factor` candidates.
    pub overfetch_factor: usize,
    /// Same, for instructor lookups.
    pub instructor_overfetch: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonCode {
    pub season: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentPhrase {
    pub phrase: String,
    pub department: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySettings {
    pub seasons: Vec<SeasonCode>,
    /// Checked in order; the first phrase found in the query wins.
    pub departments: Vec<DepartmentPhrase>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data: DataSettings {
                courses_dir: "data".to_string(),
                index_dir: "indexes/lancedb".to_string(),
                table: "course_embeddings".to_string(),
                terms: vec![],
            },
            embedding: EmbeddingSettings {
                model: "bert".to_string(),
                model_id: "all-MiniLM-L6-v2".to_string(),
                model_dir: "models/all-MiniLM-L6-v2".to_string(),
                dimension: 384,
                max_len: 256,
                batch_size: 32,
                metric: "cosine".to_string(),
            },
            search: SearchSettings {
                default_limit: 10,
                max_limit: 100,
                default_alpha: 0.7,
                overfetch_factor: 3,
                instructor_overfetch: 5,
            },
            query: QuerySettings { seasons: default_seasons(), departments: default_departments() },
        }
    }
}

fn default_seasons() -> Vec<SeasonCode> {
    [("spring", "01"), ("summer", "05"), ("fall", "08"), ("winter", "12")]
        .into_iter()
        .map(|(season, code)| SeasonCode { season: season.to_string(), code: code.to_string() })
        .collect()
}

fn default_departments() -> Vec<DepartmentPhrase> {
    [
        ("computer science", "Computer Science"),
        ("programming", "Computer Science"),
        ("mathematics", "Mathematics"),
        ("math", "Mathematics"),
        ("statistics", "Statistics and Probability"),
        ("journalism", "Journalism"),
        ("economics", "Economics"),
        ("psychology", "Psychology"),
        ("history", "History"),
        ("biology", "Biological Sciences Program"),
        ("physics", "Physics"),
        ("chemistry", "Chemistry"),
    ]
    .into_iter()
    .map(|(phrase, department)| DepartmentPhrase { phrase: phrase.to_string(), department: department.to_string() })
    .collect()
}

impl Settings {
    /// Defaults, then `config.toml`, then `config.<env>.toml`, then `APP_*`
    /// variables (`__` separates nested keys, e.g. `APP_EMBEDDING__MODEL`).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::from_figment(Self::figment_for_env(&env_name))
    }

    pub fn figment_for_env(env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment.merge(Env::prefixed("APP_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract().map_err(|e| Error::config(format!("failed to read settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let e = &self.embedding;
        if e.dimension == 0 { return Err(Error::config("embedding.dimension must be positive")); }
        if !e.metric.eq_ignore_ascii_case("cosine") {
            return Err(Error::config(format!("unsupported distance metric '{}', only cosine is available", e.metric)));
        }
        if !matches!(e.model.as_str(), "bert" | "hash") {
            return Err(Error::config(format!("unknown embedding model kind '{}'", e.model)));
        }
        if e.batch_size == 0 || e.max_len == 0 { return Err(Error::config("embedding.batch_size and embedding.max_len must be positive")); }

        let s = &self.search;
        if s.default_limit == 0 || s.max_limit < s.default_limit {
            return Err(Error::config(format!("search limits are inconsistent: default {} max {}", s.default_limit, s.max_limit)));
        }
        if !(0.0..=1.0).contains(&s.default_alpha) { return Err(Error::config("search.default_alpha must lie in [0, 1]")); }
        if s.overfetch_factor == 0 || s.instructor_overfetch == 0 { return Err(Error::config("over-fetch factors must be at least 1")); }

        let mut seen = std::collections::HashSet::new();
        for sc in &self.query.seasons {
            let season_ok = !sc.season.is_empty() && sc.season.chars().all(|c| c.is_ascii_lowercase());
            let code_ok = sc.code.len() == 2 && sc.code.bytes().all(|b| b.is_ascii_digit());
            if !season_ok || !code_ok { return Err(Error::config(format!("bad season table entry {} -> {}", sc.season, sc.code))); }
            if !seen.insert(sc.season.as_str()) { return Err(Error::config(format!("season '{}' listed twice", sc.season))); }
        }
        if let Some(dp) = self.query.departments.iter().find(|d| d.phrase.trim().is_empty() || d.department.trim().is_empty()) {
            return Err(Error::config(format!("bad department table entry '{}' -> '{}'", dp.phrase, dp.department)));
        }
        if let Some(t) = self.data.terms.iter().find(|t| !is_term_code(t)) {
            return Err(Error::config(format!("data.terms entry '{}' is not a term code", t)));
        }
        Ok(())
    }

    pub fn courses_dir(&self) -> PathBuf { expand_path(&self.data.courses_dir) }

    pub fn index_dir(&self) -> PathBuf { expand_path(&self.data.index_dir) }

    pub fn model_dir(&self) -> PathBuf { expand_path(&self.embedding.model_dir) }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
