//! Domain types shared by the loader, the indexes and the ranker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Course level as published by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Lower,
    Upper,
    Grad,
    Undergrad,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Lower => "Lower",
            Level::Upper => "Upper",
            Level::Grad => "Grad",
            Level::Undergrad => "Undergrad",
        }
    }

    /// Catalog convention: course numbers from 500 up are graduate courses.
    pub fn from_course_number(course_id: &str) -> Level {
        let digits: String = course_id
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(char::is_ascii_digit)
            .collect();
        match digits.parse::<u32>() {
            Ok(n) if n >= 500 => Level::Grad,
            _ => Level::Undergrad,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Level {
    type Err = Error;

    /// Accepts the short names plus the catalog's long forms ("Lower Level",
    /// "Graduate", "Undergraduate").
    fn from_str(s: &str) -> Result<Self> {
        let norm = s.trim().to_ascii_lowercase();
        let norm = norm.strip_suffix(" level").unwrap_or(&norm);
        match norm {
            "lower" => Ok(Level::Lower),
            "upper" => Ok(Level::Upper),
            "grad" | "graduate" => Ok(Level::Grad),
            "undergrad" | "undergraduate" => Ok(Level::Undergrad),
            _ => Err(Error::invalid(format!("unknown course level '{}'", s.trim()))),
        }
    }
}

/// `(course_id, term)`: one offering of a course. Orders by course id, then term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub course_id: String,
    pub term: String,
}

impl IdentityKey {
    pub fn new(course_id: impl Into<String>, term: impl Into<String>) -> Self {
        Self { course_id: course_id.into(), term: term.into() }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}@{}", self.course_id, self.term) }
}

/// A course offering, as loaded from the catalog.
///
/// - `term`: 6-digit year+season code, e.g. `202508`
/// - `credits`: `None` when the catalog value is not numeric
/// - `gen_ed`: general-education category codes, kept sorted
/// - `instructors`: first-seen order across sections, without duplicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: String,
    pub term: String,
    pub title: String,
    pub department: String,
    pub level: Level,
    pub credits: Option<f32>,
    pub description: String,
    #[serde(default)]
    pub gen_ed: BTreeSet<String>,
    #[serde(default)]
    pub instructors: Vec<String>,
}

impl Course {
    pub fn key(&self) -> IdentityKey { IdentityKey::new(self.course_id.clone(), self.term.clone()) }

    /// Orders two courses by identity key without allocating.
    pub fn cmp_key(&self, other: &Course) -> std::cmp::Ordering {
        self.course_id.cmp(&other.course_id).then_with(|| self.term.cmp(&other.term))
    }

    pub fn same_key(&self, other: &Course) -> bool {
        self.course_id == other.course_id && self.term == other.term
    }
}

/// A fixed-length embedding. Length checks happen where vectors enter the
/// index or leave the encoder, never by truncating or padding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self { Self(values) }

    pub fn dim(&self) -> usize { self.0.len() }

    pub fn as_slice(&self) -> &[f32] { &self.0 }

    pub fn into_inner(self) -> Vec<f32> { self.0 }

    pub fn norm(&self) -> f32 { self.0.iter().map(|x| x * x).sum::<f32>().sqrt() }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self { Self(values) }
}

/// Anything that can be filtered: retrieval hits borrow their course from
/// the snapshot they came from.
pub trait Candidate {
    fn course(&self) -> &Course;
}

impl Candidate for &Course {
    fn course(&self) -> &Course { self }
}

/// A candidate with a score in `[0, 1]`, higher is better.
#[derive(Debug, Clone, Copy)]
pub struct ScoredHit<'s> {
    pub course: &'s Course,
    pub score: f32,
}

impl Candidate for ScoredHit<'_> {
    fn course(&self) -> &Course { self.course }
}

/// One row of the final ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub course: Course,
    pub semantic_score: f32,
    pub keyword_score: f32,
    pub combined_score: f32,
}
