//! Reads the scraper's JSON output into [`Course`] records.
//!
//! Bad files and bad records degrade the load, they never abort it: each one
//! is logged and counted in the [`LoadReport`].

use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::filter::is_term_code;
use crate::types::{Course, IdentityKey, Level};

const COURSE_ID_PATTERN: &str = r"^[A-Z]{2,8}\d{3,4}[A-Z]?$";

#[derive(Debug, Deserialize)]
struct RawCourse {
    #[serde(alias = "course_id")]
    id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    credits: Option<serde_json::Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    level: Option<String>,
    term: Option<serde_json::Value>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default, alias = "gen-ed")]
    gen_ed: Option<GenEd>,
    #[serde(default)]
    sections: Vec<RawSection>,
    #[serde(default)]
    instructors: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenEd {
    List(Vec<String>),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    instructors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub courses: Vec<Course>,
    pub files_read: usize,
    pub files_failed: usize,
    pub records_skipped: usize,
    pub duplicates: usize,
}

pub struct CourseLoader {
    id_pattern: Regex,
    allowed_terms: Option<BTreeSet<String>>,
}

impl CourseLoader {
    /// `allowed_terms` empty means every term found on disk is loaded.
    pub fn new(allowed_terms: &[String]) -> Result<Self> {
        let id_pattern = Regex::new(COURSE_ID_PATTERN).map_err(|e| Error::config(format!("course id pattern: {}", e)))?;
        let allowed_terms = if allowed_terms.is_empty() {
            None
        } else {
            if let Some(bad) = allowed_terms.iter().find(|t| !is_term_code(t)) {
                return Err(Error::invalid(format!("term '{}' is not a 6-digit year+season code", bad)));
            }
            Some(allowed_terms.iter().cloned().collect())
        };
        Ok(Self { id_pattern, allowed_terms })
    }

    pub fn is_valid_course_id(&self, id: &str) -> bool { self.id_pattern.is_match(id) }

    pub fn load_dir(&self, data_dir: &Path) -> Result<LoadReport> {
        if !data_dir.is_dir() {
            return Err(Error::config(format!("course data directory {} does not exist", data_dir.display())));
        }
        let files = list_json_files(data_dir);
        let mut report = LoadReport::default();
        let mut seen: HashSet<IdentityKey> = HashSet::new();

        for path in &files {
            let records = match read_records(path) {
                Ok(records) => records,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable course file");
                    report.files_failed += 1;
                    continue;
                }
            };
            report.files_read += 1;
            for value in records {
                let Some(course) = self.convert(value, path) else {
                    report.records_skipped += 1;
                    continue;
                };
                if let Some(terms) = &self.allowed_terms {
                    if !terms.contains(&course.term) { continue; }
                }
                if !seen.insert(course.key()) {
                    debug!(key = %course.key(), file = %path.display(), "duplicate course offering ignored");
                    report.duplicates += 1;
                    continue;
                }
                report.courses.push(course);
            }
        }

        report.courses.sort_by(|a, b| a.cmp_key(b));
        info!(
            files = report.files_read,
            failed = report.files_failed,
            courses = report.courses.len(),
            skipped = report.records_skipped,
            duplicates = report.duplicates,
            "loaded course catalog"
        );
        Ok(report)
    }

    /// Parses one JSON document (object or array of objects).
    pub fn parse_str(&self, json: &str) -> Result<Vec<Course>> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::invalid(format!("malformed course JSON: {}", e)))?;
        Ok(into_records(value).into_iter().filter_map(|v| self.convert(v, Path::new("<inline>"))).collect())
    }

    fn convert(&self, value: serde_json::Value, origin: &Path) -> Option<Course> {
        let raw: RawCourse = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(file = %origin.display(), error = %e, "skipping malformed course record");
                return None;
            }
        };

        let course_id = raw.id.as_deref().map(str::trim).unwrap_or_default().to_string();
        let title = raw.title.as_deref().map(str::trim).unwrap_or_default().to_string();
        let term = raw.term.as_ref().map(term_string).unwrap_or_default();

        if course_id.is_empty() || title.is_empty() || term.is_empty() {
            warn!(file = %origin.display(), id = %course_id, "course record lacks id, title or term");
            return None;
        }
        if !self.is_valid_course_id(&course_id) {
            warn!(file = %origin.display(), id = %course_id, "invalid course id");
            return None;
        }
        if !is_term_code(&term) {
            warn!(file = %origin.display(), id = %course_id, term = %term, "invalid term code");
            return None;
        }

        let level = raw
            .level
            .as_deref()
            .and_then(|l| l.parse::<Level>().ok())
            .unwrap_or_else(|| Level::from_course_number(&course_id));

        let gen_ed: BTreeSet<String> = match raw.gen_ed {
            Some(GenEd::List(items)) => items.iter().flat_map(|s| split_codes(s)).collect(),
            Some(GenEd::Text(text)) => split_codes(&text).collect(),
            None => BTreeSet::new(),
        };

        let mut instructors: Vec<String> = Vec::new();
        let names = raw.instructors.iter().chain(raw.sections.iter().flat_map(|s| s.instructors.iter()));
        for name in names {
            let name = name.trim();
            if !name.is_empty() && !instructors.iter().any(|n| n == name) {
                instructors.push(name.to_string());
            }
        }

        Some(Course {
            course_id,
            term,
            title,
            department: raw.department.unwrap_or_default().trim().to_string(),
            level,
            credits: raw.credits.as_ref().and_then(parse_credits),
            description: raw.description.unwrap_or_default().trim().to_string(),
            gen_ed,
            instructors,
        })
    }
}

fn read_records(path: &Path) -> anyhow::Result<Vec<serde_json::Value>> {
    let text = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    Ok(into_records(value))
}

fn into_records(value: serde_json::Value) -> Vec<serde_json::Value> {
    match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    }
}

fn term_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn split_codes(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Leading decimal of the catalog value: `"3"` → 3, `"1-3"` → 1, `"Unknown"` → none.
pub fn parse_credits(value: &serde_json::Value) -> Option<f32> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(|f| f as f32).filter(|f| f.is_finite() && *f >= 0.0),
        serde_json::Value::String(s) => {
            let lead: String = s.trim().chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
            lead.parse::<f32>().ok()
        }
        _ => None,
    }
}

fn list_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") { files.push(path.to_path_buf()); }
    }
    files.sort();
    files
}
