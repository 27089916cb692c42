//! Structured filters and the engine that applies them after retrieval.
//!
//! Filtering is a pure subset operation. It runs after candidates are
//! retrieved, so a caller that needs `limit` results under a restrictive
//! filter has to fetch more than `limit` candidates first.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::types::{Candidate, Course, Level};

/// Conjunction of optional predicates. `None` means "no constraint".
///
/// Deserialisation goes through [`FiltersBuilder`], so a decoded value obeys
/// the same rules as a built one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFilters")]
pub struct Filters {
    terms: Option<BTreeSet<String>>,
    department: Option<String>,
    level: Option<Level>,
    min_credits: Option<f32>,
}

impl Filters {
    pub fn none() -> Self { Self::default() }

    pub fn builder() -> FiltersBuilder { FiltersBuilder::default() }

    pub fn terms(&self) -> Option<&BTreeSet<String>> { self.terms.as_ref() }

    pub fn department(&self) -> Option<&str> { self.department.as_deref() }

    pub fn level(&self) -> Option<Level> { self.level }

    pub fn min_credits(&self) -> Option<f32> { self.min_credits }

    pub fn is_empty(&self) -> bool {
        self.terms.is_none() && self.department.is_none() && self.level.is_none() && self.min_credits.is_none()
    }

    pub fn matches(&self, course: &Course) -> bool {
        if let Some(terms) = &self.terms {
            if !terms.contains(&course.term) { return false; }
        }
        if let Some(department) = &self.department {
            if &course.department != department { return false; }
        }
        if let Some(level) = self.level {
            if course.level != level { return false; }
        }
        if let Some(min) = self.min_credits {
            match course.credits {
                Some(credits) if credits >= min => {}
                _ => return false,
            }
        }
        true
    }

    /// Per predicate, `self` wins over `fallback`. Used to lay explicit filters
    /// over the ones extracted from the query text.
    pub fn merged_over(self, fallback: Filters) -> Filters {
        Filters {
            terms: self.terms.or(fallback.terms),
            department: self.department.or(fallback.department),
            level: self.level.or(fallback.level),
            min_credits: self.min_credits.or(fallback.min_credits),
        }
    }
}

#[derive(Deserialize)]
struct RawFilters {
    #[serde(default)]
    terms: Option<Vec<String>>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    level: Option<Level>,
    #[serde(default)]
    min_credits: Option<f32>,
}

impl TryFrom<RawFilters> for Filters {
    type Error = Error;

    fn try_from(raw: RawFilters) -> Result<Self> {
        let mut builder = Filters::builder().terms(raw.terms.unwrap_or_default());
        if let Some(d) = raw.department { builder = builder.department(d); }
        if let Some(l) = raw.level { builder = builder.level(l); }
        if let Some(c) = raw.min_credits { builder = builder.min_credits(c); }
        builder.build()
    }
}

/// Validating builder; the only way to set predicates from outside the crate.
#[derive(Debug, Default)]
pub struct FiltersBuilder {
    terms: Vec<String>,
    department: Option<String>,
    level: Option<Level>,
    min_credits: Option<f32>,
}

impl FiltersBuilder {
    pub fn term(mut self, term: impl Into<String>) -> Self { self.terms.push(term.into()); self }

    pub fn terms<I, S>(mut self, terms: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        self.terms.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn department(mut self, department: impl Into<String>) -> Self { self.department = Some(department.into()); self }

    pub fn level(mut self, level: Level) -> Self { self.level = Some(level); self }

    pub fn min_credits(mut self, credits: f32) -> Self { self.min_credits = Some(credits); self }

    pub fn build(self) -> Result<Filters> {
        let terms = if self.terms.is_empty() {
            None
        } else {
            let mut set = BTreeSet::new();
            for term in self.terms {
                let term = term.trim().to_string();
                if !is_term_code(&term) {
                    return Err(Error::invalid(format!("term '{}' is not a 6-digit year+season code", term)));
                }
                set.insert(term);
            }
            Some(set)
        };
        let department = match self.department {
            Some(d) if d.trim().is_empty() => return Err(Error::invalid("department filter is empty")),
            Some(d) => Some(d.trim().to_string()),
            None => None,
        };
        if let Some(min) = self.min_credits {
            if !min.is_finite() || min < 0.0 {
                return Err(Error::invalid(format!("min_credits must be a non-negative number, got {}", min)));
            }
        }
        Ok(Filters { terms, department, level: self.level, min_credits: self.min_credits })
    }
}

pub fn is_term_code(term: &str) -> bool { term.len() == 6 && term.bytes().all(|b| b.is_ascii_digit()) }

/// Applies [`Filters`] to any candidate list.
pub struct FilterEngine;

impl FilterEngine {
    /// Keeps candidates for which every present predicate holds, preserving order.
    pub fn apply<C: Candidate>(candidates: Vec<C>, filters: &Filters) -> Vec<C> {
        if filters.is_empty() { return candidates; }
        candidates.into_iter().filter(|c| filters.matches(c.course())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn course(id: &str, term: &str, dept: &str, level: Level, credits: Option<f32>) -> Course {
        Course {
            course_id: id.to_string(),
            term: term.to_string(),
            title: format!("{} title", id),
            department: dept.to_string(),
            level,
            credits,
            description: String::new(),
            gen_ed: Default::default(),
            instructors: vec![],
        }
    }

    fn catalog() -> Vec<Course> {
        vec![
            course("CMSC131", "202508", "Computer Science", Level::Undergrad, Some(4.0)),
            course("CMSC131", "202501", "Computer Science", Level::Undergrad, Some(4.0)),
            course("CMSC828", "202508", "Computer Science", Level::Grad, Some(3.0)),
            course("MATH140", "202508", "Mathematics", Level::Lower, Some(4.0)),
            course("MATH001", "202508", "Mathematics", Level::Lower, None),
        ]
    }

    #[test]
    fn empty_filters_keep_everything() {
        let courses = catalog();
        let refs: Vec<&Course> = courses.iter().collect();
        assert_eq!(FilterEngine::apply(refs, &Filters::none()).len(), 5);
    }

    #[test]
    fn predicates_are_conjunctive() {
        let courses = catalog();
        let f = Filters::builder().term("202508").department("Computer Science").build().unwrap();
        let kept = FilterEngine::apply(courses.iter().collect(), &f);
        let ids: Vec<&str> = kept.iter().map(|c| c.course_id.as_str()).collect();
        assert_eq!(ids, vec!["CMSC131", "CMSC828"]);

        let f = Filters::builder().level(Level::Grad).min_credits(3.5).build().unwrap();
        assert!(FilterEngine::apply(courses.iter().collect(), &f).is_empty());
    }

    #[test]
    fn unknown_credits_fail_min_credits() {
        let courses = catalog();
        let f = Filters::builder().min_credits(0.0).build().unwrap();
        let kept = FilterEngine::apply(courses.iter().collect(), &f);
        assert!(kept.iter().all(|c| c.course_id != "MATH001"));
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn builder_rejects_malformed_values() {
        assert!(matches!(Filters::builder().term("fall").build(), Err(Error::InvalidArgument(_))));
        assert!(matches!(Filters::builder().department("  ").build(), Err(Error::InvalidArgument(_))));
        assert!(matches!(Filters::builder().min_credits(-1.0).build(), Err(Error::InvalidArgument(_))));
        assert!(matches!(Filters::builder().min_credits(f32::NAN).build(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn explicit_filters_win_per_predicate() {
        let explicit = Filters::builder().department("Mathematics").build().unwrap();
        let extracted = Filters::builder().department("Computer Science").term("202508").build().unwrap();
        let merged = explicit.merged_over(extracted);
        assert_eq!(merged.department(), Some("Mathematics"));
        assert!(merged.terms().unwrap().contains("202508"));
    }

    #[test]
    fn decoding_validates_like_the_builder() {
        assert!(serde_json::from_str::<Filters>(r#"{"terms":["fall"]}"#).is_err());
        assert!(serde_json::from_str::<Filters>(r#"{"department":"  "}"#).is_err());
        assert!(serde_json::from_str::<Filters>(r#"{"min_credits":-5.0}"#).is_err());

        let f = Filters::builder().term("202508").level(Level::Grad).min_credits(3.0).build().unwrap();
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(serde_json::from_str::<Filters>(&json).unwrap(), f);
        assert_eq!(serde_json::from_str::<Filters>("{}").unwrap(), Filters::none());
    }

    proptest! {
        #[test]
        fn filtering_is_monotonic(mask in proptest::collection::vec(any::<bool>(), 5), min in 0.0f32..5.0, use_level in any::<bool>()) {
            let courses = catalog();
            let mut builder = Filters::builder().min_credits(min);
            if use_level { builder = builder.level(Level::Undergrad); }
            let filters = builder.build().unwrap();

            let superset: Vec<&Course> = courses.iter().collect();
            let subset: Vec<&Course> = courses.iter().zip(&mask).filter(|(_, keep)| **keep).map(|(c, _)| c).collect();

            let from_super = FilterEngine::apply(superset.clone(), &filters);
            let from_sub = FilterEngine::apply(subset, &filters);

            prop_assert!(from_super.iter().all(|c| superset.iter().any(|s| s.same_key(c))));
            prop_assert!(from_sub.iter().all(|c| from_super.iter().any(|s| s.same_key(c))));
        }
    }
}
