use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use coursedb_core::config::{DepartmentPhrase, QuerySettings};
use coursedb_core::{Error, Filters, FiltersBuilder, Level, Result};

/// One extraction rule. Sees the lower-cased query and may set at most one
/// predicate on the builder.
pub trait FilterRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, query: &str, builder: FiltersBuilder) -> FiltersBuilder;
}

/// `<season> <yyyy>` → term `yyyy` + season code. Leftmost match wins.
pub struct SeasonYearRule {
    pattern: Regex,
    codes: HashMap<String, String>,
}

impl SeasonYearRule {
    pub fn new(table: &[(String, String)]) -> Result<Self> {
        if table.is_empty() { return Err(Error::config("season table is empty")); }
        let alternation = table.iter().map(|(season, _)| regex::escape(season)).collect::<Vec<_>>().join("|");
        let pattern = Regex::new(&format!(r"\b({})\s+(\d{{4}})\b", alternation))
            .map_err(|e| Error::config(format!("season pattern: {}", e)))?;
        Ok(Self { pattern, codes: table.iter().cloned().collect() })
    }
}

impl FilterRule for SeasonYearRule {
    fn name(&self) -> &'static str { "season_year" }

    fn apply(&self, query: &str, builder: FiltersBuilder) -> FiltersBuilder {
        let Some(caps) = self.pattern.captures(query) else { return builder };
        match self.codes.get(&caps[1]) {
            Some(code) => builder.term(format!("{}{}", &caps[2], code)),
            None => builder,
        }
    }
}

/// Whole-word level keywords; groups are tried in order and the first group
/// with a hit decides.
pub struct LevelRule {
    groups: Vec<(Regex, Level)>,
}

impl LevelRule {
    pub fn new() -> Result<Self> {
        let groups = [(r"\b(beginner|introductory)\b", Level::Lower), (r"\b(advanced|graduate)\b", Level::Grad)]
            .into_iter()
            .map(|(p, level)| Regex::new(p).map(|re| (re, level)).map_err(|e| Error::config(format!("level pattern: {}", e))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { groups })
    }
}

impl FilterRule for LevelRule {
    fn name(&self) -> &'static str { "level" }

    fn apply(&self, query: &str, builder: FiltersBuilder) -> FiltersBuilder {
        match self.groups.iter().find(|(re, _)| re.is_match(query)) {
            Some((_, level)) => builder.level(*level),
            None => builder,
        }
    }
}

/// First table entry whose phrase occurs in the query sets the department.
pub struct DepartmentRule {
    table: Vec<(String, String)>,
}

impl DepartmentRule {
    pub fn new(table: &[DepartmentPhrase]) -> Self {
        Self { table: table.iter().map(|d| (d.phrase.trim().to_lowercase(), d.department.trim().to_string())).collect() }
    }
}

impl FilterRule for DepartmentRule {
    fn name(&self) -> &'static str { "department" }

    fn apply(&self, query: &str, builder: FiltersBuilder) -> FiltersBuilder {
        match self.table.iter().find(|(phrase, _)| query.contains(phrase.as_str())) {
            Some((_, department)) => builder.department(department.clone()),
            None => builder,
        }
    }
}

/// Deterministic pattern rules that turn free text into [`Filters`]. Rules
/// run in a fixed order: season+year, level, department.
pub struct QueryUnderstanding {
    rules: Vec<Box<dyn FilterRule>>,
}

impl QueryUnderstanding {
    pub fn from_settings(settings: &QuerySettings) -> Result<Self> {
        let seasons: Vec<(String, String)> =
            settings.seasons.iter().map(|s| (s.season.to_lowercase(), s.code.clone())).collect();
        Ok(Self::with_rules(vec![
            Box::new(SeasonYearRule::new(&seasons)?),
            Box::new(LevelRule::new()?),
            Box::new(DepartmentRule::new(&settings.departments)),
        ]))
    }

    pub fn with_rules(rules: Vec<Box<dyn FilterRule>>) -> Self { Self { rules } }

    pub fn rule_names(&self) -> Vec<&'static str> { self.rules.iter().map(|r| r.name()).collect() }

    pub fn extract(&self, query: &str) -> Result<Filters> {
        let lowered = query.to_lowercase();
        let builder = self.rules.iter().fold(Filters::builder(), |b, rule| rule.apply(&lowered, b));
        let filters = builder.build()?;
        debug!(query, ?filters, "extracted filters");
        Ok(filters)
    }

    /// Explicit predicates override extracted ones, one predicate at a time.
    pub fn merge(explicit: Filters, extracted: Filters) -> Filters { explicit.merged_over(extracted) }
}
