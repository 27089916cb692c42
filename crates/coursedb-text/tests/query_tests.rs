use coursedb_core::config::{DepartmentPhrase, QuerySettings, Settings};
use coursedb_core::{Filters, FiltersBuilder, Level};
use coursedb_text::{FilterRule, QueryUnderstanding};
use proptest::prelude::*;

fn understanding() -> QueryUnderstanding { QueryUnderstanding::from_settings(&Settings::default().query).unwrap() }

#[test]
fn fall_2025_maps_to_term_code() {
    let f = understanding().extract("fall 2025 courses").unwrap();
    assert_eq!(f.terms().unwrap().iter().cloned().collect::<Vec<_>>(), vec!["202508"]);
    assert!(f.level().is_none());
}

#[test]
fn first_season_year_wins() {
    let f = understanding().extract("Spring 2024 or fall 2025").unwrap();
    assert_eq!(f.terms().unwrap().iter().next().map(String::as_str), Some("202401"));
}

#[test]
fn beginner_maps_to_lower_level() {
    let f = understanding().extract("beginner programming").unwrap();
    assert_eq!(f.level(), Some(Level::Lower));
    assert_eq!(f.department(), Some("Computer Science"));
}

#[test]
fn lower_wins_when_both_level_groups_match() {
    let f = understanding().extract("advanced or introductory statistics").unwrap();
    assert_eq!(f.level(), Some(Level::Lower));
    assert_eq!(f.department(), Some("Statistics and Probability"));
}

#[test]
fn graduate_is_matched_as_a_whole_word() {
    let qu = understanding();
    assert_eq!(qu.extract("graduate seminar").unwrap().level(), Some(Level::Grad));
    assert_eq!(qu.extract("undergraduate seminar").unwrap().level(), None);
}

#[test]
fn department_table_order_decides() {
    let settings = QuerySettings {
        seasons: Settings::default().query.seasons,
        departments: vec![
            DepartmentPhrase { phrase: "data".into(), department: "Information Studies".into() },
            DepartmentPhrase { phrase: "data science".into(), department: "Computer Science".into() },
        ],
    };
    let qu = QueryUnderstanding::from_settings(&settings).unwrap();
    assert_eq!(qu.extract("data science electives").unwrap().department(), Some("Information Studies"));
}

#[test]
fn plain_query_extracts_nothing() {
    assert!(understanding().extract("courses about whales").unwrap().is_empty());
}

#[test]
fn explicit_filters_take_precedence() {
    let extracted = understanding().extract("fall 2025 beginner math").unwrap();
    let explicit = Filters::builder().term("202601").build().unwrap();
    let merged = QueryUnderstanding::merge(explicit, extracted);
    assert_eq!(merged.terms().unwrap().iter().next().map(String::as_str), Some("202601"));
    assert_eq!(merged.level(), Some(Level::Lower));
    assert_eq!(merged.department(), Some("Mathematics"));
}

struct CreditsRule;

impl FilterRule for CreditsRule {
    fn name(&self) -> &'static str { "credits" }

    fn apply(&self, query: &str, builder: FiltersBuilder) -> FiltersBuilder {
        if query.contains("4 credit") { builder.min_credits(4.0) } else { builder }
    }
}

#[test]
fn custom_rules_plug_in() {
    let qu = QueryUnderstanding::with_rules(vec![Box::new(CreditsRule)]);
    assert_eq!(qu.extract("4 credit courses").unwrap().min_credits(), Some(4.0));
}

#[test]
fn rules_run_in_declared_order() {
    assert_eq!(understanding().rule_names(), vec!["season_year", "level", "department"]);
}

proptest! {
    #[test]
    fn extraction_ignores_case_and_padding(
        q in prop::sample::select(vec![
            "fall 2025 beginner programming",
            "graduate mathematics spring 2026",
            "introductory economics",
            "advanced history seminar",
            "data structures",
        ]),
        upper in any::<bool>(),
        pad in 0usize..4,
    ) {
        let qu = understanding();
        let plain = qu.extract(q).unwrap();
        let text = if upper { q.to_uppercase() } else { q.to_string() };
        let padded = format!("{}{}{}", " ".repeat(pad), text, " ".repeat(pad));
        prop_assert_eq!(qu.extract(&padded).unwrap(), plain);
    }
}
