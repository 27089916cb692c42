use std::fs;
use tempfile::TempDir;

use coursedb_cli::{describe_filters, format_result, load_courses};
use coursedb_core::{Filters, Level, RankedResult};

#[test]
fn describes_filters_in_fixed_order() {
    assert_eq!(describe_filters(&Filters::none()), "none");
    let f = Filters::builder().term("202508").department("Mathematics").level(Level::Lower).min_credits(3.0).build().unwrap();
    assert_eq!(describe_filters(&f), "term in [202508], department = Mathematics, level = Lower, credits >= 3");
}

#[test]
fn loads_and_formats_courses() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("courses.json"),
        r#"[{"id": "MATH140", "title": "Calculus I", "term": "202508", "credits": "4",
             "department": "Mathematics", "level": "Lower Level", "instructors": ["Sam Green"]},
            {"id": "MATH140", "title": "Calculus I", "term": "202501", "credits": "4", "department": "Mathematics"}]"#,
    )
    .unwrap();

    let courses = load_courses(tmp.path(), &["202508".to_string()]).unwrap();
    assert_eq!(courses.len(), 1);

    let r = RankedResult { course: courses[0].clone(), semantic_score: 0.5, keyword_score: 1.0, combined_score: 0.65 };
    let line = format_result(1, &r, true);
    assert!(line.starts_with(" 1. MATH140 (202508) Calculus I | Mathematics | Lower | 4 cr | score=0.6500"));
    assert!(line.contains("semantic=0.5000 keyword=1.0000"));
    assert!(line.contains("instructors: Sam Green"));
}
