use coursedb_core::{Course, Error, Result, ScoredHit};

/// Case-insensitive substring match over title and description. Every match
/// scores `1.0`; non-matches are left out.
pub struct KeywordMatcher;

impl KeywordMatcher {
    pub fn search<'s>(courses: &'s [Course], query: &str, k: usize) -> Result<Vec<ScoredHit<'s>>> {
        if k == 0 { return Err(Error::invalid("k must be at least 1")); }
        let needle = query.trim().to_lowercase();
        if needle.is_empty() { return Ok(vec![]); }

        let mut hits: Vec<ScoredHit<'s>> = courses
            .iter()
            .filter(|c| c.title.to_lowercase().contains(&needle) || c.description.to_lowercase().contains(&needle))
            .map(|course| ScoredHit { course, score: 1.0 })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.course.cmp_key(b.course)));
        hits.truncate(k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursedb_core::Level;

    fn course(id: &str, term: &str, title: &str, description: &str) -> Course {
        Course {
            course_id: id.into(),
            term: term.into(),
            title: title.into(),
            department: "Computer Science".into(),
            level: Level::Undergrad,
            credits: None,
            description: description.into(),
            gen_ed: Default::default(),
            instructors: vec![],
        }
    }

    #[test]
    fn matches_title_or_description_case_insensitively() {
        let courses = vec![
            course("CMSC422", "202508", "Introduction to Machine Learning", ""),
            course("CMSC320", "202508", "Data Science", "Covers MACHINE LEARNING basics."),
            course("CMSC216", "202508", "Computer Systems", "Low-level programming."),
        ];
        let hits = KeywordMatcher::search(&courses, "  machine learning ", 10).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.course.course_id.as_str()).collect();
        assert_eq!(ids, vec!["CMSC320", "CMSC422"]);
        assert!(hits.iter().all(|h| h.score == 1.0));
    }

    #[test]
    fn truncates_and_orders_by_key() {
        let courses = vec![
            course("CMSC131", "202508", "Programming I", ""),
            course("CMSC131", "202501", "Programming I", ""),
            course("CMSC132", "202508", "Programming II", ""),
        ];
        let hits = KeywordMatcher::search(&courses, "programming", 2).unwrap();
        let keys: Vec<String> = hits.iter().map(|h| h.course.key().to_string()).collect();
        assert_eq!(keys, vec!["CMSC131@202501", "CMSC131@202508"]);
    }

    #[test]
    fn blank_query_and_zero_k() {
        let courses = vec![course("CMSC131", "202508", "Programming I", "")];
        assert!(KeywordMatcher::search(&courses, "   ", 5).unwrap().is_empty());
        assert!(matches!(KeywordMatcher::search(&courses, "x", 0), Err(Error::InvalidArgument(_))));
    }
}
