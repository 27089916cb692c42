pub mod keyword;
pub mod query;

pub use keyword::KeywordMatcher;
pub use query::{DepartmentRule, FilterRule, LevelRule, QueryUnderstanding, SeasonYearRule};
