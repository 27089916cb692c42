use crate::types::Course;

pub const FIELD_SEPARATOR: &str = " | ";

/// Renders a course into the single string the embedding model sees.
///
/// Fields appear in a fixed order as `Label: value`, joined by
/// [`FIELD_SEPARATOR`]. Empty fields are left out entirely.
pub struct TextRepresentationBuilder;

impl TextRepresentationBuilder {
    pub fn render(course: &Course) -> String {
        let level = course.level.as_str();
        let gen_ed = join_nonempty(course.gen_ed.iter().map(String::as_str));
        let instructors = join_nonempty(course.instructors.iter().map(String::as_str));

        let fields: [(&str, &str); 6] = [
            ("Course", course.title.trim()),
            ("Department", course.department.trim()),
            ("Level", level),
            ("Description", course.description.trim()),
            ("General Education", gen_ed.as_str()),
            ("Instructors", instructors.as_str()),
        ];

        fields
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(label, value)| format!("{}: {}", label, value))
            .collect::<Vec<_>>()
            .join(FIELD_SEPARATOR)
    }

    /// Query text for instructor lookups, labelled like the course field.
    pub fn instructor_query(name: &str) -> String { format!("Instructor: {}", name.trim()) }
}

fn join_nonempty<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.map(str::trim).filter(|v| !v.is_empty()).collect::<Vec<_>>().join(", ")
}
