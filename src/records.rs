//! Harvested record types
//!
//! Records are created only by the extractor and live for the duration of
//! one run. Courses and programs are keyed by their calendar code; subject
//! areas are transient and only drive the program listing sequences.

use std::fmt;

/// Calendar code of a course, e.g. `CSC108H1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CourseCode(String);

impl CourseCode {
    /// Wraps a code, rejecting empty or whitespace-only input
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            None
        } else {
            Some(Self(code))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A course listed in the calendar
///
/// Only `code` and `name` are populated by the current listing layout.
/// The remaining attributes are carried so the table shape does not change
/// once course detail pages are harvested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub code: CourseCode,
    pub name: String,
    pub faculty: Option<String>,
    pub description: Option<String>,
    pub prerequisites: Vec<CourseCode>,
}

impl Course {
    pub fn new(code: CourseCode, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            faculty: None,
            description: None,
            prerequisites: Vec::new(),
        }
    }
}

/// Category of a program, derived from its code prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Specialist,
    Major,
    Minor,
    Certificate,
    Focus,
}

impl ProgramKind {
    /// All kinds paired with the code prefix that identifies them
    pub const PREFIXES: [(&'static str, ProgramKind); 5] = [
        ("ASSPE", ProgramKind::Specialist),
        ("ASMAJ", ProgramKind::Major),
        ("ASMIN", ProgramKind::Minor),
        ("ASCER", ProgramKind::Certificate),
        ("ASFOC", ProgramKind::Focus),
    ];

    /// Classifies a program code by its prefix
    pub fn from_code(code: &str) -> Option<Self> {
        Self::PREFIXES
            .iter()
            .find(|(prefix, _)| code.starts_with(prefix))
            .map(|(_, kind)| *kind)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Specialist => "specialist",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Certificate => "certificate",
            Self::Focus => "focus",
        }
    }
}

/// A program of study (specialist, major, minor, certificate or focus)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub code: String,
    pub name: String,
    pub kind: ProgramKind,
    pub faculty: Option<String>,
}

/// An entry of the program subject area index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSubjectArea {
    /// Display name of the subject area
    pub name: String,

    /// Link as it appears in the index, relative to the index page
    pub endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_code_rejects_blank() {
        assert!(CourseCode::new("").is_none());
        assert!(CourseCode::new("   ").is_none());
        assert_eq!(CourseCode::new("CSC108H1").unwrap().as_str(), "CSC108H1");
    }

    #[test]
    fn test_program_kind_from_code() {
        assert_eq!(
            ProgramKind::from_code("ASSPE1689"),
            Some(ProgramKind::Specialist)
        );
        assert_eq!(ProgramKind::from_code("ASMAJ1689"), Some(ProgramKind::Major));
        assert_eq!(ProgramKind::from_code("ASFOC1689"), Some(ProgramKind::Focus));
        assert_eq!(ProgramKind::from_code("XXSPE1689"), None);
        assert_eq!(ProgramKind::from_code("asspe1689"), None);
    }

    #[test]
    fn test_new_course_leaves_details_empty() {
        let course = Course::new(CourseCode::new("CSC148H1").unwrap(), "Intro");
        assert!(course.faculty.is_none());
        assert!(course.description.is_none());
        assert!(course.prerequisites.is_empty());
    }
}
