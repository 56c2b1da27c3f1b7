use serde::{Deserialize, Serialize};
use std::fmt;

/// One level of the subject → semester → unit → lesson path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SelectionLevel {
    Subject,
    Semester,
    Unit,
    Lesson,
}

impl SelectionLevel {
    pub const ALL: [SelectionLevel; 4] = [
        SelectionLevel::Subject,
        SelectionLevel::Semester,
        SelectionLevel::Unit,
        SelectionLevel::Lesson,
    ];

    /// Levels that depend on this one and must be cleared when it changes.
    #[must_use]
    pub fn dependents(self) -> &'static [SelectionLevel] {
        match self {
            SelectionLevel::Subject => &[
                SelectionLevel::Semester,
                SelectionLevel::Unit,
                SelectionLevel::Lesson,
            ],
            SelectionLevel::Semester => &[SelectionLevel::Unit, SelectionLevel::Lesson],
            SelectionLevel::Unit => &[SelectionLevel::Lesson],
            SelectionLevel::Lesson => &[],
        }
    }
}

impl fmt::Display for SelectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionLevel::Subject => "subject",
            SelectionLevel::Semester => "semester",
            SelectionLevel::Unit => "unit",
            SelectionLevel::Lesson => "lesson",
        };
        f.write_str(name)
    }
}

/// Path to a lesson in the catalog.
///
/// Empty strings mean "not chosen yet". A selection is complete only when all
/// four parts are set; whether it resolves is up to the [`Catalog`](crate::model::Catalog).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    subject: String,
    semester: String,
    unit: String,
    lesson: String,
}

impl Selection {
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        semester: impl Into<String>,
        unit: impl Into<String>,
        lesson: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            semester: semester.into(),
            unit: unit.into(),
            lesson: lesson.into(),
        }
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn semester(&self) -> &str {
        &self.semester
    }

    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    #[must_use]
    pub fn lesson(&self) -> &str {
        &self.lesson
    }

    #[must_use]
    pub fn get(&self, level: SelectionLevel) -> &str {
        match level {
            SelectionLevel::Subject => &self.subject,
            SelectionLevel::Semester => &self.semester,
            SelectionLevel::Unit => &self.unit,
            SelectionLevel::Lesson => &self.lesson,
        }
    }

    fn slot_mut(&mut self, level: SelectionLevel) -> &mut String {
        match level {
            SelectionLevel::Subject => &mut self.subject,
            SelectionLevel::Semester => &mut self.semester,
            SelectionLevel::Unit => &mut self.unit,
            SelectionLevel::Lesson => &mut self.lesson,
        }
    }

    /// Set one level and clear every level below it.
    pub fn set(&mut self, level: SelectionLevel, value: impl Into<String>) {
        *self.slot_mut(level) = value.into();
        for dependent in level.dependents() {
            self.slot_mut(*dependent).clear();
        }
    }

    /// True when every level has a non-empty value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        SelectionLevel::ALL
            .iter()
            .all(|level| !self.get(*level).is_empty())
    }

    /// True when nothing at all has been chosen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        SelectionLevel::ALL
            .iter()
            .all(|level| self.get(*level).is_empty())
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.subject, self.semester, self.unit, self.lesson
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changing_subject_clears_everything_below() {
        let mut selection = Selection::new("english", "first", "unit1", "Introduction");
        selection.set(SelectionLevel::Subject, "arabic");

        assert_eq!(selection.subject(), "arabic");
        assert_eq!(selection.semester(), "");
        assert_eq!(selection.unit(), "");
        assert_eq!(selection.lesson(), "");
        assert!(!selection.is_complete());
    }

    #[test]
    fn changing_semester_keeps_subject() {
        let mut selection = Selection::new("english", "first", "unit1", "Introduction");
        selection.set(SelectionLevel::Semester, "second");

        assert_eq!(selection.subject(), "english");
        assert_eq!(selection.semester(), "second");
        assert_eq!(selection.unit(), "");
        assert_eq!(selection.lesson(), "");
    }

    #[test]
    fn changing_lesson_touches_nothing_else() {
        let mut selection = Selection::new("english", "first", "unit1", "Introduction");
        selection.set(SelectionLevel::Lesson, "Grammar");
        assert_eq!(selection, Selection::new("english", "first", "unit1", "Grammar"));
        assert!(selection.is_complete());
    }

    #[test]
    fn default_selection_is_empty() {
        let selection = Selection::default();
        assert!(selection.is_empty());
        assert!(!selection.is_complete());
    }
}
