use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::question::Question;
use crate::model::selection::{Selection, SelectionLevel};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{level} key cannot be empty")]
    EmptyKey { level: SelectionLevel },

    #[error("duplicate {level} key {key:?}")]
    DuplicateKey { level: SelectionLevel, key: String },

    #[error("lesson {selection} has no questions")]
    EmptyLesson { selection: Selection },
}

//
// ─── CATALOG TREE ──────────────────────────────────────────────────────────────
//

/// A selectable entry for one level, e.g. to populate a dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subject {
    key: String,
    #[serde(default, rename = "name")]
    label: String,
    #[serde(default)]
    semesters: Vec<Semester>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Semester {
    key: String,
    #[serde(default, rename = "name")]
    label: String,
    #[serde(default)]
    units: Vec<Unit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Unit {
    key: String,
    #[serde(default, rename = "name")]
    label: String,
    #[serde(default)]
    lessons: Vec<Lesson>,
}

/// A lesson and its questions in authored order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Lesson {
    title: String,
    questions: Vec<Question>,
}

impl Lesson {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

/// Read-only question repository keyed by subject, semester, unit and lesson.
///
/// Entries keep their authored order so listings come out the way the content
/// was written. Lookups are linear; catalogs are small.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CatalogDocument")]
pub struct Catalog {
    subjects: Vec<Subject>,
}

/// Catalog as written on disk, before validation.
#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    subjects: Vec<Subject>,
}

impl TryFrom<CatalogDocument> for Catalog {
    type Error = CatalogError;

    fn try_from(document: CatalogDocument) -> Result<Self, Self::Error> {
        let mut catalog = Catalog {
            subjects: document.subjects,
        };
        catalog.normalize()?;
        Ok(catalog)
    }
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a catalog document.
    ///
    /// Every question is checked while parsing; keys must be non-empty and
    /// unique per level, and every lesson must have at least one question.
    /// Missing labels fall back to the key (subjects are capitalised).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on malformed JSON, invalid questions, or a
    /// structural problem.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Catalog::try_from(document)
    }

    /// Add a lesson, creating the subject, semester and unit if needed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyKey` for an incomplete selection,
    /// `CatalogError::EmptyLesson` for an empty question list, or
    /// `CatalogError::DuplicateKey` if the lesson already exists.
    pub fn insert_lesson(
        &mut self,
        selection: &Selection,
        questions: Vec<Question>,
    ) -> Result<(), CatalogError> {
        if let Some(level) = SelectionLevel::ALL
            .into_iter()
            .find(|level| selection.get(*level).is_empty())
        {
            return Err(CatalogError::EmptyKey { level });
        }
        if questions.is_empty() {
            return Err(CatalogError::EmptyLesson {
                selection: selection.clone(),
            });
        }

        let subject = entry(&mut self.subjects, selection.subject(), |s| &s.key, |key| Subject {
            key: key.to_string(),
            label: capitalize(key),
            semesters: Vec::new(),
        });
        let semester = entry(&mut subject.semesters, selection.semester(), |s| &s.key, |key| {
            Semester {
                key: key.to_string(),
                label: key.to_string(),
                units: Vec::new(),
            }
        });
        let unit = entry(&mut semester.units, selection.unit(), |u| &u.key, |key| Unit {
            key: key.to_string(),
            label: key.to_string(),
            lessons: Vec::new(),
        });

        if unit.lessons.iter().any(|l| l.title == selection.lesson()) {
            return Err(CatalogError::DuplicateKey {
                level: SelectionLevel::Lesson,
                key: selection.lesson().to_string(),
            });
        }
        unit.lessons.push(Lesson {
            title: selection.lesson().to_string(),
            questions,
        });
        Ok(())
    }

    fn normalize(&mut self) -> Result<(), CatalogError> {
        check_keys(SelectionLevel::Subject, self.subjects.iter().map(|s| s.key.as_str()))?;
        for subject in &mut self.subjects {
            if subject.label.is_empty() {
                subject.label = capitalize(&subject.key);
            }
            check_keys(
                SelectionLevel::Semester,
                subject.semesters.iter().map(|s| s.key.as_str()),
            )?;
            for semester in &mut subject.semesters {
                if semester.label.is_empty() {
                    semester.label.clone_from(&semester.key);
                }
                check_keys(SelectionLevel::Unit, semester.units.iter().map(|u| u.key.as_str()))?;
                for unit in &mut semester.units {
                    if unit.label.is_empty() {
                        unit.label.clone_from(&unit.key);
                    }
                    check_keys(
                        SelectionLevel::Lesson,
                        unit.lessons.iter().map(|l| l.title.as_str()),
                    )?;
                    if let Some(empty) = unit.lessons.iter().find(|l| l.questions.is_empty()) {
                        return Err(CatalogError::EmptyLesson {
                            selection: Selection::new(
                                &subject.key,
                                &semester.key,
                                &unit.key,
                                &empty.title,
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn subject(&self, key: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.key == key)
    }

    fn semester(&self, subject: &str, semester: &str) -> Option<&Semester> {
        self.subject(subject)?
            .semesters
            .iter()
            .find(|s| s.key == semester)
    }

    fn unit(&self, subject: &str, semester: &str, unit: &str) -> Option<&Unit> {
        self.semester(subject, semester)?
            .units
            .iter()
            .find(|u| u.key == unit)
    }

    /// Resolve a selection to its lesson.
    #[must_use]
    pub fn lesson(&self, selection: &Selection) -> Option<&Lesson> {
        if !selection.is_complete() {
            return None;
        }
        self.unit(selection.subject(), selection.semester(), selection.unit())?
            .lessons
            .iter()
            .find(|l| l.title == selection.lesson())
    }

    /// True if the selection names an existing lesson.
    #[must_use]
    pub fn resolves(&self, selection: &Selection) -> bool {
        self.lesson(selection).is_some()
    }

    /// Options for `level`, given the levels above it in `selection`.
    ///
    /// Returns an empty list when a parent level is unset or unknown.
    #[must_use]
    pub fn choices(&self, selection: &Selection, level: SelectionLevel) -> Vec<Choice> {
        match level {
            SelectionLevel::Subject => self
                .subjects
                .iter()
                .map(|s| choice(&s.key, &s.label))
                .collect(),
            SelectionLevel::Semester => self
                .subject(selection.subject())
                .map(|s| s.semesters.iter().map(|s| choice(&s.key, &s.label)).collect())
                .unwrap_or_default(),
            SelectionLevel::Unit => self
                .semester(selection.subject(), selection.semester())
                .map(|s| s.units.iter().map(|u| choice(&u.key, &u.label)).collect())
                .unwrap_or_default(),
            SelectionLevel::Lesson => self
                .unit(selection.subject(), selection.semester(), selection.unit())
                .map(|u| u.lessons.iter().map(|l| choice(&l.title, &l.title)).collect())
                .unwrap_or_default(),
        }
    }
}

fn choice(key: &str, label: &str) -> Choice {
    Choice {
        key: key.to_string(),
        label: label.to_string(),
    }
}

fn entry<'a, T>(
    items: &'a mut Vec<T>,
    key: &str,
    key_of: impl Fn(&T) -> &String,
    create: impl FnOnce(&str) -> T,
) -> &'a mut T {
    let index = match items.iter().position(|item| key_of(item) == key) {
        Some(index) => index,
        None => {
            items.push(create(key));
            items.len() - 1
        }
    };
    &mut items[index]
}

fn check_keys<'a>(
    level: SelectionLevel,
    keys: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for key in keys {
        if key.is_empty() {
            return Err(CatalogError::EmptyKey { level });
        }
        if !seen.insert(key) {
            return Err(CatalogError::DuplicateKey {
                level,
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuestionId;

    const BANK: &str = r#"{
        "subjects": [{
            "key": "english",
            "semesters": [{
                "key": "first",
                "name": "First Semester",
                "units": [{
                    "key": "unit1",
                    "name": "Unit 1",
                    "lessons": [
                        {"title": "Reading and Vocabulary", "questions": [
                            {"id": 2, "type": "true-false", "question": "Homophones?",
                             "correctAnswer": true, "explanation": "They sound alike."}
                        ]},
                        {"title": "Grammar", "questions": [
                            {"id": 3, "type": "short", "question": "its vs it's",
                             "sampleAnswer": "possessive vs contraction"}
                        ]}
                    ]
                }]
            }]
        }]
    }"#;

    fn tf(id: u64) -> Question {
        Question::true_false(QuestionId::new(id), "Q", true, "e").unwrap()
    }

    #[test]
    fn parses_and_resolves_lessons() {
        let catalog = Catalog::from_json(BANK).unwrap();
        let selection = Selection::new("english", "first", "unit1", "Grammar");

        let lesson = catalog.lesson(&selection).unwrap();
        assert_eq!(lesson.title(), "Grammar");
        assert_eq!(lesson.questions().len(), 1);
        assert!(!catalog.resolves(&Selection::new("english", "first", "unit1", "Nope")));
        assert!(!catalog.resolves(&Selection::new("english", "first", "unit1", "")));
    }

    #[test]
    fn labels_default_from_keys() {
        let catalog = Catalog::from_json(BANK).unwrap();
        let subjects = catalog.choices(&Selection::default(), SelectionLevel::Subject);
        assert_eq!(
            subjects,
            vec![Choice {
                key: "english".into(),
                label: "English".into()
            }]
        );

        let partial = Selection::new("english", "first", "", "");
        let units = catalog.choices(&partial, SelectionLevel::Unit);
        assert_eq!(units[0].label, "Unit 1");
        let lessons = catalog.choices(
            &Selection::new("english", "first", "unit1", ""),
            SelectionLevel::Lesson,
        );
        let titles: Vec<_> = lessons.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(titles, ["Reading and Vocabulary", "Grammar"]);
    }

    #[test]
    fn choices_below_an_unknown_parent_are_empty() {
        let catalog = Catalog::from_json(BANK).unwrap();
        let selection = Selection::new("history", "", "", "");
        assert!(catalog.choices(&selection, SelectionLevel::Semester).is_empty());
    }

    #[test]
    fn rejects_empty_lessons() {
        let json = r#"{"subjects": [{"key": "s", "semesters": [{"key": "a", "units": [
            {"key": "u", "lessons": [{"title": "L", "questions": []}]}]}]}]}"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyLesson { .. }));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let json = r#"{"subjects": [{"key": "s"}, {"key": "s"}]}"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::DuplicateKey {
                level: SelectionLevel::Subject,
                ..
            }
        ));
    }

    #[test]
    fn plain_deserialize_is_validated_too() {
        let json = r#"{"subjects": [{"key": "s"}, {"key": "s"}]}"#;
        let err = serde_json::from_str::<Catalog>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate subject key"));

        let catalog: Catalog = serde_json::from_str(BANK).unwrap();
        assert_eq!(catalog, Catalog::from_json(BANK).unwrap());
        let subjects = catalog.choices(&Selection::default(), SelectionLevel::Subject);
        assert_eq!(subjects[0].label, "English");
    }

    #[test]
    fn rejects_invalid_question_records() {
        let json = r#"{"subjects": [{"key": "s", "semesters": [{"key": "a", "units": [
            {"key": "u", "lessons": [{"title": "L", "questions": [
                {"id": 1, "type": "multiple", "question": "Q", "options": ["x"],
                 "correctAnswer": 4, "explanation": "e"}
            ]}]}]}]}]}"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn insert_lesson_builds_the_tree() {
        let mut catalog = Catalog::new();
        let selection = Selection::new("history", "first", "unit2", "Empires");
        catalog.insert_lesson(&selection, vec![tf(1), tf(2)]).unwrap();

        assert_eq!(catalog.lesson(&selection).unwrap().questions().len(), 2);
        let err = catalog.insert_lesson(&selection, vec![tf(3)]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey { .. }));

        let incomplete = Selection::new("history", "first", "", "x");
        let err = catalog.insert_lesson(&incomplete, vec![tf(4)]).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::EmptyKey {
                level: SelectionLevel::Unit
            }
        ));
    }
}
