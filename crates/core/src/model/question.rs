use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id}: prompt cannot be empty")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id}: multiple-choice question needs at least one option")]
    NoOptions { id: QuestionId },

    #[error("question {id}: correct answer {index} is out of range for {len} options")]
    AnswerOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },

    #[error("question {id}: {kind} question is missing `{field}`")]
    MissingField {
        id: QuestionId,
        kind: QuestionType,
        field: &'static str,
    },

    #[error("question {id}: `correctAnswer` must be {expected}")]
    WrongAnswerType {
        id: QuestionId,
        expected: &'static str,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown question type: {0:?}")]
pub struct ParseQuestionTypeError(String);

//
// ─── QUESTION TYPE ─────────────────────────────────────────────────────────────
//

/// The three kinds of question a lesson can contain.
///
/// On the wire the short tags of the question bank are used (`multiple`,
/// `true-false`, `short`); the long forms are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "multiple", alias = "multiple-choice")]
    MultipleChoice,
    #[serde(rename = "true-false")]
    TrueFalse,
    #[serde(rename = "short", alias = "short-answer")]
    ShortAnswer,
}

impl QuestionType {
    pub const ALL: [QuestionType; 3] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
    ];

    /// Tag used by the question bank and the progress blob.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple",
            QuestionType::TrueFalse => "true-false",
            QuestionType::ShortAnswer => "short",
        }
    }

    /// Returns true if answers of this type can be marked right or wrong.
    #[must_use]
    pub fn is_gradable(self) -> bool {
        !matches!(self, QuestionType::ShortAnswer)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::TrueFalse => "true-false",
            QuestionType::ShortAnswer => "short-answer",
        };
        f.write_str(label)
    }
}

impl FromStr for QuestionType {
    type Err = ParseQuestionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "multiple" | "multiple-choice" => Ok(Self::MultipleChoice),
            "true-false" => Ok(Self::TrueFalse),
            "short" | "short-answer" => Ok(Self::ShortAnswer),
            other => Err(ParseQuestionTypeError(other.to_string())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Per-kind payload. Each variant carries only what its kind can use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct_index: usize,
        explanation: String,
    },
    TrueFalse {
        correct: bool,
        explanation: String,
    },
    ShortAnswer {
        sample_answer: String,
        explanation: Option<String>,
    },
}

/// An immutable catalog question.
///
/// Serializes through [`QuestionRecord`] so catalogs and progress blobs keep the
/// flat question-bank shape, while the in-memory form is always validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord", into = "QuestionRecord")]
pub struct Question {
    id: QuestionId,
    prompt: String,
    kind: QuestionKind,
}

impl Question {
    /// Creates a multiple-choice question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, there are no options, or
    /// `correct_index` does not point at one of them.
    pub fn multiple_choice(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        if options.is_empty() {
            return Err(QuestionError::NoOptions { id });
        }
        if correct_index >= options.len() {
            return Err(QuestionError::AnswerOutOfRange {
                id,
                index: correct_index,
                len: options.len(),
            });
        }
        Self::build(
            id,
            prompt.into(),
            QuestionKind::MultipleChoice {
                options,
                correct_index,
                explanation: explanation.into(),
            },
        )
    }

    /// Creates a true/false question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` if the prompt is blank.
    pub fn true_false(
        id: QuestionId,
        prompt: impl Into<String>,
        correct: bool,
        explanation: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        Self::build(
            id,
            prompt.into(),
            QuestionKind::TrueFalse {
                correct,
                explanation: explanation.into(),
            },
        )
    }

    /// Creates a self-assessed short-answer question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` if the prompt is blank.
    pub fn short_answer(
        id: QuestionId,
        prompt: impl Into<String>,
        sample_answer: impl Into<String>,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        Self::build(
            id,
            prompt.into(),
            QuestionKind::ShortAnswer {
                sample_answer: sample_answer.into(),
                explanation,
            },
        )
    }

    fn build(id: QuestionId, prompt: String, kind: QuestionKind) -> Result<Self, QuestionError> {
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }
        Ok(Self { id, prompt, kind })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer,
        }
    }

    /// Answer choices; empty for anything but multiple-choice.
    #[must_use]
    pub fn options(&self) -> &[String] {
        match &self.kind {
            QuestionKind::MultipleChoice { options, .. } => options,
            _ => &[],
        }
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        match &self.kind {
            QuestionKind::MultipleChoice { explanation, .. }
            | QuestionKind::TrueFalse { explanation, .. } => Some(explanation.as_str()),
            QuestionKind::ShortAnswer { explanation, .. } => explanation.as_deref(),
        }
    }
}

//
// ─── WIRE RECORD ───────────────────────────────────────────────────────────────
//

/// `correctAnswer` is an index for multiple-choice and a flag for true/false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Index(usize),
    Flag(bool),
}

/// Flat, loosely-typed question shape used by the question bank JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: QuestionId,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<CorrectAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_answer: Option<String>,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuestionError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let id = record.id;
        let kind = record.kind;
        let missing = |field| QuestionError::MissingField { id, kind, field };

        match kind {
            QuestionType::MultipleChoice => {
                let options = record.options.ok_or_else(|| missing("options"))?;
                let correct_index = match record.correct_answer {
                    Some(CorrectAnswer::Index(index)) => index,
                    Some(CorrectAnswer::Flag(_)) => {
                        return Err(QuestionError::WrongAnswerType {
                            id,
                            expected: "an option index",
                        });
                    }
                    None => return Err(missing("correctAnswer")),
                };
                let explanation = record.explanation.ok_or_else(|| missing("explanation"))?;
                Question::multiple_choice(id, record.prompt, options, correct_index, explanation)
            }
            QuestionType::TrueFalse => {
                let correct = match record.correct_answer {
                    Some(CorrectAnswer::Flag(flag)) => flag,
                    Some(CorrectAnswer::Index(_)) => {
                        return Err(QuestionError::WrongAnswerType {
                            id,
                            expected: "a boolean",
                        });
                    }
                    None => return Err(missing("correctAnswer")),
                };
                let explanation = record.explanation.ok_or_else(|| missing("explanation"))?;
                Question::true_false(id, record.prompt, correct, explanation)
            }
            QuestionType::ShortAnswer => {
                let sample = record.sample_answer.ok_or_else(|| missing("sampleAnswer"))?;
                Question::short_answer(id, record.prompt, sample, record.explanation)
            }
        }
    }
}

impl From<Question> for QuestionRecord {
    fn from(question: Question) -> Self {
        let kind = question.question_type();
        let mut record = QuestionRecord {
            id: question.id,
            kind,
            prompt: question.prompt,
            options: None,
            correct_answer: None,
            explanation: None,
            sample_answer: None,
        };
        match question.kind {
            QuestionKind::MultipleChoice {
                options,
                correct_index,
                explanation,
            } => {
                record.options = Some(options);
                record.correct_answer = Some(CorrectAnswer::Index(correct_index));
                record.explanation = Some(explanation);
            }
            QuestionKind::TrueFalse {
                correct,
                explanation,
            } => {
                record.correct_answer = Some(CorrectAnswer::Flag(correct));
                record.explanation = Some(explanation);
            }
            QuestionKind::ShortAnswer {
                sample_answer,
                explanation,
            } => {
                record.sample_answer = Some(sample_answer);
                record.explanation = explanation;
            }
        }
        record
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
