//! Answer evaluation.
//!
//! Grading is pure: it never touches the session. Callers apply the resulting
//! [`Verdict`] with [`Session::apply_verdict`](crate::model::Session::apply_verdict).

use serde::Serialize;
use thiserror::Error;

use crate::model::{Question, QuestionKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradeError {
    #[error("no answer provided")]
    NoAnswerProvided,

    #[error("answer {raw:?} is not valid for a {expected} question")]
    MalformedAnswer { raw: String, expected: &'static str },
}

/// Result of grading one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "camelCase")]
pub enum Verdict {
    Correct { explanation: String },
    Incorrect { explanation: String },
    /// Short answers are self-assessed against the sample answer.
    Ungraded {
        #[serde(rename = "sampleAnswer")]
        sample_answer: String,
    },
}

impl Verdict {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct { .. })
    }

    /// Text to show the learner after grading.
    #[must_use]
    pub fn feedback(&self) -> &str {
        match self {
            Verdict::Correct { explanation } | Verdict::Incorrect { explanation } => explanation,
            Verdict::Ungraded { sample_answer } => sample_answer,
        }
    }
}

/// Grade a raw answer as it came from the presentation layer.
///
/// The answer is trimmed first. Multiple-choice answers are option indices
/// (`"0"`, `"1"`, ...); true/false answers are the exact tokens `"true"` or
/// `"false"`. Short answers are never marked; any non-blank text yields
/// [`Verdict::Ungraded`].
///
/// # Errors
///
/// Returns `GradeError::NoAnswerProvided` for a blank answer and
/// `GradeError::MalformedAnswer` if the text cannot be read as an answer of the
/// question's kind.
pub fn grade(question: &Question, raw: &str) -> Result<Verdict, GradeError> {
    let answer = raw.trim();
    if answer.is_empty() {
        return Err(GradeError::NoAnswerProvided);
    }

    match question.kind() {
        QuestionKind::MultipleChoice {
            correct_index,
            explanation,
            ..
        } => {
            let index: usize = answer.parse().map_err(|_| GradeError::MalformedAnswer {
                raw: answer.to_string(),
                expected: "multiple-choice",
            })?;
            Ok(mark(index == *correct_index, explanation))
        }
        QuestionKind::TrueFalse {
            correct,
            explanation,
        } => {
            let given = match answer {
                "true" => true,
                "false" => false,
                _ => {
                    return Err(GradeError::MalformedAnswer {
                        raw: answer.to_string(),
                        expected: "true-false",
                    });
                }
            };
            Ok(mark(given == *correct, explanation))
        }
        QuestionKind::ShortAnswer { sample_answer, .. } => Ok(Verdict::Ungraded {
            sample_answer: sample_answer.clone(),
        }),
    }
}

fn mark(correct: bool, explanation: &str) -> Verdict {
    let explanation = explanation.to_string();
    if correct {
        Verdict::Correct { explanation }
    } else {
        Verdict::Incorrect { explanation }
    }
}
