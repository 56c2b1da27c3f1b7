use serde::Serialize;

use quiz_core::Verdict;
use quiz_core::model::{QuestionType, ScoreSummary, Session};

/// What the presentation layer should show right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum QuizState {
    /// Nothing chosen yet.
    NoSelection,
    /// Some levels chosen, or the chosen path names no lesson.
    SelectionIncomplete,
    InProgress(QuestionView),
    Complete(ScoreSummary),
}

impl QuizState {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, QuizState::Complete(_))
    }

    #[must_use]
    pub fn question(&self) -> Option<&QuestionView> {
        match self {
            QuizState::InProgress(view) => Some(view),
            _ => None,
        }
    }
}

/// The current question, stripped of anything that would give the answer away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub lesson: String,
    /// 1-based.
    pub number: usize,
    pub total: usize,
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Vec<String>,
    pub answered: bool,
    pub score: usize,
}

impl QuestionView {
    pub(crate) fn from_session(session: &Session) -> Option<Self> {
        let question = session.current_question()?;
        Some(Self {
            lesson: session.selection().lesson().to_string(),
            number: session.position() + 1,
            total: session.len(),
            question_type: question.question_type(),
            prompt: question.prompt().to_string(),
            options: question.options().to_vec(),
            answered: session.is_answered(),
            score: session.score(),
        })
    }

    /// e.g. `Question 2 of 5`.
    #[must_use]
    pub fn counter_label(&self) -> String {
        format!("Question {} of {}", self.number, self.total)
    }
}

/// Result of submitting an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub verdict: Verdict,
    pub score: usize,
    /// True when the next step finishes the lesson.
    pub is_last: bool,
}

impl AnswerFeedback {
    #[must_use]
    pub fn feedback(&self) -> &str {
        self.verdict.feedback()
    }
}
