//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::GradeError;
use quiz_core::model::SessionError;
use storage::sqlite::SqliteInitError;

/// Errors returned to the presentation layer by `QuizService`.
///
/// None of these are fatal; each maps to a message for the learner via
/// [`QuizError::user_message`]. Storage problems never show up here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no quiz session is active")]
    NoActiveSession,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Grade(#[from] GradeError),
}

impl QuizError {
    /// Short message suitable for showing to the learner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            QuizError::NoActiveSession => "Select a lesson to start.".to_string(),
            QuizError::Session(SessionError::SelectionNotFound { .. }) => {
                "Questions not found for this selection. Please try another selection.".to_string()
            }
            QuizError::Session(SessionError::NoQuestionsOfType { kind }) => {
                format!("No {kind} questions available")
            }
            QuizError::Session(SessionError::AlreadyAnswered) => {
                "This question has already been answered.".to_string()
            }
            QuizError::Session(SessionError::NotAnswered) => {
                "Submit an answer before moving on.".to_string()
            }
            QuizError::Session(SessionError::AlreadyComplete) => {
                "This lesson is finished. Restart to try again.".to_string()
            }
            QuizError::Grade(GradeError::NoAnswerProvided) => {
                "Please select or enter an answer.".to_string()
            }
            QuizError::Grade(GradeError::MalformedAnswer { .. }) => {
                "Please choose one of the offered answers.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Errors emitted while bootstrapping the quiz service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizSetupError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
