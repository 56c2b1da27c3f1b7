mod service;
mod view;

// Public API of the quiz subsystem.
pub use crate::error::QuizError;
pub use service::QuizService;
pub use view::{AnswerFeedback, QuestionView, QuizState};
