#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod quiz;

pub use quiz_core::Clock;

pub use config::QuizConfig;
pub use error::{QuizError, QuizSetupError};
pub use quiz::{AnswerFeedback, QuestionView, QuizService, QuizState};
