mod catalog;
mod ids;
mod question;
mod selection;
mod session;
mod summary;

pub use ids::{ParseIdError, QuestionId};

pub use catalog::{Catalog, CatalogError, Choice, Lesson, Semester, Subject, Unit};
pub use question::{
    CorrectAnswer, ParseQuestionTypeError, Question, QuestionError, QuestionKind, QuestionRecord,
    QuestionType,
};
pub use selection::{Selection, SelectionLevel};
pub use session::{Session, SessionError, SessionState};
pub use summary::ScoreSummary;
