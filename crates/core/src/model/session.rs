use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::time::Clock;
use crate::grader::Verdict;
use crate::model::{Question, QuestionType, ScoreSummary, Selection};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no lesson found for selection {selection}")]
    SelectionNotFound { selection: Selection },

    #[error("lesson {selection} has no questions")]
    EmptyLesson { selection: Selection },

    #[error("no {kind} questions available")]
    NoQuestionsOfType { kind: QuestionType },

    #[error("session already completed")]
    AlreadyComplete,

    #[error("current question was already answered")]
    AlreadyAnswered,

    #[error("current question has not been answered")]
    NotAnswered,

    #[error("invalid session state: {0}")]
    InvalidState(String),
}

/// Where a session stands after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState<'a> {
    InProgress(&'a Question),
    Complete,
}

/// One quiz attempt over a lesson.
///
/// `questions` is the session's own shuffled copy; the catalog is never
/// mutated. `position == questions.len()` means the attempt is complete.
/// `answered` marks that the current question has been graded, so a correct
/// answer may already be counted in `score` before the session advances.
/// `finished_at` is stamped once, when the last step completes the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    selection: Selection,
    questions: Vec<Question>,
    position: usize,
    score: usize,
    answered: bool,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Start a session at the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyLesson` if `questions` is empty.
    pub fn new(
        selection: Selection,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyLesson { selection });
        }
        Ok(Self {
            selection,
            questions,
            position: 0,
            score: 0,
            answered: false,
            started_at,
            finished_at: None,
        })
    }

    /// Rehydrate a session from persisted progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyLesson` for an empty question list and
    /// `SessionError::InvalidState` if position or score are out of bounds.
    pub fn from_persisted(
        selection: Selection,
        questions: Vec<Question>,
        position: usize,
        score: usize,
        answered: bool,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(selection, questions, started_at)?;
        let len = session.questions.len();
        if position > len {
            return Err(SessionError::InvalidState(format!(
                "position {position} is past the end of {len} questions"
            )));
        }
        if answered && position == len {
            return Err(SessionError::InvalidState(
                "completed session cannot have a pending answer".into(),
            ));
        }
        let answered_count = position + usize::from(answered);
        if score > answered_count {
            return Err(SessionError::InvalidState(format!(
                "score {score} exceeds {answered_count} answered questions"
            )));
        }
        session.position = position;
        session.score = score;
        session.answered = answered;
        Ok(session)
    }

    /// Attach the completion time of a rehydrated session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the session is not complete or
    /// `at` precedes the start time.
    pub fn with_finished_at(mut self, at: DateTime<Utc>) -> Result<Self, SessionError> {
        if !self.is_complete() {
            return Err(SessionError::InvalidState(
                "unfinished session cannot have a finish time".into(),
            ));
        }
        if at < self.started_at {
            return Err(SessionError::InvalidState(format!(
                "finish time {at} precedes start time {}",
                self.started_at
            )));
        }
        self.finished_at = Some(at);
        Ok(self)
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Total number of questions in this attempt.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Sessions always hold at least one question.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.questions.len().saturating_sub(self.position)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.position >= self.questions.len()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.position)
    }

    #[must_use]
    pub fn state(&self) -> SessionState<'_> {
        match self.current_question() {
            Some(question) => SessionState::InProgress(question),
            None => SessionState::Complete,
        }
    }

    /// Record the grading outcome for the current question.
    ///
    /// Only [`Verdict::Correct`] raises the score.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyComplete` past the last question and
    /// `SessionError::AlreadyAnswered` if the current question was graded.
    pub fn apply_verdict(&mut self, verdict: &Verdict) -> Result<(), SessionError> {
        if self.is_complete() {
            return Err(SessionError::AlreadyComplete);
        }
        if self.answered {
            return Err(SessionError::AlreadyAnswered);
        }
        self.answered = true;
        if verdict.is_correct() {
            self.score += 1;
        }
        Ok(())
    }

    /// Results so far.
    ///
    /// A finished attempt is timed up to its finish time; an unfinished one
    /// against `clock`.
    #[must_use]
    pub fn summary(&self, clock: &Clock) -> ScoreSummary {
        let elapsed = match self.finished_at {
            Some(finished_at) => finished_at - self.started_at,
            None => clock.elapsed_since(self.started_at),
        };
        ScoreSummary::new(self.questions.len(), self.score, elapsed)
    }

    pub(crate) fn step(&mut self, now: DateTime<Utc>) {
        self.position += 1;
        self.answered = false;
        if self.is_complete() {
            self.finished_at = Some(now);
        }
    }

    pub(crate) fn questions_mut(&mut self) -> &mut Vec<Question> {
        &mut self.questions
    }

    pub(crate) fn reset(&mut self, started_at: DateTime<Utc>) {
        self.position = 0;
        self.score = 0;
        self.answered = false;
        self.started_at = started_at;
        self.finished_at = None;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;
    use crate::time::{fixed_clock, fixed_now};
    use chrono::Duration;

    fn questions(n: u64) -> Vec<Question> {
        (1..=n)
            .map(|id| {
                Question::true_false(QuestionId::new(id), format!("Q{id}"), true, "e").unwrap()
            })
            .collect()
    }

    fn selection() -> Selection {
        Selection::new("english", "first", "unit1", "Introduction")
    }

    fn correct() -> Verdict {
        Verdict::Correct {
            explanation: "e".into(),
        }
    }

    #[test]
    fn empty_question_list_is_rejected() {
        let err = Session::new(selection(), Vec::new(), fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::EmptyLesson { .. }));
    }

    #[test]
    fn verdict_is_applied_once_per_question() {
        let mut session = Session::new(selection(), questions(2), fixed_now()).unwrap();
        session.apply_verdict(&correct()).unwrap();
        assert_eq!(session.score(), 1);

        let err = session.apply_verdict(&correct()).unwrap_err();
        assert_eq!(err, SessionError::AlreadyAnswered);
        assert_eq!(session.score(), 1);

        session.step(fixed_now());
        assert!(!session.is_answered());
        session
            .apply_verdict(&Verdict::Ungraded {
                sample_answer: "s".into(),
            })
            .unwrap();
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn persisted_bounds_are_checked() {
        let err = Session::from_persisted(selection(), questions(2), 3, 0, false, fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidState(_)));

        let err = Session::from_persisted(selection(), questions(3), 1, 2, false, fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidState(_)));

        let ok = Session::from_persisted(selection(), questions(3), 1, 2, true, fixed_now())
            .unwrap();
        assert_eq!(ok.position(), 1);
        assert_eq!(ok.score(), 2);
        assert!(ok.is_answered());
    }

    #[test]
    fn summary_uses_clock_for_elapsed_time() {
        let mut clock = fixed_clock();
        let session =
            Session::from_persisted(selection(), questions(4), 4, 3, false, fixed_now()).unwrap();
        clock.advance(Duration::seconds(61));

        let summary = session.summary(&clock);
        assert_eq!(summary.percentage, 75);
        assert_eq!(summary.correct, 3);
        assert_eq!(summary.incorrect, 1);
        assert_eq!(summary.elapsed_display(), "1:01");
    }

    #[test]
    fn finished_session_stops_the_clock() {
        let mut clock = fixed_clock();
        let mut session = Session::new(selection(), questions(1), fixed_now()).unwrap();
        session.apply_verdict(&correct()).unwrap();

        clock.advance(Duration::seconds(30));
        session.step(clock.now());
        assert_eq!(session.finished_at(), Some(clock.now()));

        clock.advance(Duration::hours(2));
        assert_eq!(session.summary(&clock).elapsed_display(), "0:30");

        session.reset(clock.now());
        assert_eq!(session.finished_at(), None);
    }

    #[test]
    fn finish_time_needs_a_complete_session() {
        let at = fixed_now() + Duration::seconds(5);
        let err = Session::from_persisted(selection(), questions(2), 1, 1, false, fixed_now())
            .unwrap()
            .with_finished_at(at)
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidState(_)));

        let err = Session::from_persisted(selection(), questions(2), 2, 1, false, fixed_now())
            .unwrap()
            .with_finished_at(fixed_now() - Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidState(_)));

        let done = Session::from_persisted(selection(), questions(2), 2, 1, false, fixed_now())
            .unwrap()
            .with_finished_at(at)
            .unwrap();
        assert_eq!(done.summary(&fixed_clock()).elapsed_display(), "0:05");
    }
}
