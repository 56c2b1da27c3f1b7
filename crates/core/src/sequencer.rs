//! Question ordering and session progression.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::model::{Catalog, QuestionType, Selection, Session, SessionError, SessionState};

/// Shuffle in place with an unbiased Fisher-Yates pass.
///
/// Walks from the last index down to 1, swapping each slot with one drawn
/// uniformly from `0..=i`, so every permutation is equally likely.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Start a fresh attempt at the selected lesson with a shuffled copy of its questions.
///
/// # Errors
///
/// Returns `SessionError::SelectionNotFound` if the selection is incomplete or
/// names no lesson in `catalog`.
pub fn start_session<R: Rng + ?Sized>(
    catalog: &Catalog,
    selection: &Selection,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Session, SessionError> {
    let lesson = catalog
        .lesson(selection)
        .ok_or_else(|| SessionError::SelectionNotFound {
            selection: selection.clone(),
        })?;
    let mut questions = lesson.questions().to_vec();
    shuffle(&mut questions, rng);
    Session::new(selection.clone(), questions, now)
}

/// Move past the answered current question.
///
/// Stepping off the last question completes the session and stamps `now` as
/// its finish time.
///
/// # Errors
///
/// Returns `SessionError::AlreadyComplete` if the session already finished and
/// `SessionError::NotAnswered` if the current question has not been graded.
pub fn advance(
    session: &mut Session,
    now: DateTime<Utc>,
) -> Result<SessionState<'_>, SessionError> {
    if session.is_complete() {
        return Err(SessionError::AlreadyComplete);
    }
    if !session.is_answered() {
        return Err(SessionError::NotAnswered);
    }
    session.step(now);
    Ok(session.state())
}

/// Reshuffle the session's questions and start over from the first one.
pub fn restart<R: Rng + ?Sized>(session: &mut Session, now: DateTime<Utc>, rng: &mut R) {
    shuffle(session.questions_mut(), rng);
    session.reset(now);
}

/// Derive a session holding only questions of `kind`, in their current order.
///
/// The derived session starts at its first question with a zero score and keeps
/// the original selection and start time. `session` itself is not modified.
///
/// # Errors
///
/// Returns `SessionError::NoQuestionsOfType` if nothing matches.
pub fn filter_by_type(session: &Session, kind: QuestionType) -> Result<Session, SessionError> {
    let filtered: Vec<_> = session
        .questions()
        .iter()
        .filter(|q| q.question_type() == kind)
        .cloned()
        .collect();
    if filtered.is_empty() {
        return Err(SessionError::NoQuestionsOfType { kind });
    }
    Session::new(session.selection().clone(), filtered, session.started_at())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
