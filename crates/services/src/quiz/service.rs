use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use quiz_core::model::{
    Catalog, Choice, QuestionType, Selection, SelectionLevel, Session, SessionError,
};
use quiz_core::{grade, sequencer};
use storage::progress::{ProgressSnapshot, ProgressStore};
use storage::repository::{KeyValueStore, Storage};

use super::view::{AnswerFeedback, QuestionView, QuizState};
use crate::Clock;
use crate::config::QuizConfig;
use crate::error::{QuizError, QuizSetupError};

/// The one controller the presentation layer talks to.
///
/// Owns the selection and the single live [`Session`]; the catalog and the
/// progress store are injected. Every method runs to completion before the
/// next one can be called, and a failed call leaves the state as it was.
pub struct QuizService {
    clock: Clock,
    catalog: Arc<Catalog>,
    progress: ProgressStore,
    autosave: bool,
    rng: StdRng,
    selection: Selection,
    session: Option<Session>,
    // Full session kept aside while a type filter is active.
    unfiltered: Option<Session>,
    filter: Option<QuestionType>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<Catalog>,
        store: Arc<dyn KeyValueStore>,
        config: &QuizConfig,
    ) -> Self {
        Self {
            clock,
            catalog,
            progress: ProgressStore::new(store).with_key(config.storage_key.clone()),
            autosave: config.autosave,
            rng: StdRng::from_os_rng(),
            selection: Selection::default(),
            session: None,
            unfiltered: None,
            filter: None,
        }
    }

    /// Build a service backed by the `SQLite` database in `config`.
    ///
    /// # Errors
    ///
    /// Returns `QuizSetupError` if the database cannot be opened or migrated.
    pub async fn open(
        clock: Clock,
        catalog: Arc<Catalog>,
        config: &QuizConfig,
    ) -> Result<Self, QuizSetupError> {
        let storage = Storage::sqlite(&config.database_url).await?;
        Ok(Self::new(clock, catalog, storage.progress, config))
    }

    /// Use a seeded shuffle, for reproducible question order.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn active_filter(&self) -> Option<QuestionType> {
        self.filter
    }

    /// Options for one selector, given what is chosen above it.
    #[must_use]
    pub fn choices(&self, level: SelectionLevel) -> Vec<Choice> {
        self.catalog.choices(&self.selection, level)
    }

    #[must_use]
    pub fn subjects(&self) -> Vec<Choice> {
        self.choices(SelectionLevel::Subject)
    }

    #[must_use]
    pub fn semesters(&self) -> Vec<Choice> {
        self.choices(SelectionLevel::Semester)
    }

    #[must_use]
    pub fn units(&self) -> Vec<Choice> {
        self.choices(SelectionLevel::Unit)
    }

    #[must_use]
    pub fn lessons(&self) -> Vec<Choice> {
        self.choices(SelectionLevel::Lesson)
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        match &self.session {
            Some(session) => match QuestionView::from_session(session) {
                Some(view) => QuizState::InProgress(view),
                None => QuizState::Complete(session.summary(&self.clock)),
            },
            None if self.selection.is_empty() => QuizState::NoSelection,
            None => QuizState::SelectionIncomplete,
        }
    }

    /// Restore the last saved selection and session, if the lesson still exists.
    pub async fn resume(&mut self) -> Option<QuizState> {
        let snapshot = self.progress.load(&self.catalog).await?;
        let selection = snapshot.selection();
        let session = ProgressStore::reconcile(snapshot, &selection)?;
        info!(%selection, position = session.position(), "resumed saved progress");
        self.install(selection, session);
        Some(self.state())
    }

    /// Change one selector.
    ///
    /// Levels below `level` are cleared and the current session is dropped
    /// without saving. Once all four levels are set the lesson is loaded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SelectionNotFound` if the completed selection
    /// names no lesson.
    pub async fn select(
        &mut self,
        level: SelectionLevel,
        value: impl Into<String>,
    ) -> Result<QuizState, QuizError> {
        self.selection.set(level, value);
        self.discard_session();
        if self.selection.is_complete() {
            let selection = self.selection.clone();
            return self.load_selection(selection).await;
        }
        Ok(self.state())
    }

    /// Load a lesson, resuming saved progress for exactly this lesson if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SelectionNotFound` if `selection` is incomplete or
    /// names no lesson; the current session is kept in that case.
    pub async fn load_selection(&mut self, selection: Selection) -> Result<QuizState, QuizError> {
        if !self.catalog.resolves(&selection) {
            return Err(SessionError::SelectionNotFound { selection }.into());
        }

        let saved = self.progress.load(&self.catalog).await;
        let session = match saved.and_then(|s| ProgressStore::reconcile(s, &selection)) {
            Some(session) => {
                info!(%selection, position = session.position(), "resumed saved progress");
                session
            }
            None => {
                let session = sequencer::start_session(
                    &self.catalog,
                    &selection,
                    self.clock.now(),
                    &mut self.rng,
                )?;
                info!(%selection, questions = session.len(), "started new session");
                session
            }
        };

        self.install(selection, session);
        Ok(self.state())
    }

    /// Grade an answer to the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoActiveSession` without a loaded lesson,
    /// `SessionError::AlreadyComplete`/`AlreadyAnswered` when there is nothing
    /// to answer, and `GradeError` for a blank or malformed answer. Nothing
    /// changes on error.
    pub async fn submit_answer(&mut self, raw: &str) -> Result<AnswerFeedback, QuizError> {
        let session = self.session.as_mut().ok_or(QuizError::NoActiveSession)?;
        if session.is_answered() {
            return Err(SessionError::AlreadyAnswered.into());
        }
        let question = session
            .current_question()
            .ok_or(SessionError::AlreadyComplete)?;
        let question_id = question.id();
        let verdict = grade(question, raw)?;
        session.apply_verdict(&verdict)?;
        debug!(
            question = %question_id,
            correct = verdict.is_correct(),
            score = session.score(),
            "answer graded"
        );

        let feedback = AnswerFeedback {
            verdict,
            score: session.score(),
            is_last: session.remaining() == 1,
        };
        self.autosave().await;
        Ok(feedback)
    }

    /// Move to the next question, or to the results after the last one.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoActiveSession` without a loaded lesson,
    /// `SessionError::NotAnswered` before the current question is submitted and
    /// `SessionError::AlreadyComplete` once the results are showing.
    pub async fn next_question(&mut self) -> Result<QuizState, QuizError> {
        let session = self.session.as_mut().ok_or(QuizError::NoActiveSession)?;
        sequencer::advance(session, self.clock.now())?;
        self.autosave().await;
        Ok(self.state())
    }

    /// Drop saved progress and start the lesson over in a new order.
    ///
    /// The full lesson is reshuffled; an active filter is applied again to
    /// the new order.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoActiveSession` without a loaded lesson.
    pub async fn restart(&mut self) -> Result<QuizState, QuizError> {
        let now = self.clock.now();
        let base = match self.unfiltered.as_mut() {
            Some(base) => base,
            None => self.session.as_mut().ok_or(QuizError::NoActiveSession)?,
        };
        sequencer::restart(base, now, &mut self.rng);
        info!(selection = %base.selection(), filter = ?self.filter, "restarted session");

        let refiltered = match (self.unfiltered.as_ref(), self.filter) {
            (Some(base), Some(kind)) => Some(sequencer::filter_by_type(base, kind)),
            _ => None,
        };
        match refiltered {
            Some(Ok(filtered)) => self.session = Some(filtered),
            Some(Err(_)) => self.clear_filter(),
            None => {}
        }
        self.progress.clear().await;
        Ok(self.state())
    }

    /// Save progress now. Storage failures are logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoActiveSession` without a loaded lesson.
    pub async fn save(&mut self) -> Result<ProgressSnapshot, QuizError> {
        let session = self.session.as_ref().ok_or(QuizError::NoActiveSession)?;
        Ok(self.progress.save(session).await)
    }

    /// Show only questions of one type, or everything again with `None`.
    ///
    /// Filtering always starts from the full session and restarts the
    /// filtered view at its first question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoActiveSession` without a loaded lesson and
    /// `SessionError::NoQuestionsOfType` when nothing matches, after switching
    /// back to the unfiltered view.
    pub fn apply_filter(&mut self, kind: Option<QuestionType>) -> Result<QuizState, QuizError> {
        if self.session.is_none() {
            return Err(QuizError::NoActiveSession);
        }
        let Some(kind) = kind else {
            self.clear_filter();
            return Ok(self.state());
        };

        let base = self
            .unfiltered
            .as_ref()
            .or(self.session.as_ref())
            .ok_or(QuizError::NoActiveSession)?;
        match sequencer::filter_by_type(base, kind) {
            Ok(filtered) => {
                if self.unfiltered.is_none() {
                    self.unfiltered = self.session.take();
                }
                self.session = Some(filtered);
                self.filter = Some(kind);
                Ok(self.state())
            }
            Err(err) => {
                self.clear_filter();
                Err(err.into())
            }
        }
    }

    fn clear_filter(&mut self) {
        if let Some(base) = self.unfiltered.take() {
            self.session = Some(base);
        }
        self.filter = None;
    }

    fn install(&mut self, selection: Selection, session: Session) {
        self.selection = selection;
        self.session = Some(session);
        self.unfiltered = None;
        self.filter = None;
    }

    fn discard_session(&mut self) {
        self.session = None;
        self.unfiltered = None;
        self.filter = None;
    }

    async fn autosave(&self) {
        if !self.autosave {
            return;
        }
        if let Some(session) = &self.session {
            self.progress.save(session).await;
        }
    }
}

impl fmt::Debug for QuizService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizService")
            .field("selection", &self.selection)
            .field("position", &self.session.as_ref().map(Session::position))
            .field("filter", &self.filter)
            .field("autosave", &self.autosave)
            .field("progress_key", &self.progress.key())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::GradeError;
    use quiz_core::model::{Question, QuestionId};
    use quiz_core::time::fixed_clock;
    use storage::repository::{InMemoryStore, StorageError};

    fn lesson() -> Selection {
        Selection::new("english", "first", "unit1", "Reading and Vocabulary")
    }

    fn catalog() -> Arc<Catalog> {
        let questions = vec![
            Question::multiple_choice(
                QuestionId::new(1),
                "affect vs effect",
                vec!["verb/noun".into(), "same".into()],
                0,
                "'Affect' is usually a verb.",
            )
            .unwrap(),
            Question::true_false(QuestionId::new(2), "Homophones?", true, "Same sound.").unwrap(),
            Question::short_answer(QuestionId::new(3), "its vs it's", "possessive", None).unwrap(),
        ];
        let mut catalog = Catalog::new();
        catalog.insert_lesson(&lesson(), questions).unwrap();
        Arc::new(catalog)
    }

    fn service_with(store: Arc<dyn KeyValueStore>) -> QuizService {
        QuizService::new(fixed_clock(), catalog(), store, &QuizConfig::default()).with_seed(17)
    }

    fn service() -> (InMemoryStore, QuizService) {
        let kv = InMemoryStore::new();
        let svc = service_with(Arc::new(kv.clone()));
        (kv, svc)
    }

    fn right_answer(svc: &QuizService) -> &'static str {
        match svc.state().question().unwrap().question_type {
            QuestionType::MultipleChoice => "0",
            QuestionType::TrueFalse => "true",
            QuestionType::ShortAnswer => "my own words",
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Connection("quota exceeded".into()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("quota exceeded".into()))
        }

        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("quota exceeded".into()))
        }
    }

    #[tokio::test]
    async fn states_follow_the_selection() {
        let (_, mut svc) = service();
        assert_eq!(svc.state(), QuizState::NoSelection);

        let state = svc.select(SelectionLevel::Subject, "english").await.unwrap();
        assert_eq!(state, QuizState::SelectionIncomplete);
        assert_eq!(svc.choices(SelectionLevel::Semester)[0].key, "first");

        svc.select(SelectionLevel::Semester, "first").await.unwrap();
        svc.select(SelectionLevel::Unit, "unit1").await.unwrap();
        let state = svc
            .select(SelectionLevel::Lesson, "Reading and Vocabulary")
            .await
            .unwrap();
        let view = state.question().unwrap();
        assert_eq!(view.number, 1);
        assert_eq!(view.total, 3);
        assert_eq!(view.counter_label(), "Question 1 of 3");
    }

    #[tokio::test]
    async fn unknown_lesson_keeps_current_session() {
        let (_, mut svc) = service();
        svc.load_selection(lesson()).await.unwrap();
        let before = svc.session().cloned();

        let err = svc
            .load_selection(Selection::new("english", "first", "unit1", "Missing"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuizError::Session(SessionError::SelectionNotFound { .. })
        ));
        assert_eq!(svc.session().cloned(), before);
        assert_eq!(svc.selection(), &lesson());
    }

    #[tokio::test]
    async fn double_submit_is_rejected() {
        let (_, mut svc) = service();
        svc.load_selection(lesson()).await.unwrap();
        let answer = right_answer(&svc);
        svc.submit_answer(answer).await.unwrap();
        let score = svc.session().unwrap().score();

        let err = svc.submit_answer(answer).await.unwrap_err();
        assert!(matches!(err, QuizError::Session(SessionError::AlreadyAnswered)));
        assert_eq!(svc.session().unwrap().score(), score);
    }

    #[tokio::test]
    async fn full_run_scores_only_correct_answers() {
        let (_, mut svc) = service();
        svc.load_selection(lesson()).await.unwrap();

        let mut last = QuizState::NoSelection;
        for _ in 0..3 {
            let answer = right_answer(&svc);
            svc.submit_answer(answer).await.unwrap();
            last = svc.next_question().await.unwrap();
        }

        let QuizState::Complete(summary) = last else {
            panic!("expected results, got {last:?}");
        };
        // The short answer is never counted.
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.percentage, 67);
        assert_eq!(summary.elapsed_display(), "0:00");

        let err = svc.next_question().await.unwrap_err();
        assert!(matches!(err, QuizError::Session(SessionError::AlreadyComplete)));
        let err = svc.submit_answer("0").await.unwrap_err();
        assert!(matches!(err, QuizError::Session(SessionError::AlreadyComplete)));
    }

    #[tokio::test]
    async fn restart_clears_saved_progress() {
        let (kv, mut svc) = service();
        svc.load_selection(lesson()).await.unwrap();
        let answer = right_answer(&svc);
        svc.submit_answer(answer).await.unwrap();
        svc.next_question().await.unwrap();
        assert!(kv.get("questionBankProgress").await.unwrap().is_some());

        let state = svc.restart().await.unwrap();
        assert_eq!(state.question().unwrap().number, 1);
        assert_eq!(svc.session().unwrap().score(), 0);
        assert!(kv.get("questionBankProgress").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn filter_and_unfilter() {
        let (_, mut svc) = service();
        svc.load_selection(lesson()).await.unwrap();
        let full = svc.session().cloned().unwrap();

        let state = svc.apply_filter(Some(QuestionType::TrueFalse)).unwrap();
        let view = state.question().unwrap();
        assert_eq!(view.total, 1);
        assert_eq!(view.question_type, QuestionType::TrueFalse);
        assert_eq!(svc.active_filter(), Some(QuestionType::TrueFalse));

        // Switching filters works from the full list, not the filtered one.
        let state = svc.apply_filter(Some(QuestionType::ShortAnswer)).unwrap();
        assert_eq!(state.question().unwrap().question_type, QuestionType::ShortAnswer);

        svc.apply_filter(None).unwrap();
        assert_eq!(svc.session().unwrap(), &full);
        assert_eq!(svc.active_filter(), None);
    }

    #[tokio::test]
    async fn empty_filter_reverts_to_full_view() {
        let mut catalog = Catalog::new();
        let only_tf = vec![Question::true_false(QuestionId::new(9), "Q", true, "e").unwrap()];
        catalog.insert_lesson(&lesson(), only_tf).unwrap();
        let mut svc = QuizService::new(
            fixed_clock(),
            Arc::new(catalog),
            Arc::new(InMemoryStore::new()),
            &QuizConfig::default(),
        );
        svc.load_selection(lesson()).await.unwrap();
        let before = svc.session().cloned();

        let err = svc.apply_filter(Some(QuestionType::MultipleChoice)).unwrap_err();
        assert_eq!(err.user_message(), "No multiple-choice questions available");
        assert_eq!(svc.session().cloned(), before);
        assert_eq!(svc.active_filter(), None);
    }

    #[tokio::test]
    async fn storage_failure_does_not_disturb_the_session() {
        let mut svc = service_with(Arc::new(BrokenStore));
        svc.load_selection(lesson()).await.unwrap();
        let answer = right_answer(&svc);

        let feedback = svc.submit_answer(answer).await.unwrap();
        assert!(feedback.score <= 1);
        let state = svc.next_question().await.unwrap();
        assert_eq!(state.question().unwrap().number, 2);

        let snapshot = svc.save().await.unwrap();
        assert_eq!(snapshot.question_index, 1);
        svc.restart().await.unwrap();
    }

    #[tokio::test]
    async fn autosave_can_be_turned_off() {
        let kv = InMemoryStore::new();
        let config = QuizConfig {
            autosave: false,
            ..QuizConfig::default()
        };
        let mut svc = QuizService::new(fixed_clock(), catalog(), Arc::new(kv.clone()), &config);
        svc.load_selection(lesson()).await.unwrap();
        let answer = right_answer(&svc);
        svc.submit_answer(answer).await.unwrap();
        svc.next_question().await.unwrap();
        assert!(kv.get("questionBankProgress").await.unwrap().is_none());

        svc.save().await.unwrap();
        assert!(kv.get("questionBankProgress").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn next_waits_for_an_answer() {
        let (kv, mut svc) = service();
        svc.load_selection(lesson()).await.unwrap();

        let err = svc.next_question().await.unwrap_err();
        assert!(matches!(err, QuizError::Session(SessionError::NotAnswered)));
        assert_eq!(err.user_message(), "Submit an answer before moving on.");
        assert_eq!(svc.state().question().unwrap().number, 1);
        assert!(kv.get("questionBankProgress").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restart_while_filtered_resets_the_full_lesson() {
        let (_, mut svc) = service();
        svc.load_selection(lesson()).await.unwrap();
        for _ in 0..2 {
            let answer = right_answer(&svc);
            svc.submit_answer(answer).await.unwrap();
            svc.next_question().await.unwrap();
        }
        svc.apply_filter(Some(QuestionType::TrueFalse)).unwrap();

        let state = svc.restart().await.unwrap();
        assert_eq!(state.question().unwrap().question_type, QuestionType::TrueFalse);
        assert_eq!(svc.active_filter(), Some(QuestionType::TrueFalse));

        let state = svc.apply_filter(None).unwrap();
        let view = state.question().unwrap();
        assert_eq!((view.number, view.total, view.score), (1, 3, 0));
        assert!(!view.answered);
    }

    #[tokio::test]
    async fn operations_need_a_session() {
        let (_, mut svc) = service();
        assert!(matches!(
            svc.submit_answer("0").await,
            Err(QuizError::NoActiveSession)
        ));
        assert!(matches!(svc.next_question().await, Err(QuizError::NoActiveSession)));
        assert!(matches!(svc.restart().await, Err(QuizError::NoActiveSession)));
        assert!(matches!(svc.save().await, Err(QuizError::NoActiveSession)));
        assert!(matches!(svc.apply_filter(None), Err(QuizError::NoActiveSession)));
    }

    #[tokio::test]
    async fn malformed_answer_changes_nothing() {
        let (_, mut svc) = service();
        svc.load_selection(lesson()).await.unwrap();
        let before = svc.session().cloned();

        let question_type = svc.state().question().unwrap().question_type;
        if question_type != QuestionType::ShortAnswer {
            let err = svc.submit_answer("maybe").await.unwrap_err();
            assert!(matches!(err, QuizError::Grade(GradeError::MalformedAnswer { .. })));
        }
        let err = svc.submit_answer("   ").await.unwrap_err();
        assert!(matches!(err, QuizError::Grade(GradeError::NoAnswerProvided)));
        assert_eq!(svc.session().cloned(), before);
    }
}
