//! Saved quiz progress.
//!
//! A single JSON blob under one key holds the live session: the selection,
//! counters, start time and the full shuffled question list, so a reload comes
//! back to the same order. Failures here never reach callers; they are logged
//! and treated as "no saved progress".

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiz_core::model::{Catalog, Question, Selection, Session, SessionError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::repository::{KeyValueStore, StorageError};

/// Storage key used when none is configured.
pub const DEFAULT_PROGRESS_KEY: &str = "questionBankProgress";

/// Why saved progress could not be used.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    #[error("corrupt progress snapshot: {0}")]
    CorruptSnapshot(#[from] serde_json::Error),

    #[error("snapshot does not describe a valid session: {0}")]
    InvalidSession(#[from] SessionError),
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Durable form of a [`Session`].
///
/// Field names follow the saved-progress blob of the web quiz, so existing
/// saves keep loading. `answered` and `finishTime` are newer and optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub subject: String,
    pub semester: String,
    pub unit: String,
    pub lesson: String,
    pub question_index: usize,
    pub score: usize,
    /// ISO-8601 on the wire.
    pub start_time: DateTime<Utc>,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        let selection = session.selection();
        Self {
            subject: selection.subject().to_string(),
            semester: selection.semester().to_string(),
            unit: selection.unit().to_string(),
            lesson: selection.lesson().to_string(),
            question_index: session.position(),
            score: session.score(),
            start_time: session.started_at(),
            questions: session.questions().to_vec(),
            answered: session.is_answered(),
            finish_time: session.finished_at(),
        }
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        Selection::new(&self.subject, &self.semester, &self.unit, &self.lesson)
    }

    /// Rebuild the session this snapshot was taken from.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the stored counters are inconsistent with the
    /// stored questions.
    pub fn into_session(self) -> Result<Session, SessionError> {
        let selection = self.selection();
        let session = Session::from_persisted(
            selection,
            self.questions,
            self.question_index,
            self.score,
            self.answered,
            self.start_time,
        )?;
        match self.finish_time {
            Some(at) => session.with_finished_at(at),
            None => Ok(session),
        }
    }
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// Reads and writes the progress blob. The only component that touches it.
#[derive(Clone)]
pub struct ProgressStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl ProgressStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: DEFAULT_PROGRESS_KEY.to_string(),
        }
    }

    /// Use a different storage key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Snapshot `session` and write it.
    ///
    /// Always returns the snapshot; a failed write is logged and the in-memory
    /// session stays authoritative.
    pub async fn save(&self, session: &Session) -> ProgressSnapshot {
        let snapshot = ProgressSnapshot::from_session(session);
        match self.write(&snapshot).await {
            Ok(()) => debug!(
                key = %self.key,
                selection = %session.selection(),
                position = snapshot.question_index,
                score = snapshot.score,
                "progress saved"
            ),
            Err(err) => warn!(key = %self.key, error = %err, "failed to save progress"),
        }
        snapshot
    }

    async fn write(&self, snapshot: &ProgressSnapshot) -> Result<(), ProgressError> {
        let json = serde_json::to_string(snapshot)?;
        self.store.set(&self.key, &json).await?;
        Ok(())
    }

    /// Read the saved snapshot, if there is a usable one.
    ///
    /// Returns `None` when nothing is stored, the blob cannot be read or
    /// parsed, or its selection no longer names a lesson in `catalog`.
    pub async fn load(&self, catalog: &Catalog) -> Option<ProgressSnapshot> {
        let snapshot = match self.read().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %self.key, error = %err, "ignoring unreadable progress");
                return None;
            }
        };
        let selection = snapshot.selection();
        if !catalog.resolves(&selection) {
            debug!(%selection, "saved progress points at a lesson that no longer exists");
            return None;
        }
        Some(snapshot)
    }

    async fn read(&self) -> Result<Option<ProgressSnapshot>, ProgressError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Turn a snapshot back into a session for `current`.
    ///
    /// Saved progress is lesson-scoped: any difference in subject, semester,
    /// unit or lesson discards it, and so does an inconsistent snapshot. The
    /// caller starts a fresh session on `None`.
    #[must_use]
    pub fn reconcile(snapshot: ProgressSnapshot, current: &Selection) -> Option<Session> {
        let saved = snapshot.selection();
        if saved != *current {
            debug!(%saved, %current, "saved progress belongs to another lesson");
            return None;
        }
        match snapshot.into_session() {
            Ok(session) => Some(session),
            Err(err) => {
                warn!(error = %ProgressError::from(err), "discarding saved progress");
                None
            }
        }
    }

    /// Delete the saved snapshot. Failures are logged.
    pub async fn clear(&self) {
        if let Err(err) = self.store.remove(&self.key).await {
            warn!(key = %self.key, error = %err, "failed to clear progress");
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
