use storage::DEFAULT_PROGRESS_KEY;

/// Runtime settings for the quiz service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    /// Key the progress blob is stored under.
    pub storage_key: String,
    /// Persist after every answer and every step forward.
    pub autosave: bool,
    /// `SQLite` URL used by [`QuizService::open`](crate::QuizService::open).
    pub database_url: String,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_PROGRESS_KEY.to_string(),
            autosave: true,
            database_url: "sqlite::memory:".to_string(),
        }
    }
}

impl QuizConfig {
    /// Read `QUIZ_PROGRESS_KEY`, `QUIZ_AUTOSAVE` and `QUIZ_DB_URL`, falling
    /// back to defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        Self {
            storage_key: lookup("QUIZ_PROGRESS_KEY")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.storage_key),
            autosave: lookup("QUIZ_AUTOSAVE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default.autosave),
            database_url: lookup("QUIZ_DB_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.database_url),
        }
    }
}
