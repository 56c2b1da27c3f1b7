use chrono::Duration;
use serde::Serialize;

/// End-of-lesson results, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreSummary {
    pub total: usize,
    pub correct: usize,
    /// Everything not marked correct, short answers included.
    pub incorrect: usize,
    /// Share of correct answers, rounded half-up to a whole percent.
    pub percentage: u32,
    pub elapsed_secs: i64,
}

impl ScoreSummary {
    #[must_use]
    pub fn new(total: usize, correct: usize, elapsed: Duration) -> Self {
        let correct = correct.min(total);
        let percentage = if total == 0 {
            0
        } else {
            // floor(100 * correct / total + 0.5) without floats.
            let scaled = (200 * correct + total) / (2 * total);
            u32::try_from(scaled).unwrap_or(100)
        };
        Self {
            total,
            correct,
            incorrect: total - correct,
            percentage,
            elapsed_secs: elapsed.num_seconds().max(0),
        }
    }

    /// Elapsed time as `m:ss`.
    #[must_use]
    pub fn elapsed_display(&self) -> String {
        format!("{}:{:02}", self.elapsed_secs / 60, self.elapsed_secs % 60)
    }
}
