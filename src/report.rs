use std::fmt;

/// Outcome counts of one stage run, returned to the caller for logging.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageReport {
    pub stage: &'static str,
    /// Records the stage looked at.
    pub processed: usize,
    /// Records that produced new rows.
    pub added: usize,
    /// Records passed over on purpose: closed, already known or malformed.
    pub skipped: usize,
    /// Records abandoned after a fetch or extraction error.
    pub failed: usize,
}

impl StageReport {
    /// An empty report for `stage`.
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            ..Default::default()
        }
    }

    /// Renders the counts as one JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "stage": self.stage,
            "processed": self.processed,
            "added": self.added,
            "skipped": self.skipped,
            "failed": self.failed,
        })
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} processed, {} added, {} skipped, {} failed",
            self.stage, self.processed, self.added, self.skipped, self.failed
        )
    }
}
