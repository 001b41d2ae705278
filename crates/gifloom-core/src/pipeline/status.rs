//! PipelineStatus - ある時点のパイプラインの状態
//!
//! コーディネーターがスナップショットとして返す。JSON でそのまま出せる。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Frames that got a sequence index.
    pub submitted: usize,
    /// Frames with a recorded result, failures included.
    pub completed: usize,
    pub failed: usize,
    /// Frames still waiting on a result.
    pub pending: usize,
    /// Tasks posted to a worker and not yet reported back.
    pub in_flight: usize,
    pub free_workers: usize,
    pub busy_workers: usize,
    /// Admission capacity (= pool size at build time).
    pub capacity: usize,
    pub aborted: bool,
    /// Every submitted frame has a result.
    pub complete: bool,
}

impl PipelineStatus {
    /// Short human readable line, e.g. for a progress log.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}/{} frames done, {} in flight",
            self.completed, self.submitted, self.in_flight
        );
        if self.failed > 0 {
            line.push_str(&format!(", {} failed", self.failed));
        }
        if self.aborted {
            line.push_str(" (aborted)");
        }
        line
    }
}
