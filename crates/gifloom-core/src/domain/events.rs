//! Events - パイプラインのライフサイクルイベント
//!
//! EventSink に渡される。呼び出し側の進捗表示などに使う。

use serde::{Deserialize, Serialize};

use super::ids::SequenceIndex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A frame's result was recorded.
    Progress {
        index: SequenceIndex,
        completed: u64,
        submitted: u64,
        ok: bool,
    },

    /// `abort()` was called. Emitted once.
    Abort,

    /// Every submitted frame was assembled in order.
    Finished { frames: u64 },
}

impl PipelineEvent {
    /// Fraction of submitted frames that have completed, for progress events.
    pub fn progress_ratio(&self) -> Option<f64> {
        match self {
            PipelineEvent::Progress {
                completed,
                submitted,
                ..
            } if *submitted > 0 => Some(*completed as f64 / *submitted as f64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_ratio() {
        let e = PipelineEvent::Progress {
            index: SequenceIndex::new(0),
            completed: 1,
            submitted: 4,
            ok: true,
        };
        assert_eq!(e.progress_ratio(), Some(0.25));
        assert_eq!(PipelineEvent::Abort.progress_ratio(), None);
    }

    #[test]
    fn events_are_tagged() {
        let v = serde_json::to_value(PipelineEvent::Finished { frames: 3 }).unwrap();
        assert_eq!(v["event"], "finished");
        assert_eq!(v["frames"], 3);
    }
}
