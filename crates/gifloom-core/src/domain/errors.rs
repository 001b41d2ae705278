//! Errors - エラー型と分類
//!
//! 呼び出しごとのエラーはその呼び出し元に同期的に返す。自動リトライはどこにもない。

use thiserror::Error;

use super::ids::{SequenceIndex, WorkerId};

/// ErrorKind は運用上の分類
///
/// - Precondition: 呼び出し前に満たすべき条件が欠けている
/// - Invariant: コーディネーター側のバグ（正しい順序なら到達しない）
/// - Input: 呼び出し側が渡したフレームが不正
/// - Worker: エンコーダーワーカー側の失敗
/// - Cancelled: abort 済み / 停止済み
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Invariant,
    Input,
    Worker,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("no free worker in pool")]
    PoolExhausted,

    #[error("unknown worker {0}")]
    UnknownWorker(WorkerId),

    #[error("worker {0} was not busy")]
    WorkerNotBusy(WorkerId),

    #[error("worker {worker} unavailable: {reason}")]
    WorkerUnavailable { worker: WorkerId, reason: String },

    #[error("invalid frame source: {0}")]
    InvalidSource(String),

    #[error("encoding {index} failed: {reason}")]
    FrameFailed {
        index: SequenceIndex,
        reason: String,
    },

    #[error("{pending} frame(s) still pending")]
    Incomplete { pending: usize },

    #[error("pipeline aborted")]
    Aborted,

    #[error("pipeline coordinator stopped")]
    Closed,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Precondition(_) | PipelineError::Incomplete { .. } => {
                ErrorKind::Precondition
            }
            PipelineError::PoolExhausted
            | PipelineError::UnknownWorker(_)
            | PipelineError::WorkerNotBusy(_) => ErrorKind::Invariant,
            PipelineError::InvalidSource(_) => ErrorKind::Input,
            PipelineError::WorkerUnavailable { .. } | PipelineError::FrameFailed { .. } => {
                ErrorKind::Worker
            }
            PipelineError::Aborted | PipelineError::Closed => ErrorKind::Cancelled,
        }
    }
}
