use serde::{Deserialize, Serialize};

use super::frame::{FrameParams, PixelBuffer};
use super::ids::{SequenceIndex, WorkerId};

/// One frame's worth of encoding work.
///
/// Owns its buffers: after dispatch only the assigned worker touches them.
#[derive(Debug)]
pub struct EncodeTask {
    pub index: SequenceIndex,
    pub params: FrameParams,
    pub pixels: PixelBuffer,
    /// Pixels of the frame submitted right before this one (inter-frame opt-in).
    pub previous: Option<PixelBuffer>,
}

impl EncodeTask {
    pub fn new(index: SequenceIndex, params: FrameParams, pixels: PixelBuffer) -> Self {
        Self {
            index,
            params,
            pixels,
            previous: None,
        }
    }

    pub fn with_previous(mut self, previous: PixelBuffer) -> Self {
        self.previous = Some(previous);
        self
    }
}

/// Whether the encoder produced a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum EncodeStatus {
    Ok,
    Failed(String),
}

/// What a worker sends back for a task, exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeResult {
    pub index: SequenceIndex,
    pub payload: Vec<u8>,
    pub status: EncodeStatus,
}

impl EncodeResult {
    pub fn ok(index: SequenceIndex, payload: Vec<u8>) -> Self {
        Self {
            index,
            payload,
            status: EncodeStatus::Ok,
        }
    }

    pub fn failed(index: SequenceIndex, reason: impl Into<String>) -> Self {
        Self {
            index,
            payload: Vec::new(),
            status: EncodeStatus::Failed(reason.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == EncodeStatus::Ok
    }
}

/// Item on the completion channel shared by all workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerMessage {
    pub worker: WorkerId,
    pub result: EncodeResult,
}

/// A successfully encoded frame in final order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedFrame {
    pub index: SequenceIndex,
    pub payload: Vec<u8>,
}
