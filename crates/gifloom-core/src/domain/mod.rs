//! Domain model (IDs, frames, tasks, results, states, events, errors).

pub mod errors;
pub mod events;
pub mod frame;
pub mod ids;
pub mod state;
pub mod task;

pub use self::errors::{ErrorKind, PipelineError};
pub use self::events::PipelineEvent;
pub use self::frame::{
    BYTES_PER_PIXEL, DEFAULT_DELAY_MS, Dimensions, FrameOptions, FrameParams, PixelBuffer, Rgb,
    TransferMode,
};
pub use self::ids::{SequenceIndex, WorkerId};
pub use self::state::{SlotState, WorkerState};
pub use self::task::{EncodeResult, EncodeStatus, EncodeTask, EncodedFrame, WorkerMessage};
