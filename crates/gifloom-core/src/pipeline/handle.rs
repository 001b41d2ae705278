//! Pipeline - 呼び出し側が触るハンドル
//!
//! # submit の流れ
//! 1. abort 済みなら即エラー
//! 2. 出力サイズを決める（未設定の軸だけ surface / image のサイズで埋める）
//! 3. PixelSource でピクセルを取り出す
//! 4. admission の空きを待つ（ここで suspend する）
//! 5. コーディネーターに渡して sequence index を受け取る
//!
//! index は 5 の時点で決まるので、順番は submit が permit を取った順。
//! 1 つの呼び出し元から順に submit していれば呼んだ順と一致する。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{
    Dimensions, EncodedFrame, PipelineError, PipelineEvent, SequenceIndex, SlotState,
};
use crate::pipeline::admission::AdmissionThrottle;
use crate::pipeline::coordinator::Command;
use crate::pipeline::status::PipelineStatus;
use crate::ports::{EventSink, Frame, FrameHandle, PixelSource};

/// Handle to a running pipeline. Built by [`PipelineBuilder`](crate::pipeline::PipelineBuilder).
pub struct Pipeline {
    pub(crate) dimensions: OnceLock<Dimensions>,
    /// Configured axes; an unset one is taken from the first sized frame.
    pub(crate) width: Option<u32>,
    pub(crate) height: Option<u32>,
    pub(crate) throttle: Arc<AdmissionThrottle>,
    pub(crate) commands: mpsc::UnboundedSender<Command>,
    pub(crate) source: Arc<dyn PixelSource>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) aborted: Arc<AtomicBool>,
    pub(crate) coordinator: JoinHandle<()>,
}

impl Pipeline {
    /// Queue one frame for encoding.
    ///
    /// Suspends while `capacity` frames are already in flight. Returns the
    /// frame's position in the output.
    pub async fn submit(&self, frame: Frame) -> Result<SequenceIndex, PipelineError> {
        if self.is_aborted() {
            return Err(PipelineError::Aborted);
        }

        let dimensions = self.resolve_dimensions(&frame.handle)?;
        let pixels = self.source.extract(frame.handle, dimensions)?;

        let permit = self.throttle.acquire().await;
        // 待っている間に abort されたかもしれない
        if self.is_aborted() {
            return Err(PipelineError::Aborted);
        }

        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Submit {
                pixels,
                options: frame.options,
                dimensions,
                permit,
                reply,
            })
            .map_err(|_| PipelineError::Closed)?;
        rx.await.map_err(|_| PipelineError::Closed)?
    }

    /// Output size, once known.
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions.get().copied()
    }

    fn resolve_dimensions(&self, handle: &FrameHandle) -> Result<Dimensions, PipelineError> {
        if let Some(dims) = self.dimensions.get() {
            return Ok(*dims);
        }
        match handle.intrinsic_dimensions() {
            Some(intrinsic) => {
                let merged = Dimensions::new(
                    self.width.unwrap_or(intrinsic.width),
                    self.height.unwrap_or(intrinsic.height),
                );
                let adopted = *self.dimensions.get_or_init(|| merged);
                debug!(dimensions = %adopted, frame = %intrinsic, "output size completed from first frame");
                Ok(adopted)
            }
            None => Err(PipelineError::Precondition(
                "width and height must be set before submitting raw pixels".into(),
            )),
        }
    }

    /// Suspend until no frame is in flight.
    pub async fn drain(&self) {
        self.throttle.drain().await;
    }

    /// Wait for every submitted frame, then return them in sequence order.
    ///
    /// Fails with `FrameFailed` if any frame failed, `Aborted` after `abort()`.
    pub async fn finish(&self) -> Result<Vec<EncodedFrame>, PipelineError> {
        if self.is_aborted() {
            return Err(PipelineError::Aborted);
        }
        self.drain().await;

        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Assemble { reply })
            .map_err(|_| PipelineError::Closed)?;
        rx.await.map_err(|_| PipelineError::Closed)?
    }

    pub async fn status(&self) -> Result<PipelineStatus, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply })
            .map_err(|_| PipelineError::Closed)?;
        rx.await.map_err(|_| PipelineError::Closed)
    }

    /// Every submitted frame has a result (failed frames included).
    pub async fn is_complete(&self) -> Result<bool, PipelineError> {
        Ok(self.status().await?.complete)
    }

    /// State of one slot, `None` if that index was never assigned.
    pub async fn slot_state(&self, index: SequenceIndex) -> Result<Option<SlotState>, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Slot { index, reply })
            .map_err(|_| PipelineError::Closed)?;
        rx.await.map_err(|_| PipelineError::Closed)
    }

    pub fn capacity(&self) -> usize {
        self.throttle.capacity()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Stop all workers. Results still in flight are discarded and their
    /// slots stay pending. Calling it again does nothing.
    pub fn abort(&self) {
        if self.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("abort requested");
        // コーディネーターが既にいなければ止めるワーカーもいない
        let _ = self.commands.send(Command::Abort);
        self.sink.emit(&PipelineEvent::Abort);
    }

    /// Stop the coordinator and terminate its workers.
    pub async fn shutdown(self) {
        let Pipeline {
            commands,
            coordinator,
            ..
        } = self;
        drop(commands);
        if let Err(e) = coordinator.await {
            debug!(error = %e, "coordinator task ended abnormally");
        }
    }
}
