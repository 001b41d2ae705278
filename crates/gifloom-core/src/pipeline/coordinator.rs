//! Coordinator - ディスパッチの司令塔（1 タスクのアクター）
//!
//! # 責務
//! - sequence index の採番とスロット予約
//! - 空きワーカーへのタスク割り当て
//! - completion の受け取り → スロットを埋める → ワーカーを戻す → admission 解放
//! - abort 時の全ワーカー停止
//!
//! プール・スラブ・in-flight 表はこのタスクだけが触る。外からは
//! `Command` を送るだけなのでロックは要らない。
//!
//! # 不変条件
//! - in-flight 表にあるタスク数 = Busy ワーカー数 = 保持している permit 数
//! - completion は in-flight 表から外せたときだけ処理する（重複は捨てる）

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::domain::{
    Dimensions, EncodeResult, EncodeTask, EncodedFrame, FrameOptions, FrameParams, PipelineError,
    PipelineEvent, PixelBuffer, Rgb, SequenceIndex, SlotState, WorkerId, WorkerMessage,
};
use crate::pipeline::admission::AdmissionPermit;
use crate::pipeline::pool::WorkerPool;
use crate::pipeline::slab::{FillOutcome, ResultSlab};
use crate::pipeline::status::PipelineStatus;
use crate::ports::{CompletionReceiver, EventSink};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, PipelineError>>;

pub(crate) enum Command {
    Submit {
        pixels: PixelBuffer,
        options: FrameOptions,
        dimensions: Dimensions,
        permit: AdmissionPermit,
        reply: Reply<SequenceIndex>,
    },
    Snapshot {
        reply: oneshot::Sender<PipelineStatus>,
    },
    Slot {
        index: SequenceIndex,
        reply: oneshot::Sender<Option<SlotState>>,
    },
    Assemble {
        reply: Reply<Vec<EncodedFrame>>,
    },
    Abort,
}

/// Animation-wide encoder settings copied into every task.
#[derive(Debug, Clone)]
pub(crate) struct EncodeSettings {
    pub quality: u32,
    pub repeat: i32,
    pub transparent: Option<Rgb>,
    /// Keep a copy of each frame for the next inter-frame task.
    pub retain_previous: bool,
}

struct InFlight {
    worker: WorkerId,
    permit: AdmissionPermit,
}

pub(crate) struct Coordinator {
    pool: WorkerPool,
    slab: ResultSlab,
    in_flight: HashMap<SequenceIndex, InFlight>,
    next_index: SequenceIndex,
    /// Copy of the last submitted frame, only with `retain_previous`.
    previous: Option<PixelBuffer>,
    settings: EncodeSettings,
    capacity: usize,
    sink: Arc<dyn EventSink>,
    aborted: Arc<AtomicBool>,
}

impl Coordinator {
    pub(crate) fn new(
        pool: WorkerPool,
        settings: EncodeSettings,
        capacity: usize,
        sink: Arc<dyn EventSink>,
        aborted: Arc<AtomicBool>,
    ) -> Self {
        Self {
            pool,
            slab: ResultSlab::new(),
            in_flight: HashMap::new(),
            next_index: SequenceIndex::new(0),
            previous: None,
            settings,
            capacity,
            sink,
            aborted,
        }
    }

    /// Run until every `Pipeline` handle is gone. Workers are terminated on exit.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: CompletionReceiver,
    ) {
        loop {
            tokio::select! {
                biased;

                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },

                Some(msg) = completions.recv() => self.handle_completion(msg),
            }
        }

        self.pool.terminate_all();
        debug!(
            submitted = self.slab.len(),
            completed = self.slab.resolved_count(),
            "coordinator stopped"
        );
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Submit {
                pixels,
                options,
                dimensions,
                permit,
                reply,
            } => {
                let result = self.submit(pixels, options, dimensions, permit);
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Slot { index, reply } => {
                let _ = reply.send(self.slab.state(index));
            }
            Command::Assemble { reply } => {
                let _ = reply.send(self.assemble());
            }
            Command::Abort => self.abort(),
        }
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn submit(
        &mut self,
        pixels: PixelBuffer,
        options: FrameOptions,
        dimensions: Dimensions,
        permit: AdmissionPermit,
    ) -> Result<SequenceIndex, PipelineError> {
        if self.is_aborted() {
            return Err(PipelineError::Aborted);
        }

        // ワーカーを先に確保する。失敗してもスロットに穴を開けないため
        let worker = self.pool.take_free()?;
        self.pool.mark_busy(worker)?;

        let index = self.next_index;
        self.next_index = index.next();
        self.slab.reserve(index);

        let previous = if options.inter_frame {
            self.previous.take()
        } else {
            None
        };
        if options.inter_frame && !self.settings.retain_previous {
            debug!(%index, "inter-frame requested but previous frames are not kept");
        }
        self.previous = if self.settings.retain_previous {
            Some(pixels.duplicate())
        } else {
            None
        };

        let params = FrameParams {
            delay_ms: options.delay_ms,
            transparent: options.transparent.or(self.settings.transparent),
            quality: self.settings.quality,
            dimensions,
            repeat: self.settings.repeat,
            last: options.last,
        };
        let mut task = EncodeTask::new(index, params, pixels);
        if let Some(previous) = previous {
            task = task.with_previous(previous);
        }

        match self.pool.post(worker, task) {
            Ok(()) => {
                debug!(%index, %worker, "dispatched");
                self.in_flight.insert(index, InFlight { worker, permit });
                Ok(index)
            }
            Err(err) => {
                warn!(%index, %worker, error = %err, "dispatch failed");
                self.slab.fill(EncodeResult::failed(index, err.to_string()));
                if let Err(e) = self.pool.mark_free(worker) {
                    warn!(%worker, error = %e, "could not return worker after failed post");
                }
                permit.release();
                self.emit_progress(index, false);
                Err(err)
            }
        }
    }

    fn handle_completion(&mut self, msg: WorkerMessage) {
        if self.is_aborted() {
            trace!(worker = %msg.worker, index = %msg.result.index, "completion after abort ignored");
            return;
        }

        let index = msg.result.index;
        let Some(flight) = self.in_flight.remove(&index) else {
            debug!(worker = %msg.worker, %index, "completion for task not in flight dropped");
            return;
        };
        if flight.worker != msg.worker {
            warn!(%index, expected = %flight.worker, got = %msg.worker, "completion from unexpected worker");
        }

        if let Err(e) = self.pool.mark_free(flight.worker) {
            warn!(worker = %flight.worker, error = %e, "could not return worker");
        }

        let ok = msg.result.is_ok();
        match self.slab.fill(msg.result) {
            FillOutcome::Filled => {}
            other => warn!(%index, outcome = ?other, "in-flight result was not recorded"),
        }
        flight.permit.release();

        if ok {
            debug!(%index, worker = %flight.worker, "frame encoded");
        } else {
            warn!(%index, worker = %flight.worker, "frame failed");
        }
        self.emit_progress(index, ok);
    }

    fn emit_progress(&self, index: SequenceIndex, ok: bool) {
        self.sink.emit(&PipelineEvent::Progress {
            index,
            completed: self.slab.resolved_count() as u64,
            submitted: self.slab.len() as u64,
            ok,
        });
    }

    fn abort(&mut self) {
        let abandoned = self.in_flight.len();
        self.pool.terminate_all();
        // permit は drop で解放される
        self.in_flight.clear();
        self.previous = None;
        info!(
            abandoned,
            pending = self.slab.pending_count(),
            "pipeline aborted, workers terminated"
        );
    }

    fn assemble(&self) -> Result<Vec<EncodedFrame>, PipelineError> {
        if self.is_aborted() {
            return Err(PipelineError::Aborted);
        }
        let frames = self.slab.assemble()?;
        info!(frames = frames.len(), "animation assembled");
        self.sink.emit(&PipelineEvent::Finished {
            frames: frames.len() as u64,
        });
        Ok(frames)
    }

    fn snapshot(&self) -> PipelineStatus {
        PipelineStatus {
            submitted: self.slab.len(),
            completed: self.slab.resolved_count(),
            failed: self.slab.failed_count(),
            pending: self.slab.pending_count(),
            in_flight: self.in_flight.len(),
            free_workers: self.pool.free_count(),
            busy_workers: self.pool.busy_count(),
            capacity: self.capacity,
            aborted: self.is_aborted(),
            complete: self.slab.is_complete(),
        }
    }
}
