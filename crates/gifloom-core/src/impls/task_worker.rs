//! TaskWorker - tokio タスクで動くエンコーダーワーカー
//!
//! # 実装詳細
//! - ワーカーごとに専用の mpsc（タスク受け取り用）を持つ
//! - 結果は全ワーカー共通の completion チャネルへ送る
//! - `terminate()` は実行中のタスクごと abort する（結果は二度と届かない）

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::domain::{
    EncodeResult, EncodeTask, PipelineError, TransferMode, WorkerId, WorkerMessage,
};
use crate::ports::{CompletionSender, EncoderWorker, FrameEncoder, WorkerFactory};

/// Spawns [`TaskWorker`]s that all share one encoder.
pub struct TaskWorkerFactory<E> {
    encoder: Arc<E>,
    transfer: TransferMode,
}

impl<E: FrameEncoder> TaskWorkerFactory<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder: Arc::new(encoder),
            transfer: TransferMode::default(),
        }
    }

    /// Share an encoder the caller keeps a handle to.
    pub fn from_shared(encoder: Arc<E>) -> Self {
        Self {
            encoder,
            transfer: TransferMode::default(),
        }
    }

    /// Transfer mode taken from `config.zero_copy`.
    pub fn from_config(encoder: E, config: &PipelineConfig) -> Self {
        Self::new(encoder).with_transfer(config.transfer_mode())
    }

    pub fn with_transfer(mut self, transfer: TransferMode) -> Self {
        self.transfer = transfer;
        self
    }
}

impl<E: FrameEncoder> WorkerFactory for TaskWorkerFactory<E> {
    fn spawn(
        &self,
        id: WorkerId,
        completions: CompletionSender,
    ) -> Result<Box<dyn EncoderWorker>, PipelineError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            PipelineError::WorkerUnavailable {
                worker: id,
                reason: e.to_string(),
            }
        })?;
        let (tasks_tx, tasks_rx) = mpsc::unbounded_channel();
        let join = runtime.spawn(run(id, Arc::clone(&self.encoder), tasks_rx, completions));
        debug!(worker = %id, "encoder worker spawned");
        Ok(Box::new(TaskWorker {
            id,
            tasks: Some(tasks_tx),
            join,
            transfer: self.transfer,
        }))
    }
}

/// A worker backed by a spawned tokio task.
pub struct TaskWorker {
    id: WorkerId,
    tasks: Option<mpsc::UnboundedSender<EncodeTask>>,
    join: JoinHandle<()>,
    transfer: TransferMode,
}

impl EncoderWorker for TaskWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    fn post(&mut self, task: EncodeTask) -> Result<(), PipelineError> {
        let Some(tasks) = &self.tasks else {
            return Err(PipelineError::WorkerUnavailable {
                worker: self.id,
                reason: "terminated".to_string(),
            });
        };
        let EncodeTask {
            index,
            params,
            pixels,
            previous,
        } = task;
        let task = EncodeTask {
            index,
            params,
            pixels: pixels.transfer(self.transfer),
            previous: previous.map(|p| p.transfer(self.transfer)),
        };
        tasks
            .send(task)
            .map_err(|_| PipelineError::WorkerUnavailable {
                worker: self.id,
                reason: "worker task exited".to_string(),
            })
    }

    fn terminate(&mut self) {
        if self.tasks.take().is_some() {
            debug!(worker = %self.id, "terminating encoder worker");
        }
        self.join.abort();
    }
}

impl Drop for TaskWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Aborts the wrapped task when dropped, so aborting the worker loop also
/// cancels the encode it was waiting on.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn run<E: FrameEncoder>(
    id: WorkerId,
    encoder: Arc<E>,
    mut tasks: mpsc::UnboundedReceiver<EncodeTask>,
    completions: CompletionSender,
) {
    while let Some(task) = tasks.recv().await {
        let index = task.index;
        let encoder = Arc::clone(&encoder);

        // 別タスクで実行して panic を失敗結果に変換する
        let mut guard = AbortOnDrop(tokio::spawn(async move { encoder.encode(&task).await }));
        let result = match (&mut guard.0).await {
            Ok(Ok(payload)) => EncodeResult::ok(index, payload),
            Ok(Err(reason)) => EncodeResult::failed(index, reason),
            Err(e) => {
                warn!(worker = %id, %index, error = %e, "encoder task did not finish");
                EncodeResult::failed(index, format!("encoder crashed: {e}"))
            }
        };

        if completions
            .send(WorkerMessage { worker: id, result })
            .is_err()
        {
            debug!(worker = %id, "completion channel closed; worker exiting");
            break;
        }
    }
}
