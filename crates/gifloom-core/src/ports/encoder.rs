//! Encoder ports - エンコーダーワーカーの抽象化
//!
//! # 二層構造
//! - **FrameEncoder**: エンコードアルゴリズム本体（パレット量子化・LZW などは全部こちら側）
//! - **EncoderWorker**: タスクを受け取り、結果を completion チャネルに送る実行単位
//!
//! コーディネーターは EncoderWorker しか知らない。`post()` は fire-and-forget で、
//! 結果は後から `CompletionSender` 経由で任意の順番で届く。

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{EncodeTask, PipelineError, WorkerId, WorkerMessage};

/// Shared, multiplexed completion channel. Every worker holds a clone.
pub type CompletionSender = mpsc::UnboundedSender<WorkerMessage>;
pub type CompletionReceiver = mpsc::UnboundedReceiver<WorkerMessage>;

/// The encoding algorithm itself.
#[async_trait]
pub trait FrameEncoder: Send + Sync + 'static {
    async fn encode(&self, task: &EncodeTask) -> Result<Vec<u8>, String>;
}

/// One encoder unit in the pool.
pub trait EncoderWorker: Send {
    fn id(&self) -> WorkerId;

    /// Hand a task over. Must not wait for the result.
    fn post(&mut self, task: EncodeTask) -> Result<(), PipelineError>;

    /// Stop immediately. In-flight work never reports back. Idempotent.
    fn terminate(&mut self);
}

/// Creates workers for the pool at build time.
pub trait WorkerFactory: Send + Sync {
    fn spawn(
        &self,
        id: WorkerId,
        completions: CompletionSender,
    ) -> Result<Box<dyn EncoderWorker>, PipelineError>;
}
