//! gifloom-core
//!
//! Order-preserving, bounded-concurrency dispatch for animation frame encoding.
//!
//! フレームは順番に submit され、複数のワーカーで並列にエンコードされ、
//! 終わった順ではなく submit した順で取り出される。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, frame, task, state, events, errors）
//! - **ports**: 抽象化レイヤー（PixelSource, EncoderWorker, WorkerFactory, FrameEncoder, EventSink）
//! - **impls**: ports の標準実装（DefaultPixelSource, TaskWorker, EventSink 各種）
//! - **pipeline**: admission / pool / slab / coordinator と、外から使う Pipeline
//! - **config**: TOML 設定

pub mod config;
pub mod domain;
pub mod impls;
pub mod pipeline;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, PipelineConfig};
pub use domain::{EncodedFrame, FrameOptions, PipelineError, PipelineEvent, SequenceIndex};
pub use pipeline::{BuildError, Pipeline, PipelineBuilder, PipelineStatus};
pub use ports::{Frame, FrameEncoder};
