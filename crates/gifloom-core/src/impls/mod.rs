//! Impls - ports の標準実装
//!
//! # 含まれる実装
//! - **DefaultPixelSource**: raw / surface / image の 3 種類を解決
//! - **TaskWorker**: tokio タスクで動くエンコーダーワーカー
//! - **EventSink 各種**: Noop / Tracing / Channel / Fanout

pub mod event_sink;
pub mod pixel_source;
pub mod task_worker;

pub use self::event_sink::{ChannelEventSink, FanoutEventSink, NoopEventSink, TracingEventSink};
pub use self::pixel_source::DefaultPixelSource;
pub use self::task_worker::{TaskWorker, TaskWorkerFactory};
