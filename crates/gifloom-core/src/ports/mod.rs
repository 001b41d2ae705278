//! Ports - 抽象化レイヤー
//!
//! パイプラインの外側にいる協調者へのインターフェース。
//! - ピクセルの取り出し元（PixelSource）
//! - エンコーダーワーカー（EncoderWorker / WorkerFactory / FrameEncoder）
//! - イベント通知先（EventSink）

pub mod encoder;
pub mod event_sink;
pub mod pixel_source;

pub use self::encoder::{
    CompletionReceiver, CompletionSender, EncoderWorker, FrameEncoder, WorkerFactory,
};
pub use self::event_sink::EventSink;
pub use self::pixel_source::{Frame, FrameHandle, PixelSource, Renderable, Surface};
