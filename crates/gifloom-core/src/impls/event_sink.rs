//! EventSink の実装
//!
//! - **NoopEventSink**: 何もしない（デフォルト）
//! - **TracingEventSink**: tracing でログに流す
//! - **ChannelEventSink**: 呼び出し側へ mpsc で流す
//! - **FanoutEventSink**: 複数の sink に配る

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::PipelineEvent;
use crate::ports::EventSink;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &PipelineEvent) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Progress {
                index,
                completed,
                submitted,
                ok,
            } => info!(%index, completed, submitted, ok, "frame done"),
            PipelineEvent::Abort => warn!("pipeline aborted"),
            PipelineEvent::Finished { frames } => info!(frames, "all frames assembled"),
        }
    }
}

/// Forwards every event to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: &PipelineEvent) {
        // ignore send error: nobody is listening anymore
        let _ = self.tx.send(event.clone());
    }
}

#[derive(Default, Clone)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutEventSink {
    fn emit(&self, event: &PipelineEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
