//! PipelineBuilder - パイプラインの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 設定の検証は build() 時に行う
//! - ワーカーを 1 つでも起動できなければ、起動済みのものを止めてエラーを返す
//! - tokio ランタイムの外で呼ぶとエラー（コーディネーターを spawn できない）

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tracing::info;

use crate::config::{ConfigError, PipelineConfig};
use crate::domain::{PipelineError, WorkerId};
use crate::impls::{DefaultPixelSource, NoopEventSink};
use crate::pipeline::admission::AdmissionThrottle;
use crate::pipeline::coordinator::{Coordinator, EncodeSettings};
use crate::pipeline::handle::Pipeline;
use crate::pipeline::pool::WorkerPool;
use crate::ports::{EventSink, PixelSource, WorkerFactory};

/// BuildError はパイプライン構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start worker: {0}")]
    Worker(#[from] PipelineError),

    #[error("no tokio runtime: {0}")]
    NoRuntime(String),
}

/// PipelineBuilder は Pipeline を構築
///
/// # 使用例
/// ```ignore
/// let pipeline = PipelineBuilder::new(config)
///     .with_event_sink(Arc::new(TracingEventSink))
///     .build(&TaskWorkerFactory::new(MyEncoder))?;
/// ```
pub struct PipelineBuilder {
    config: PipelineConfig,
    source: Arc<dyn PixelSource>,
    sink: Arc<dyn EventSink>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            source: Arc::new(DefaultPixelSource::new()),
            sink: Arc::new(NoopEventSink),
        }
    }

    pub fn with_pixel_source(mut self, source: Arc<dyn PixelSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Spawn `config.workers` workers and start the coordinator.
    pub fn build(self, factory: &dyn WorkerFactory) -> Result<Pipeline, BuildError> {
        self.config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BuildError::NoRuntime(e.to_string()))?;

        let size = self.config.workers;
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            match factory.spawn(WorkerId::new(i as u64), completions_tx.clone()) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    for mut worker in workers {
                        worker.terminate();
                    }
                    return Err(e.into());
                }
            }
        }
        // 送信側はワーカーだけが持つ
        drop(completions_tx);

        let aborted = Arc::new(AtomicBool::new(false));
        let settings = EncodeSettings {
            quality: self.config.quality,
            repeat: self.config.repeat,
            transparent: self.config.transparent,
            retain_previous: self.config.inter_frame,
        };
        let coordinator = Coordinator::new(
            WorkerPool::from_workers(workers),
            settings,
            size,
            Arc::clone(&self.sink),
            Arc::clone(&aborted),
        );
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let coordinator = runtime.spawn(coordinator.run(commands_rx, completions_rx));

        let dimensions = OnceLock::new();
        if let Some(dims) = self.config.dimensions() {
            let _ = dimensions.set(dims);
        }

        info!(
            workers = size,
            dimensions = ?self.config.dimensions(),
            zero_copy = self.config.zero_copy,
            "pipeline started"
        );

        Ok(Pipeline {
            dimensions,
            width: self.config.width,
            height: self.config.height,
            throttle: AdmissionThrottle::new(size),
            commands: commands_tx,
            source: self.source,
            sink: self.sink,
            aborted,
            coordinator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Dimensions;
    use crate::ports::{CompletionSender, EncoderWorker};
    use crate::testing::{RecordingWorker, ScriptedFactory, WorkerProbe};
    use std::sync::Mutex;

    #[tokio::test]
    async fn builds_one_worker_per_slot() {
        let factory = ScriptedFactory::new();
        let pipeline = PipelineBuilder::new(PipelineConfig::default().with_workers(3))
            .build(&factory)
            .unwrap();

        assert_eq!(factory.probes().len(), 3);
        assert_eq!(pipeline.capacity(), 3);
        let status = pipeline.status().await.unwrap();
        assert_eq!(status.free_workers, 3);
        assert_eq!(status.capacity, 3);
        assert!(status.complete);
    }

    #[tokio::test]
    async fn configured_dimensions_are_fixed_up_front() {
        let pipeline = PipelineBuilder::new(PipelineConfig::default().with_dimensions(4, 3))
            .build(&ScriptedFactory::new())
            .unwrap();
        assert_eq!(pipeline.dimensions(), Some(Dimensions::new(4, 3)));
    }

    #[tokio::test]
    async fn invalid_config_fails_fast() {
        let err = PipelineBuilder::new(PipelineConfig::default().with_workers(0))
            .build(&ScriptedFactory::new())
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::Config(_)));
    }

    /// Gives out `ok` workers, then refuses.
    struct FlakyFactory {
        ok: usize,
        probes: Mutex<Vec<WorkerProbe>>,
    }

    impl WorkerFactory for FlakyFactory {
        fn spawn(
            &self,
            id: WorkerId,
            _completions: CompletionSender,
        ) -> Result<Box<dyn EncoderWorker>, PipelineError> {
            let mut probes = self.probes.lock().unwrap();
            if probes.len() == self.ok {
                return Err(PipelineError::WorkerUnavailable {
                    worker: id,
                    reason: "out of threads".into(),
                });
            }
            let (worker, probe) = RecordingWorker::new(id);
            probes.push(probe);
            Ok(Box::new(worker))
        }
    }

    #[tokio::test]
    async fn failed_spawn_terminates_started_workers() {
        let factory = FlakyFactory {
            ok: 2,
            probes: Mutex::new(Vec::new()),
        };
        let err = PipelineBuilder::new(PipelineConfig::default().with_workers(4))
            .build(&factory)
            .err()
            .unwrap();

        assert!(matches!(err, BuildError::Worker(_)));
        for probe in factory.probes.lock().unwrap().iter() {
            assert_eq!(probe.terminations(), 1);
        }
    }

    #[test]
    fn needs_a_runtime() {
        let err = PipelineBuilder::new(PipelineConfig::default())
            .build(&ScriptedFactory::new())
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::NoRuntime(_)));
    }
}
