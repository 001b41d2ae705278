//! Test doubles for pool / coordinator tests.
//!
//! `ScriptedFactory` hands out workers that only record what they get; the
//! test decides when (and in which order) results come back.

use std::sync::{Arc, Mutex};

use crate::domain::{EncodeResult, EncodeTask, PipelineError, SequenceIndex, WorkerId, WorkerMessage};
use crate::ports::{CompletionSender, EncoderWorker, WorkerFactory};

#[derive(Default)]
struct ProbeState {
    posted: Vec<EncodeTask>,
    terminations: usize,
    reject_posts: bool,
}

/// Shared view into a [`RecordingWorker`].
#[derive(Clone, Default)]
pub(crate) struct WorkerProbe(Arc<Mutex<ProbeState>>);

impl WorkerProbe {
    pub(crate) fn terminations(&self) -> usize {
        self.0.lock().unwrap().terminations
    }

    pub(crate) fn posted_indices(&self) -> Vec<SequenceIndex> {
        self.0.lock().unwrap().posted.iter().map(|t| t.index).collect()
    }

    pub(crate) fn take_task(&self, index: SequenceIndex) -> Option<EncodeTask> {
        let mut state = self.0.lock().unwrap();
        let pos = state.posted.iter().position(|t| t.index == index)?;
        Some(state.posted.remove(pos))
    }

    pub(crate) fn reject_posts(&self) {
        self.0.lock().unwrap().reject_posts = true;
    }
}

pub(crate) struct RecordingWorker {
    id: WorkerId,
    probe: WorkerProbe,
}

impl RecordingWorker {
    pub(crate) fn new(id: WorkerId) -> (Self, WorkerProbe) {
        let probe = WorkerProbe::default();
        (
            Self {
                id,
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl EncoderWorker for RecordingWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    fn post(&mut self, task: EncodeTask) -> Result<(), PipelineError> {
        let mut state = self.probe.0.lock().unwrap();
        if state.reject_posts {
            return Err(PipelineError::WorkerUnavailable {
                worker: self.id,
                reason: "rejected by test".to_string(),
            });
        }
        state.posted.push(task);
        Ok(())
    }

    fn terminate(&mut self) {
        self.probe.0.lock().unwrap().terminations += 1;
    }
}

#[derive(Default)]
pub(crate) struct ScriptedFactory {
    probes: Mutex<Vec<(WorkerId, WorkerProbe)>>,
    completions: Mutex<Option<CompletionSender>>,
}

impl ScriptedFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn probes(&self) -> Vec<(WorkerId, WorkerProbe)> {
        self.probes.lock().unwrap().clone()
    }

    pub(crate) fn probe(&self, id: WorkerId) -> WorkerProbe {
        self.probes()
            .into_iter()
            .find(|(w, _)| *w == id)
            .map(|(_, p)| p)
            .expect("unknown worker")
    }

    /// Which worker got the task for `index`.
    pub(crate) fn worker_for(&self, index: SequenceIndex) -> Option<WorkerId> {
        self.probes()
            .into_iter()
            .find(|(_, p)| p.posted_indices().contains(&index))
            .map(|(w, _)| w)
    }

    /// Take the task back out of its worker (for inspecting buffers).
    pub(crate) fn take_task(&self, index: SequenceIndex) -> Option<EncodeTask> {
        self.probes()
            .into_iter()
            .find_map(|(_, p)| p.take_task(index))
    }

    pub(crate) fn send(&self, worker: WorkerId, result: EncodeResult) {
        let completions = self.completions.lock().unwrap();
        let tx = completions.as_ref().expect("factory never spawned a worker");
        // the coordinator may already be gone; that's what some tests check
        let _ = tx.send(WorkerMessage { worker, result });
    }

    pub(crate) fn complete(&self, index: SequenceIndex, payload: Vec<u8>) {
        let worker = self.worker_for(index).expect("task was never posted");
        self.send(worker, EncodeResult::ok(index, payload));
    }

    pub(crate) fn fail(&self, index: SequenceIndex, reason: &str) {
        let worker = self.worker_for(index).expect("task was never posted");
        self.send(worker, EncodeResult::failed(index, reason));
    }
}

impl WorkerFactory for ScriptedFactory {
    fn spawn(
        &self,
        id: WorkerId,
        completions: CompletionSender,
    ) -> Result<Box<dyn EncoderWorker>, PipelineError> {
        let (worker, probe) = RecordingWorker::new(id);
        self.probes.lock().unwrap().push((id, probe));
        *self.completions.lock().unwrap() = Some(completions);
        Ok(Box::new(worker))
    }
}
