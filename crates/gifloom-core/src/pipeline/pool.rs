//! WorkerPool - 固定サイズのワーカー集合
//!
//! # 設計
//! - `HashMap<WorkerId, PooledWorker>` が唯一の正本（ハンドル + 状態）
//! - free リストは WorkerId だけを持つ（FIFO で払い出す）
//! - コーディネーターのループからしか触らないのでロック不要
//!
//! admission の容量 = プールサイズなので、正しい順序で呼べば
//! `PoolExhausted` は起きない。起きたらコーディネーターのバグ。

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::domain::{EncodeTask, PipelineError, WorkerId, WorkerState};
use crate::ports::EncoderWorker;

struct PooledWorker {
    handle: Box<dyn EncoderWorker>,
    state: WorkerState,
}

#[derive(Default)]
pub struct WorkerPool {
    workers: HashMap<WorkerId, PooledWorker>,
    free: VecDeque<WorkerId>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool where every worker starts free.
    pub fn from_workers(handles: Vec<Box<dyn EncoderWorker>>) -> Self {
        let mut pool = Self::new();
        for handle in handles {
            let id = handle.id();
            pool.free.push_back(id);
            pool.workers.insert(
                id,
                PooledWorker {
                    handle,
                    state: WorkerState::Free,
                },
            );
        }
        pool
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn busy_count(&self) -> usize {
        self.workers
            .values()
            .filter(|w| w.state == WorkerState::Busy)
            .count()
    }

    pub fn state(&self, id: WorkerId) -> Option<WorkerState> {
        self.workers.get(&id).map(|w| w.state)
    }

    /// Remove one worker from the free list.
    pub fn take_free(&mut self) -> Result<WorkerId, PipelineError> {
        self.free.pop_front().ok_or(PipelineError::PoolExhausted)
    }

    pub fn mark_busy(&mut self, id: WorkerId) -> Result<(), PipelineError> {
        let worker = self
            .workers
            .get_mut(&id)
            .ok_or(PipelineError::UnknownWorker(id))?;
        worker.state = WorkerState::Busy;
        // take_free を経由していない場合に備えて free リストからも外す
        self.free.retain(|w| *w != id);
        Ok(())
    }

    pub fn mark_free(&mut self, id: WorkerId) -> Result<(), PipelineError> {
        let worker = self
            .workers
            .get_mut(&id)
            .ok_or(PipelineError::UnknownWorker(id))?;
        if worker.state != WorkerState::Busy {
            return Err(PipelineError::WorkerNotBusy(id));
        }
        worker.state = WorkerState::Free;
        self.free.push_back(id);
        Ok(())
    }

    /// Send a task to a busy worker.
    pub fn post(&mut self, id: WorkerId, task: EncodeTask) -> Result<(), PipelineError> {
        let worker = self
            .workers
            .get_mut(&id)
            .ok_or(PipelineError::UnknownWorker(id))?;
        if worker.state != WorkerState::Busy {
            return Err(PipelineError::WorkerNotBusy(id));
        }
        worker.handle.post(task)
    }

    /// Stop every worker, free or busy, and forget them all.
    pub fn terminate_all(&mut self) {
        for (id, mut worker) in self.workers.drain() {
            debug!(worker = %id, state = ?worker.state, "terminate");
            worker.handle.terminate();
        }
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingWorker;

    fn pool_of(n: u64) -> (WorkerPool, Vec<crate::testing::WorkerProbe>) {
        let mut probes = Vec::new();
        let mut handles: Vec<Box<dyn EncoderWorker>> = Vec::new();
        for i in 0..n {
            let (worker, probe) = RecordingWorker::new(WorkerId::new(i));
            probes.push(probe);
            handles.push(Box::new(worker));
        }
        (WorkerPool::from_workers(handles), probes)
    }

    #[test]
    fn take_until_exhausted() {
        let (mut pool, _) = pool_of(2);
        let a = pool.take_free().unwrap();
        pool.mark_busy(a).unwrap();
        let b = pool.take_free().unwrap();
        pool.mark_busy(b).unwrap();

        assert_ne!(a, b);
        assert_eq!(pool.busy_count(), 2);
        assert!(matches!(pool.take_free(), Err(PipelineError::PoolExhausted)));
    }

    #[test]
    fn mark_free_returns_worker_to_free_list() {
        let (mut pool, _) = pool_of(1);
        let id = pool.take_free().unwrap();
        pool.mark_busy(id).unwrap();
        pool.mark_free(id).unwrap();

        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.state(id), Some(WorkerState::Free));
        assert_eq!(pool.take_free().unwrap(), id);
    }

    #[test]
    fn mark_free_on_free_worker_is_rejected() {
        let (mut pool, _) = pool_of(1);
        let err = pool.mark_free(WorkerId::new(0)).unwrap_err();
        assert!(matches!(err, PipelineError::WorkerNotBusy(_)));
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn unknown_worker_is_rejected() {
        let (mut pool, _) = pool_of(1);
        assert!(matches!(
            pool.mark_busy(WorkerId::new(9)),
            Err(PipelineError::UnknownWorker(_))
        ));
    }

    #[test]
    fn terminate_all_hits_every_worker_once() {
        let (mut pool, probes) = pool_of(3);
        let id = pool.take_free().unwrap();
        pool.mark_busy(id).unwrap();

        pool.terminate_all();
        pool.terminate_all();

        assert!(pool.is_empty());
        assert_eq!(pool.free_count(), 0);
        for probe in probes {
            assert_eq!(probe.terminations(), 1);
        }
    }
}
