//! ResultSlab - sequence index で引く結果置き場
//!
//! 埋まる順番はバラバラ、読む順番は必ず index 昇順。
//! 各スロットは Pending から一度だけ遷移する（上書きしない）。

use tracing::debug;

use crate::domain::{
    EncodeResult, EncodeStatus, EncodedFrame, PipelineError, SequenceIndex, SlotState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Pending,
    Filled(EncodeResult),
}

impl Slot {
    pub fn state(&self) -> SlotState {
        match self {
            Slot::Pending => SlotState::Pending,
            Slot::Filled(r) if r.is_ok() => SlotState::Filled,
            Slot::Filled(_) => SlotState::Failed,
        }
    }
}

/// What `fill` did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    Filled,
    /// Slot already had a result; the new one was dropped.
    Duplicate,
    /// No slot was reserved for that index; the result was dropped.
    OutOfRange,
}

#[derive(Debug, Default)]
pub struct ResultSlab {
    slots: Vec<Slot>,
    resolved: usize,
    failed: usize,
}

impl ResultSlab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reserved slots (= next sequence index).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }

    pub fn pending_count(&self) -> usize {
        self.slots.len() - self.resolved
    }

    /// Make sure a Pending slot exists at `index`. Already reserved slots are left alone.
    pub fn reserve(&mut self, index: SequenceIndex) {
        let i = index.as_usize();
        if i >= self.slots.len() {
            self.slots.resize(i + 1, Slot::Pending);
        }
    }

    pub fn fill(&mut self, result: EncodeResult) -> FillOutcome {
        let index = result.index;
        let Some(slot) = self.slots.get_mut(index.as_usize()) else {
            debug!(%index, "result for unreserved slot dropped");
            return FillOutcome::OutOfRange;
        };
        if !matches!(slot, Slot::Pending) {
            debug!(%index, "duplicate result dropped");
            return FillOutcome::Duplicate;
        }
        if matches!(result.status, EncodeStatus::Failed(_)) {
            self.failed += 1;
        }
        self.resolved += 1;
        *slot = Slot::Filled(result);
        FillOutcome::Filled
    }

    pub fn state(&self, index: SequenceIndex) -> Option<SlotState> {
        self.slots.get(index.as_usize()).map(Slot::state)
    }

    pub fn get(&self, index: SequenceIndex) -> Option<&Slot> {
        self.slots.get(index.as_usize())
    }

    /// Every reserved slot has a result (failures count as results).
    pub fn is_complete(&self) -> bool {
        self.resolved == self.slots.len()
    }

    /// Slots in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = (SequenceIndex, &Slot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (SequenceIndex::new(i as u64), slot))
    }

    /// Ordered output. Fails if anything is still pending or any frame failed
    /// (the lowest failed index is reported).
    pub fn assemble(&self) -> Result<Vec<EncodedFrame>, PipelineError> {
        if !self.is_complete() {
            return Err(PipelineError::Incomplete {
                pending: self.pending_count(),
            });
        }
        let mut frames = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.iter() {
            match slot {
                Slot::Filled(EncodeResult {
                    payload,
                    status: EncodeStatus::Ok,
                    ..
                }) => frames.push(EncodedFrame {
                    index,
                    payload: payload.clone(),
                }),
                Slot::Filled(EncodeResult {
                    status: EncodeStatus::Failed(reason),
                    ..
                }) => {
                    return Err(PipelineError::FrameFailed {
                        index,
                        reason: reason.clone(),
                    });
                }
                Slot::Pending => {
                    return Err(PipelineError::Incomplete {
                        pending: self.pending_count(),
                    });
                }
            }
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn idx(i: u64) -> SequenceIndex {
        SequenceIndex::new(i)
    }

    fn slab_with(n: u64) -> ResultSlab {
        let mut slab = ResultSlab::new();
        for i in 0..n {
            slab.reserve(idx(i));
        }
        slab
    }

    #[test]
    fn empty_slab_is_complete() {
        assert!(ResultSlab::new().is_complete());
        assert_eq!(ResultSlab::new().assemble().unwrap(), vec![]);
    }

    #[test]
    fn out_of_order_fill_reads_in_order() {
        let mut slab = slab_with(3);
        assert_eq!(slab.fill(EncodeResult::ok(idx(1), vec![1])), FillOutcome::Filled);
        assert_eq!(slab.state(idx(0)), Some(SlotState::Pending));
        assert!(!slab.is_complete());

        slab.fill(EncodeResult::ok(idx(0), vec![0]));
        assert!(!slab.is_complete());
        slab.fill(EncodeResult::ok(idx(2), vec![2]));
        assert!(slab.is_complete());

        let frames = slab.assemble().unwrap();
        let order: Vec<u64> = frames.iter().map(|f| f.index.get()).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(frames[2].payload, vec![2]);
    }

    #[test]
    fn duplicate_fill_does_not_overwrite() {
        let mut slab = slab_with(1);
        slab.fill(EncodeResult::ok(idx(0), vec![1, 1]));
        assert_eq!(
            slab.fill(EncodeResult::ok(idx(0), vec![2, 2])),
            FillOutcome::Duplicate
        );
        assert_eq!(slab.resolved_count(), 1);
        assert_eq!(slab.get(idx(0)), Some(&Slot::Filled(EncodeResult::ok(idx(0), vec![1, 1]))));
    }

    #[test]
    fn unreserved_index_is_out_of_range() {
        let mut slab = slab_with(1);
        assert_eq!(
            slab.fill(EncodeResult::ok(idx(5), vec![])),
            FillOutcome::OutOfRange
        );
        assert_eq!(slab.len(), 1);
    }

    #[rstest]
    #[case::first(0)]
    #[case::middle(1)]
    #[case::last(2)]
    fn failed_slot_resolves_but_fails_assembly(#[case] failing: u64) {
        let mut slab = slab_with(3);
        for i in 0..3 {
            if i == failing {
                slab.fill(EncodeResult::failed(idx(i), "lzw overflow"));
            } else {
                slab.fill(EncodeResult::ok(idx(i), vec![i as u8]));
            }
        }
        assert!(slab.is_complete());
        assert_eq!(slab.failed_count(), 1);
        assert_eq!(slab.state(idx(failing)), Some(SlotState::Failed));
        match slab.assemble() {
            Err(PipelineError::FrameFailed { index, reason }) => {
                assert_eq!(index, idx(failing));
                assert_eq!(reason, "lzw overflow");
            }
            other => panic!("expected FrameFailed, got {other:?}"),
        }
    }

    #[test]
    fn assemble_reports_pending() {
        let mut slab = slab_with(2);
        slab.fill(EncodeResult::ok(idx(1), vec![]));
        assert!(matches!(
            slab.assemble(),
            Err(PipelineError::Incomplete { pending: 1 })
        ));
    }
}
