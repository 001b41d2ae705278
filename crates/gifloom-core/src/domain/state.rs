//! State - ワーカーとスロットの状態

use serde::{Deserialize, Serialize};

/// WorkerState はプール内ワーカーの状態
///
/// # 状態遷移
/// - Free → Busy: タスクを割り当てたとき
/// - Busy → Free: 結果が返ってきたとき
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Free,
    Busy,
}

/// SlotState は ResultSlab の 1 スロットの状態
///
/// Pending → Filled / Failed へ一度だけ遷移する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Pending,
    Filled,
    Failed,
}

impl SlotState {
    /// Has a result (payload or failure) been recorded?
    pub fn is_resolved(self) -> bool {
        !matches!(self, SlotState::Pending)
    }
}
