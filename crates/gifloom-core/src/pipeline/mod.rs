//! Pipeline - 順序を保ったまま並列にエンコードするディスパッチ層
//!
//! # 構成
//! - **admission**: 同時実行数の上限（submit 側で待つ）
//! - **pool**: 固定サイズのワーカー集合と Free / Busy 状態
//! - **slab**: index で引く結果置き場（読み出しは常に index 順）
//! - **coordinator**: 上の 3 つを束ねるアクター
//! - **handle / builder**: 外から使う API

pub mod admission;
pub mod builder;
mod coordinator;
pub mod handle;
pub mod pool;
pub mod slab;
pub mod status;

pub use self::admission::{AdmissionPermit, AdmissionThrottle};
pub use self::builder::{BuildError, PipelineBuilder};
pub use self::handle::Pipeline;
pub use self::pool::WorkerPool;
pub use self::slab::{FillOutcome, ResultSlab, Slot};
pub use self::status::PipelineStatus;
