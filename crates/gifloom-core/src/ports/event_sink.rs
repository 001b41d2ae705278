//! EventSink port - 進捗・ライフサイクルイベントの通知

use crate::domain::PipelineEvent;

/// EventSink はパイプラインイベントを受け取る
///
/// コーディネーターのループ内から呼ばれるので、ブロックしないこと。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent);
}
