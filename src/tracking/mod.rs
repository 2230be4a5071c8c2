// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 多目标跟踪 (Multi-Object Tracking)
///
/// - state:      轨迹生命周期 (READY / RUNNING / LOST)
/// - track:      单个槽位 (KCF 外观模型 + 质量分)
/// - pool:       固定容量轨迹池与淘汰策略
/// - matching:   代价矩阵与贪心匹配
/// - associator: 检测周期的关联流程
pub mod associator;
pub mod matching;
pub mod pool;
pub mod state;
pub mod track;
pub mod tracker;

pub use associator::Associator;
pub use pool::TrackPool;
pub use state::TrackState;
pub use track::Track;
pub use tracker::{TrackPoint, TrackedObject};
