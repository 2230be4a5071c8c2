// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 跟踪配置参数
pub mod detection; // 运动检测系统
pub mod error; // 错误类型
pub mod input; // 帧输入系统
pub mod kcf; // KCF 相关滤波
pub mod pipeline; // 检测 + 跟踪流水线
pub mod renderer; // 结果绘制
pub mod tracking; // 多目标关联与轨迹管理
pub mod utils; // 工具模块

pub use crate::config::{DetectorConfig, KcfConfig, MotConfig, TrackerConfig};
pub use crate::detection::{BBox, Detection, Frame, MotionDetector};
pub use crate::error::{MotError, Result};
pub use crate::pipeline::{FrameResult, MotPipeline};
pub use crate::tracking::{Associator, TrackState, TrackedObject};

/// 本地时间字符串 (用于输出目录命名)
pub fn gen_time_string(delimiter: &str) -> String {
    let fmt = ["%Y", "%m", "%d", "%H", "%M", "%S", "%3f"].join(delimiter);
    chrono::Local::now().format(&fmt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_string_fields() {
        let s = gen_time_string("-");
        assert_eq!(s.split('-').count(), 7);
        assert_eq!(s.split('-').next().map(str::len), Some(4));
    }
}
