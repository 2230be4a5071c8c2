// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 运动检测系统 (Motion Detection)
///
/// - types:      帧, 边界框, 检测结果
/// - background: 背景模型 (掩膜更新)
/// - response:   差分 / 滞后阈值 / 形态学 / 外接框
/// - detector:   周期性运动检测器
pub mod background;
pub mod detector;
pub mod response;
pub mod types;

pub use background::BackgroundModel;
pub use detector::MotionDetector;
pub use types::{BBox, Detection, Frame};
