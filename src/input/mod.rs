// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 帧输入系统 (Frame Input)
///
/// - ImageSequence: 图片目录, 按文件名顺序读取
/// - spawn_reader:  独立读帧线程 + 有界通道
pub mod reader;
pub mod sequence;

pub use reader::spawn_reader;
pub use sequence::ImageSequence;
