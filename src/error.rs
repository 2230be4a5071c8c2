// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 错误类型
//! Error types for the tracking core

use std::path::PathBuf;

use thiserror::Error;

/// 跟踪库统一结果类型
pub type Result<T> = std::result::Result<T, MotError>;

/// 跟踪核心可能产生的错误
///
/// 跟踪质量下降 (响应峰值过低、匹配歧义) 不属于错误,
/// 只体现在置信度和生命周期状态上。
#[derive(Error, Debug)]
pub enum MotError {
    #[error("配置错误 (Configuration error): {0}")]
    Config(String),

    #[error("帧尺寸不一致: 期望 {expected:?}, 实际 {actual:?}")]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("图片序列为空: {0}")]
    EmptySequence(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MotError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
