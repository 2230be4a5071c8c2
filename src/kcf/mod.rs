// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 核相关滤波外观模型 (KCF + fHOG + Lab)
//! Correlation-filter appearance model used by every track
pub mod color; // Lab 颜色聚类特征
pub mod features; // 模板几何与特征提取
pub mod fft; // 二维 FFT
pub mod fhog; // fHOG 特征
pub mod tracker; // KCF 跟踪器

pub use features::{FeatureExtractor, FeatureMap, TemplateGeometry};
pub use tracker::{ConfidenceGate, FilterUpdate, KcfTracker};
