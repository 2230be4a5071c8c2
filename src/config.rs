// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 跟踪系统配置 - 通过JSON文件调整参数
//! Tracking configuration loaded from a JSON file

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MotError, Result};

/// 完整配置 (检测 + 关联 + 相关滤波)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MotConfig {
    pub detector: DetectorConfig,
    pub tracker: TrackerConfig,
    pub filter: KcfConfig,
}

/// 运动/背景检测参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    // === 检测周期 ===
    pub detection_interval: u32, // 每隔多少帧运行一次检测 (>= 2)
    pub median_kernel: u32,      // 中值滤波核尺寸 (奇数)

    // === 帧差 ===
    pub fd_threshold: u8,       // 帧差阈值 (低阈值)
    pub fd_high_threshold: u8,  // 帧差滞后高阈值
    pub three_frame_diff: bool, // 三帧差分 (两次差分取并集)

    // === 背景差 ===
    pub bg_low_threshold: u8,          // 背景差低阈值
    pub bg_high_threshold: u8,         // 背景差高阈值
    pub hysteresis_kernel: (u32, u32), // 滞后邻域 (宽, 高)
    pub motion_support_radius: u8,     // 运动支撑区域膨胀半径

    // === 形态学 ===
    pub close_radius: u8,  // 闭运算半径 (4 => 9x9)
    pub open_radius: u8,   // 开运算半径 (0 关闭)
    pub dilate_radius: u8, // 膨胀半径 (0 关闭)

    // === 检测框过滤 ===
    pub min_width: u32,  // 最小宽度 (严格大于)
    pub min_height: u32, // 最小高度 (严格大于)
    pub min_area: u32,   // 最小面积

    // === 背景模型 ===
    pub warmup_frames: u32, // 背景预热帧数
    pub alpha_init: f32,    // 预热期融合率
    pub alpha: f32,         // 稳定期融合率
    pub mask_expand: f32,   // 排除框放大倍数

    pub history_len: usize, // 检测框历史长度
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            detection_interval: 5,
            median_kernel: 5,

            fd_threshold: 15,
            fd_high_threshold: 50,
            three_frame_diff: false,

            bg_low_threshold: 25,
            bg_high_threshold: 50,
            hysteresis_kernel: (9, 1),
            motion_support_radius: 8,

            close_radius: 4,
            open_radius: 0,
            dilate_radius: 0,

            min_width: 10,
            min_height: 20,
            min_area: 0,

            warmup_frames: 20,
            alpha_init: 0.8,
            alpha: 0.1,
            mask_expand: 1.2,

            history_len: 3,
        }
    }
}

/// 关联与生命周期参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // === 跟踪池 ===
    pub capacity: usize,    // 跟踪槽位数量
    pub lost_substates: u8, // 连续未匹配多少个检测周期后释放
    pub confirmations: u8,  // 新轨迹确认所需匹配次数

    // === 代价 ===
    pub running_iou_weight: f32,        // RUNNING: IoU 权重
    pub running_appearance_weight: f32, // RUNNING: 外观权重
    pub lost_appearance_weight: f32,    // LOST: 外观权重 (仅外观)
    pub good_iou: f32,                  // 超过该 IoU 视为完全重合
    pub appearance_sigma: f32,          // 外观高斯核带宽

    // === 匹配 ===
    pub max_admissible_cost: f32, // 可接受的最大匹配代价 (严格小于)
    pub max_update_cost: f32,     // 低于该代价直接更新, 否则重启滤波器

    pub accepted_bonus: f32,   // 更新被接受时的质量分奖励
    pub trajectory_len: usize, // 轨迹点数量
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            lost_substates: 3,
            confirmations: 0,

            running_iou_weight: 0.6,
            running_appearance_weight: 0.4,
            lost_appearance_weight: 1.0,
            good_iou: 0.7,
            appearance_sigma: 0.05,

            max_admissible_cost: 0.8,
            max_update_cost: 0.5,

            accepted_bonus: 1000.0,
            trajectory_len: 30,
        }
    }
}

/// KCF 相关滤波参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct KcfConfig {
    // === 特征开关 ===
    pub hog: bool,
    pub fixed_window: bool,
    pub multiscale: bool,
    pub lab: bool,

    // === 可选覆盖 (None 时按特征组合取经典值) ===
    pub interp_factor: Option<f32>,
    pub sigma: Option<f32>,
    pub output_sigma_factor: Option<f32>,

    pub lambda: f32,
    pub padding: f32,
    pub template_size: u32,
    pub scale_step: f32,
    pub scale_weight: f32,

    // === 置信度门控 (APCE) ===
    pub peak_ratio: f32, // beta_1
    pub apce_ratio: f32, // beta_2
    pub stats_rate: f32, // 均值更新率
}

impl Default for KcfConfig {
    fn default() -> Self {
        Self {
            hog: true,
            fixed_window: true,
            multiscale: true,
            lab: true,

            interp_factor: None,
            sigma: None,
            output_sigma_factor: None,

            lambda: 0.0001,
            padding: 2.5,
            template_size: 96,
            scale_step: 1.05,
            scale_weight: 0.95,

            peak_ratio: 0.5,
            apce_ratio: 0.5,
            stats_rate: 0.1,
        }
    }
}

/// 按特征组合解析后的滤波参数
#[derive(Clone, Debug, PartialEq)]
pub struct KcfParams {
    pub hog: bool,
    pub lab: bool,
    pub fixed_window: bool,
    pub multiscale: bool,
    pub interp_factor: f32,
    pub sigma: f32,
    pub output_sigma_factor: f32,
    pub lambda: f32,
    pub padding: f32,
    pub template_size: u32,
    pub cell_size: usize,
    pub scale_step: f32,
    pub scale_weight: f32,
}

impl KcfConfig {
    /// 解析实际使用的参数 (Lab 特征只能和 HOG 一起使用)
    pub fn resolve(&self) -> KcfParams {
        let lab = self.hog && self.lab;
        let (interp, sigma, osf, cell_size) = match (self.hog, lab) {
            (true, true) => (0.005, 0.4, 0.1, 4),
            (true, false) => (0.012, 0.6, 0.125, 4),
            _ => (0.075, 0.2, 0.125, 1),
        };

        KcfParams {
            hog: self.hog,
            lab,
            fixed_window: self.fixed_window,
            multiscale: self.multiscale,
            interp_factor: self.interp_factor.unwrap_or(interp),
            sigma: self.sigma.unwrap_or(sigma),
            output_sigma_factor: self.output_sigma_factor.unwrap_or(osf),
            lambda: self.lambda,
            padding: self.padding,
            template_size: self.template_size,
            cell_size,
            scale_step: if self.multiscale { self.scale_step } else { 1.0 },
            scale_weight: self.scale_weight,
        }
    }
}

impl MotConfig {
    /// 从JSON文件加载配置, 文件不存在时写入默认配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("📝 配置文件不存在,创建默认配置: {}", path.display());
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        info!("✅ 配置已从 {} 加载", path.display());
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        info!("💾 配置已保存到 {}", path.as_ref().display());
        Ok(())
    }

    /// 校验参数, 任何不合法值都是致命错误
    pub fn validate(&self) -> Result<()> {
        let d = &self.detector;
        if d.detection_interval < 2 {
            return Err(MotError::config(format!(
                "detection_interval 必须 >= 2, 当前 {}",
                d.detection_interval
            )));
        }
        if d.median_kernel == 0 || d.median_kernel % 2 == 0 {
            return Err(MotError::config("median_kernel 必须为正奇数"));
        }
        if d.fd_high_threshold < d.fd_threshold || d.bg_high_threshold < d.bg_low_threshold {
            return Err(MotError::config("滞后高阈值不能小于低阈值"));
        }
        if d.hysteresis_kernel.0 == 0 || d.hysteresis_kernel.1 == 0 {
            return Err(MotError::config("hysteresis_kernel 尺寸必须为正"));
        }
        if !(0.0..=1.0).contains(&d.alpha) || !(0.0..=1.0).contains(&d.alpha_init) {
            return Err(MotError::config("背景融合率必须在 [0, 1] 内"));
        }
        if d.mask_expand < 1.0 {
            return Err(MotError::config("mask_expand 必须 >= 1.0"));
        }

        let t = &self.tracker;
        if t.capacity == 0 {
            return Err(MotError::config("跟踪池容量必须 >= 1"));
        }
        if t.lost_substates == 0 {
            return Err(MotError::config("lost_substates 必须 >= 1"));
        }
        if t.appearance_sigma <= 0.0 {
            return Err(MotError::config("appearance_sigma 必须为正"));
        }

        let f = &self.filter;
        if f.template_size < 8 {
            return Err(MotError::config("template_size 过小"));
        }
        if f.padding < 1.0 {
            return Err(MotError::config("padding 必须 >= 1.0"));
        }
        if f.multiscale && f.scale_step <= 1.0 {
            return Err(MotError::config("scale_step 必须 > 1.0"));
        }
        if f.lab && !f.hog {
            warn!("⚠️  Lab 特征只能与 HOG 一起使用, 已忽略");
        }
        Ok(())
    }

    /// 打印当前配置
    pub fn log_summary(&self) {
        let p = self.filter.resolve();
        info!("🎛️  当前跟踪配置:");
        info!(
            "  检测周期: {} 帧 | 背景预热: {} 帧",
            self.detector.detection_interval, self.detector.warmup_frames
        );
        info!(
            "  跟踪池: {} 槽位 | LOST 容忍: {} 周期",
            self.tracker.capacity, self.tracker.lost_substates
        );
        info!(
            "  KCF: hog={} lab={} multiscale={} | lr={:.3} sigma={:.2}",
            p.hog, p.lab, p.multiscale, p.interp_factor, p.sigma
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MotConfig::default().validate().is_ok());
    }

    #[test]
    fn test_short_detection_interval_rejected() {
        let mut config = MotConfig::default();
        config.detector.detection_interval = 1;
        assert!(matches!(config.validate(), Err(MotError::Config(_))));
    }

    #[test]
    fn test_empty_pool_rejected() {
        let mut config = MotConfig::default();
        config.tracker.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_feature_defaults() {
        let mut cfg = KcfConfig::default();
        let p = cfg.resolve();
        assert!(p.hog && p.lab);
        assert_eq!(p.cell_size, 4);
        assert!((p.interp_factor - 0.005).abs() < 1e-6);

        cfg.hog = false;
        let p = cfg.resolve();
        assert!(!p.lab);
        assert_eq!(p.cell_size, 1);
        assert!((p.sigma - 0.2).abs() < 1e-6);

        cfg.sigma = Some(0.3);
        assert!((cfg.resolve().sigma - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "tracker": { "capacity": 4 } }"#;
        let config: MotConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.tracker.capacity, 4);
        assert_eq!(config.tracker.lost_substates, 3);
        assert_eq!(config.detector.detection_interval, 5);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = std::env::temp_dir().join(format!("kcf_mot_cfg_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mot.json");
        let _ = fs::remove_file(&path);

        let config = MotConfig::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.tracker.capacity, 20);

        let reloaded = MotConfig::load(&path).unwrap();
        assert_eq!(reloaded.detector.min_height, config.detector.min_height);
        fs::remove_dir_all(&dir).unwrap();
    }
}
