// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 运动检测器 (Motion Detector)
//! 职责: 灰度帧 → 帧差/背景差响应 → 形态学 → 外接框 → Detection
//!
//! 背景未就绪时只用两帧差分 (滞后阈值); 背景就绪后使用背景差分,
//! 并与膨胀后的运动响应求交, 抑制静止噪声和鬼影。
//! 背景模型每帧都更新, 目标区域 (检测框 + 外部跟踪框) 不参与更新。

use image::GrayImage;
use imageproc::filter::median_filter;
use tracing::{debug, info, trace};

use super::background::BackgroundModel;
use super::response::{
    absdiff, binarize, dilate, extract_boxes, hysteresis, intersection, morphology, union,
};
use super::types::{to_gray, BBox, Detection, Frame};
use crate::config::DetectorConfig;
use crate::error::{MotError, Result};
use crate::utils::ring::FrameRing;

/// 保存的模糊帧数量 (当前帧 + 两帧历史)
const FRAME_HISTORY: usize = 3;

pub struct MotionDetector {
    config: DetectorConfig,

    /// 帧计数 (第一帧为 0)
    clock: u64,

    /// 中值滤波后的灰度帧
    frames: FrameRing<GrayImage>,

    background: BackgroundModel,

    /// 最近一次检测周期的结果
    detections: Vec<Detection>,

    /// 外部跟踪框 (背景更新时排除)
    tracked: Vec<BBox>,

    frame_size: (u32, u32),
}

impl MotionDetector {
    /// 用第一帧初始化 (第一帧不产生检测)
    pub fn new(first_frame: &Frame, config: &DetectorConfig) -> Result<Self> {
        if config.detection_interval < 2 {
            return Err(MotError::config(format!(
                "detection_interval 必须 >= 2, 当前 {}",
                config.detection_interval
            )));
        }
        if config.median_kernel % 2 == 0 {
            return Err(MotError::config("median_kernel 必须为奇数"));
        }

        let gray = to_gray(first_frame);
        let mut frames = FrameRing::new(FRAME_HISTORY);
        frames.push(blur(&gray, config.median_kernel));

        info!(
            "🔍 运动检测器启动: {}x{} | 检测周期 {} 帧 | 背景预热 {} 帧",
            gray.width(),
            gray.height(),
            config.detection_interval,
            config.warmup_frames
        );

        Ok(Self {
            config: config.clone(),
            clock: 0,
            frames,
            background: BackgroundModel::new(&gray, config),
            detections: Vec::new(),
            tracked: Vec::new(),
            frame_size: gray.dimensions(),
        })
    }

    /// 处理一帧, 检测周期返回 true (检测结果可能为空)
    pub fn tick(&mut self, frame: &Frame) -> Result<bool> {
        if frame.dimensions() != self.frame_size {
            return Err(MotError::FrameSize {
                expected: self.frame_size,
                actual: frame.dimensions(),
            });
        }

        let gray = to_gray(frame);
        self.frames.push(blur(&gray, self.config.median_kernel));
        self.clock += 1;

        let cycle = self.clock % self.config.detection_interval as u64 == 0;
        let cfg = &self.config;

        let (rects, mask_boxes) = if !self.background.is_initialized() {
            // 预热期: 每帧都做两帧差分, 用于背景更新时排除运动区域
            let rects = match self.frame_difference() {
                Some(diff) => {
                    let resp = hysteresis(
                        &diff,
                        cfg.fd_threshold,
                        cfg.fd_high_threshold,
                        cfg.hysteresis_kernel,
                    );
                    let resp = morphology(&resp, cfg.close_radius, cfg.open_radius, cfg.dilate_radius);
                    extract_boxes(&resp, cfg.min_width, cfg.min_height, cfg.min_area)
                }
                None => Vec::new(),
            };
            (cycle.then(|| rects.clone()), rects)
        } else if cycle {
            let rects = self.background_response(&gray);
            (Some(rects.clone()), rects)
        } else {
            (None, self.detections.iter().map(|d| d.bbox).collect())
        };

        let exclude: Vec<BBox> = mask_boxes.iter().chain(&self.tracked).copied().collect();
        let was_initialized = self.background.is_initialized();
        self.background.update(&gray, &exclude);
        if !was_initialized && self.background.is_initialized() {
            info!("✅ 背景模型就绪 (第 {} 帧)", self.clock);
        }

        let Some(rects) = rects else {
            return Ok(false);
        };

        self.detections = self.link_history(rects);
        debug!(
            "🔍 检测周期 #{}: {} 个目标",
            self.clock / self.config.detection_interval as u64,
            self.detections.len()
        );
        Ok(true)
    }

    /// 最近一次检测周期的结果
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// 设置当前跟踪框, 下一次背景更新时排除
    pub fn set_tracked_boxes(&mut self, boxes: &[BBox]) {
        self.tracked.clear();
        self.tracked.extend_from_slice(boxes);
    }

    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }

    pub fn frame_index(&self) -> u64 {
        self.clock
    }

    // ========== 响应计算 ==========

    /// 模糊帧差分 (三帧模式下与更早一帧的差分取并集)
    fn frame_difference(&self) -> Option<GrayImage> {
        let cur = self.frames.get(0)?;
        let prev = self.frames.get(1)?;
        let diff = absdiff(cur, prev);
        if !self.config.three_frame_diff {
            return Some(diff);
        }
        match self.frames.get(2) {
            Some(prev2) => {
                let older = absdiff(prev, prev2);
                Some(GrayImage::from_fn(diff.width(), diff.height(), |x, y| {
                    image::Luma([diff.get_pixel(x, y)[0].max(older.get_pixel(x, y)[0])])
                }))
            }
            None => Some(diff),
        }
    }

    /// 运动响应 (二值)
    fn motion_response(&self) -> Option<GrayImage> {
        let cur = self.frames.get(0)?;
        let prev = self.frames.get(1)?;
        let motion = binarize(&absdiff(cur, prev), self.config.fd_threshold);
        if !self.config.three_frame_diff {
            return Some(motion);
        }
        match self.frames.get(2) {
            Some(prev2) => {
                let older = binarize(&absdiff(prev, prev2), self.config.fd_threshold);
                Some(union(&motion, &older))
            }
            None => Some(motion),
        }
    }

    /// 背景差分响应 ∩ 运动支撑区域
    fn background_response(&self, gray: &GrayImage) -> Vec<BBox> {
        let cfg = &self.config;
        let bg_resp = hysteresis(
            &self.background.difference(gray),
            cfg.bg_low_threshold,
            cfg.bg_high_threshold,
            cfg.hysteresis_kernel,
        );

        let Some(motion) = self.motion_response() else {
            return Vec::new();
        };
        let support = dilate(
            &morphology(&motion, cfg.close_radius, 0, 0),
            cfg.motion_support_radius,
        );

        let resp = intersection(&bg_resp, &support);
        let resp = morphology(&resp, cfg.close_radius, cfg.open_radius, cfg.dilate_radius);
        extract_boxes(&resp, cfg.min_width, cfg.min_height, cfg.min_area)
    }

    /// 关联上一检测周期的最近目标, 继承其历史框
    fn link_history(&self, rects: Vec<BBox>) -> Vec<Detection> {
        let history_len = self.config.history_len;
        rects
            .into_iter()
            .map(|bbox| {
                let gate = bbox.width.max(bbox.height);
                let previous = self
                    .detections
                    .iter()
                    .map(|d| (d, d.bbox.center_distance(&bbox)))
                    .filter(|(_, dist)| *dist <= gate)
                    .min_by(|a, b| a.1.total_cmp(&b.1));

                let mut det = Detection::new(bbox);
                if let Some((prev, dist)) = previous {
                    trace!("↪️  检测框关联上一周期目标 (距离 {:.1})", dist);
                    det.history = prev.history.clone();
                    det.history.push(prev.bbox);
                    if det.history.len() > history_len {
                        let excess = det.history.len() - history_len;
                        det.history.drain(..excess);
                    }
                }
                det
            })
            .collect()
    }
}

/// 中值滤波 (核尺寸为奇数, 1 表示不滤波)
fn blur(gray: &GrayImage, kernel: u32) -> GrayImage {
    let radius = kernel / 2;
    if radius == 0 {
        return gray.clone();
    }
    median_filter(gray, radius, radius)
}
