// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 跟踪流水线 (Tracking Pipeline)
///
/// 单线程逐帧执行:
/// - MotionDetector: 周期性运动检测
/// - Associator:     检测-轨迹关联 + KCF 跟踪
/// - 反馈:           RUNNING 跟踪框 (含未确认的) 回传给检测器, 背景更新时排除
use std::time::Instant;

use tracing::info;

use crate::config::MotConfig;
use crate::detection::types::{Detection, Frame};
use crate::detection::MotionDetector;
use crate::error::Result;
use crate::tracking::{Associator, TrackedObject};

// ========== 输出数据结构 ==========

/// 单帧处理结果
#[derive(Clone, Debug)]
pub struct FrameResult {
    /// 帧序号 (第一帧为 0)
    pub frame_index: u64,

    /// 检测周期的检测结果, 非检测帧为 None
    pub detections: Option<Vec<Detection>>,

    /// 已确认的 RUNNING 轨迹
    pub tracked: Vec<TrackedObject>,

    pub detect_ms: f64,
    pub track_ms: f64,
}

/// 吞吐统计
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineStats {
    pub frames: u64,
    pub fps: f64,
    pub detect_ms: f64,
    pub track_ms: f64,
}

/// 检测器 + 关联引擎
pub struct MotPipeline {
    detector: MotionDetector,
    associator: Associator,

    // 统计
    count: u64,
    last: Instant,
    stats: PipelineStats,
}

impl MotPipeline {
    /// 用第一帧初始化 (第一帧只用于检测器初始化)
    pub fn new(first_frame: &Frame, config: &MotConfig) -> Result<Self> {
        config.validate()?;
        let detector = MotionDetector::new(first_frame, &config.detector)?;
        let associator = Associator::new(config)?;
        info!("✅ 跟踪流水线就绪 ({} 个轨迹槽位)", config.tracker.capacity);

        Ok(Self {
            detector,
            associator,
            count: 0,
            last: Instant::now(),
            stats: PipelineStats::default(),
        })
    }

    /// 处理一帧: 检测 → 关联/跟踪 → 跟踪框反馈
    pub fn process(&mut self, frame: &Frame) -> Result<FrameResult> {
        let start = Instant::now();
        let cycle = self.detector.tick(frame)?;
        let detections = cycle.then(|| self.detector.detections().to_vec());
        let detect_ms = start.elapsed().as_secs_f64() * 1000.0;

        let start = Instant::now();
        self.associator.tick(frame, detections.as_deref());
        let tracked = self.associator.tracked_objects();
        self.detector.set_tracked_boxes(&self.associator.tracked_boxes());
        let track_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.record(detect_ms, track_ms, tracked.len());

        Ok(FrameResult {
            frame_index: self.detector.frame_index(),
            detections,
            tracked,
            detect_ms,
            track_ms,
        })
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn detector(&self) -> &MotionDetector {
        &self.detector
    }

    pub fn associator(&self) -> &Associator {
        &self.associator
    }

    /// 每秒统计一次FPS
    fn record(&mut self, detect_ms: f64, track_ms: f64, active: usize) {
        self.count += 1;
        self.stats.frames += 1;
        self.stats.detect_ms = detect_ms;
        self.stats.track_ms = track_ms;

        let elapsed = self.last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            self.stats.fps = self.count as f64 / elapsed;
            self.count = 0;
            self.last = Instant::now();
            info!(
                "📊 FPS: {:.1} | 检测 {:.1}ms | 跟踪 {:.1}ms | 跟踪目标 {} | 累计ID {}",
                self.stats.fps,
                detect_ms,
                track_ms,
                active,
                self.associator.total_ids()
            );
        }
    }
}
