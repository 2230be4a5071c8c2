// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 检测-轨迹关联引擎
//! Detection-to-track association over a bounded pool
//!
//! 每个检测周期:
//! 1. 计算检测框的外观描述子 (与跟踪器相同的特征流程)
//! 2. 构建代价矩阵 (槽位 × 检测), 贪心匹配
//! 3. 匹配且代价低的 RUNNING 轨迹直接更新, 其余匹配的轨迹在检测框处重启
//! 4. 未匹配的检测新建轨迹 (必要时淘汰质量分最低的槽位)
//! 5. 未匹配的活跃轨迹进入/推进 LOST 状态
//!
//! 非检测帧只对 RUNNING 轨迹运行滤波器。

use tracing::{debug, trace};

use super::matching::{cost_matrix, greedy_match};
use super::pool::TrackPool;
use super::tracker::TrackedObject;
use crate::config::{KcfConfig, KcfParams, MotConfig, TrackerConfig};
use crate::detection::types::{BBox, Detection, Frame};
use crate::error::Result;
use crate::kcf::FeatureExtractor;

/// 关联引擎 (独占轨迹池)
pub struct Associator {
    config: TrackerConfig,
    kcf_config: KcfConfig,
    params: KcfParams,
    extractor: FeatureExtractor,
    pool: TrackPool,
    next_id: u32,
}

impl Associator {
    pub fn new(config: &MotConfig) -> Result<Self> {
        config.validate()?;
        let params = config.filter.resolve();
        Ok(Self {
            config: config.tracker.clone(),
            kcf_config: config.filter.clone(),
            extractor: FeatureExtractor::new(params.clone()),
            params,
            pool: TrackPool::new(
                config.tracker.capacity,
                &config.filter,
                config.tracker.trajectory_len,
            ),
            next_id: 1,
        })
    }

    /// 处理一帧; `detections` 为 None 表示本帧不是检测周期
    pub fn tick(&mut self, frame: &Frame, detections: Option<&[Detection]>) {
        match detections {
            Some(detections) => self.associate(frame, detections),
            None => self.step_running(frame),
        }
    }

    /// RUNNING 轨迹的当前框
    pub fn tracked_boxes(&self) -> Vec<BBox> {
        self.pool.tracked_boxes()
    }

    /// 已确认的 RUNNING 轨迹
    pub fn tracked_objects(&self) -> Vec<TrackedObject> {
        self.pool.tracked_objects()
    }

    pub fn pool(&self) -> &TrackPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut TrackPool {
        &mut self.pool
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    /// 已分配过的ID数量
    pub fn total_ids(&self) -> u32 {
        self.next_id - 1
    }

    fn step_running(&mut self, frame: &Frame) {
        let bonus = self.config.accepted_bonus;
        for track in self.pool.iter_mut().filter(|t| t.state.is_running()) {
            track.step(frame, bonus);
        }
    }

    fn associate(&mut self, frame: &Frame, detections: &[Detection]) {
        let boxes: Vec<BBox> = detections.iter().map(|d| d.bbox).collect();
        let descriptors: Vec<Vec<f32>> = boxes
            .iter()
            .map(|b| self.extractor.descriptor(frame, b))
            .collect();

        // 代价只依赖上一帧的轨迹状态
        let cost = cost_matrix(self.pool.tracks(), &boxes, &descriptors, &self.config);
        let eligible: Vec<bool> = self
            .pool
            .tracks()
            .iter()
            .map(|t| t.state.is_active())
            .collect();
        let assignment = greedy_match(&cost, &eligible, self.config.max_admissible_cost);

        let capacity = self.pool.capacity();
        let mut claimed = vec![false; capacity];
        let confirmations = self.config.confirmations;
        let bonus = self.config.accepted_bonus;

        // 1. 匹配成功
        for (det_idx, slot) in assignment.iter().enumerate() {
            let Some(slot) = *slot else { continue };
            claimed[slot] = true;
            let c = cost[[slot, det_idx]];
            let max_update_cost = self.config.max_update_cost;
            let params = &self.params;
            let Some(track) = self.pool.track_mut(slot) else {
                continue;
            };

            if track.state.is_running() && c < max_update_cost {
                trace!("🎯 跟踪 #{} 匹配检测 {} (代价 {:.3})", track.id, det_idx, c);
                track.state = track.state.on_match(confirmations);
                track.step(frame, bonus);
            } else {
                debug!(
                    "🔄 跟踪 #{} 在检测框处重启 (代价 {:.3}, {})",
                    track.id,
                    c,
                    track.state.label()
                );
                track.restart(frame, boxes[det_idx], params, confirmations);
            }
        }

        // 2. 未匹配的检测 → 新建
        for (det_idx, slot) in assignment.iter().enumerate() {
            if slot.is_some() {
                continue;
            }
            let slot = self.pool.claim_slot(&claimed);
            claimed[slot] = true;
            self.spawn(slot, frame, boxes[det_idx]);
        }

        // 3. 未匹配的轨迹 → LOST / READY
        let lost_substates = self.config.lost_substates;
        for track in self.pool.iter_mut() {
            if !claimed[track.slot] && track.state.is_active() {
                track.miss(lost_substates);
            }
        }
    }

    fn spawn(&mut self, slot: usize, frame: &Frame, bbox: BBox) {
        let id = self.next_id;
        self.next_id += 1;
        let confirmations = self.config.confirmations;
        let (params, kcf_config) = (&self.params, &self.kcf_config);
        let Some(track) = self.pool.track_mut(slot) else {
            return;
        };

        if track.state.is_active() {
            debug!(
                "♻️  淘汰跟踪 #{} (槽位 {}, 质量分 {:.2})",
                track.id, slot, track.score
            );
        }
        track.spawn(id, frame, bbox, params, kcf_config, confirmations);
        debug!(
            "🆕 新建跟踪 #{} (槽位 {}) @ ({:.0}, {:.0}, {:.0}x{:.0})",
            id, slot, bbox.x, bbox.y, bbox.width, bbox.height
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::state::TrackState;
    use image::{Rgb, RgbImage};

    /// 背景上放若干个不同颜色的矩形
    fn scene(objects: &[(u32, u32, [u8; 3])]) -> Frame {
        let mut frame = RgbImage::from_pixel(240, 160, Rgb([40, 40, 40]));
        for &(ox, oy, color) in objects {
            for y in oy..oy + 30 {
                for x in ox..ox + 20 {
                    let c = if (y - oy) < 15 { color } else { [color[2], color[0], color[1]] };
                    frame.put_pixel(x, y, Rgb(c));
                }
            }
        }
        frame
    }

    fn det(x: u32, y: u32) -> Detection {
        Detection::new(BBox::new(x as f32, y as f32, 20.0, 30.0))
    }

    fn config(capacity: usize) -> MotConfig {
        let mut config = MotConfig::default();
        config.tracker.capacity = capacity;
        config
    }

    #[test]
    fn test_k_plus_one_detections_keep_k_active() {
        let mut associator = Associator::new(&config(2)).unwrap();
        let frame = scene(&[
            (10, 10, [200, 30, 30]),
            (100, 10, [30, 200, 30]),
            (180, 100, [30, 30, 200]),
        ]);
        associator.tick(&frame, Some(&[det(10, 10), det(100, 10), det(180, 100)]));
        assert_eq!(associator.active_count(), 2);
        assert_eq!(associator.total_ids(), 3);
    }

    #[test]
    fn test_eviction_picks_lowest_score() {
        let mut cfg = config(2);
        // IoU 为 0 的 RUNNING 轨迹代价至少 0.6, 保证新目标不被匹配
        cfg.tracker.max_admissible_cost = 0.55;
        let mut associator = Associator::new(&cfg).unwrap();

        let frame = scene(&[(10, 10, [200, 30, 30]), (100, 10, [30, 200, 30])]);
        associator.tick(&frame, Some(&[det(10, 10), det(100, 10)]));
        assert_eq!(associator.active_count(), 2);

        associator.pool_mut().track_mut(0).unwrap().score = 5.0;
        associator.pool_mut().track_mut(1).unwrap().score = 1.0;

        let frame = scene(&[(180, 100, [30, 30, 200])]);
        associator.tick(&frame, Some(&[det(180, 100)]));

        let pool = associator.pool();
        assert_eq!(pool.active_count(), 2);
        assert_eq!(pool.track(0).unwrap().id, 1);
        assert!(pool.track(0).unwrap().state.is_lost());
        assert_eq!(pool.track(1).unwrap().id, 3);
        assert!(pool.track(1).unwrap().state.is_running());
    }

    #[test]
    fn test_lost_for_m_cycles_returns_to_ready() {
        let mut associator = Associator::new(&config(2)).unwrap();
        let frame = scene(&[(60, 40, [220, 120, 20])]);
        associator.tick(&frame, Some(&[det(60, 40)]));
        assert_eq!(associator.active_count(), 1);

        for cycle in 0..3 {
            assert_eq!(associator.active_count(), 1, "cycle {}", cycle);
            associator.tick(&frame, Some(&[]));
        }
        assert_eq!(associator.active_count(), 0);
        assert!(associator.tracked_boxes().is_empty());
    }

    #[test]
    fn test_rematch_while_lost_resumes_running() {
        let mut associator = Associator::new(&config(2)).unwrap();
        let frame = scene(&[(60, 40, [220, 120, 20])]);
        associator.tick(&frame, Some(&[det(60, 40)]));
        associator.tick(&frame, Some(&[]));
        associator.tick(&frame, Some(&[]));

        let track = associator.pool().track(0).unwrap();
        assert_eq!(track.state, TrackState::Lost { ticks_left: 1 });

        associator.tick(&frame, Some(&[det(60, 40)]));
        let track = associator.pool().track(0).unwrap();
        assert!(track.state.is_running());
        assert_eq!(track.id, 1);
        assert_eq!(associator.total_ids(), 1);
    }

    #[test]
    fn test_tracking_only_frames_update_running() {
        let mut associator = Associator::new(&config(2)).unwrap();
        associator.tick(&scene(&[(60, 40, [220, 120, 20])]), Some(&[det(60, 40)]));

        let moved = scene(&[(63, 40, [220, 120, 20])]);
        associator.tick(&moved, None);

        let boxes = associator.tracked_boxes();
        assert_eq!(boxes.len(), 1);
        assert!(boxes[0].iou(&BBox::new(63.0, 40.0, 20.0, 30.0)) > 0.6);
        assert!(associator.tracked_objects()[0].peak > 0.0);
    }

    #[test]
    fn test_new_track_reported_after_confirmations() {
        let mut cfg = config(2);
        cfg.tracker.confirmations = 2;
        let mut associator = Associator::new(&cfg).unwrap();
        let frame = scene(&[(60, 40, [220, 120, 20])]);

        associator.tick(&frame, Some(&[det(60, 40)]));
        assert_eq!(associator.tracked_boxes().len(), 1);
        assert!(associator.tracked_objects().is_empty());

        associator.tick(&frame, Some(&[det(60, 40)]));
        assert!(associator.tracked_objects().is_empty());

        associator.tick(&frame, Some(&[det(60, 40)]));
        let objects = associator.tracked_objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id, 1);
        assert!(objects[0].state.is_confirmed());
    }

    #[test]
    fn test_matched_detection_keeps_identity() {
        let mut associator = Associator::new(&config(4)).unwrap();
        associator.tick(&scene(&[(60, 40, [220, 120, 20])]), Some(&[det(60, 40)]));

        let moved = scene(&[(64, 40, [220, 120, 20])]);
        associator.tick(&moved, Some(&[det(64, 40)]));
        assert_eq!(associator.active_count(), 1);
        assert_eq!(associator.total_ids(), 1);
    }
}
