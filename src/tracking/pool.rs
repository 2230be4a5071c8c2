// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 固定容量的轨迹池
//! Fixed-capacity track pool indexed by slot

use super::track::Track;
use super::tracker::TrackedObject;
use crate::config::KcfConfig;
use crate::detection::types::BBox;

/// 轨迹池 (槽位数量在创建时固定)
#[derive(Clone)]
pub struct TrackPool {
    tracks: Vec<Track>,
}

impl TrackPool {
    pub fn new(capacity: usize, config: &KcfConfig, trajectory_len: usize) -> Self {
        Self {
            tracks: (0..capacity)
                .map(|slot| Track::ready(slot, config, trajectory_len))
                .collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, slot: usize) -> Option<&Track> {
        self.tracks.get(slot)
    }

    pub fn track_mut(&mut self, slot: usize) -> Option<&mut Track> {
        self.tracks.get_mut(slot)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.iter_mut()
    }

    /// RUNNING + LOST
    pub fn active_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.state.is_active()).count()
    }

    /// 为新轨迹选择槽位
    ///
    /// 优先使用空闲槽位; 池满时淘汰质量分最低的槽位 (不论状态)。
    /// `protected` 标记本周期已占用的槽位, 只要还有未保护的槽位就不会选中它们。
    pub fn claim_slot(&self, protected: &[bool]) -> usize {
        let is_protected = |t: &&Track| protected.get(t.slot).copied().unwrap_or(false);

        if let Some(track) = self
            .tracks
            .iter()
            .find(|t| t.state.is_ready() && !is_protected(t))
        {
            return track.slot;
        }

        let lowest = |tracks: Vec<&Track>| {
            tracks
                .into_iter()
                .min_by(|a, b| a.score.total_cmp(&b.score))
                .map(|t| t.slot)
        };

        lowest(self.tracks.iter().filter(|t| !is_protected(t)).collect())
            .or_else(|| lowest(self.tracks.iter().collect()))
            .unwrap_or(0)
    }

    /// RUNNING 轨迹的框 (供渲染和背景掩膜使用)
    pub fn tracked_boxes(&self) -> Vec<BBox> {
        self.tracks
            .iter()
            .filter(|t| t.state.is_running())
            .map(|t| t.bbox)
            .collect()
    }

    /// 已确认的 RUNNING 轨迹的完整输出
    pub fn tracked_objects(&self) -> Vec<TrackedObject> {
        self.tracks
            .iter()
            .filter(|t| t.state.is_confirmed())
            .map(|t| t.tracked_object())
            .collect()
    }
}
