// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 单条轨迹: 生命周期状态 + KCF 外观模型 + 质量分
//! One slot of the track pool

use tracing::debug;

use super::state::TrackState;
use super::tracker::{id_to_color, push_trajectory, TrackPoint, TrackedObject};
use crate::config::{KcfConfig, KcfParams};
use crate::detection::types::{BBox, Frame};
use crate::kcf::{ConfidenceGate, FilterUpdate, KcfTracker};

/// 轨迹槽位
#[derive(Clone)]
pub struct Track {
    /// 槽位索引 (固定)
    pub slot: usize,

    /// 跟踪ID (每次新建分配一个新的)
    pub id: u32,

    pub state: TrackState,

    pub bbox: BBox,

    /// 外观模型, READY 槽位为空
    filter: Option<KcfTracker>,

    /// 外观描述子 (模板逐通道均值)
    descriptor: Vec<f32>,

    /// 置信度统计
    pub gate: ConfidenceGate,

    /// 质量分 (淘汰依据)
    pub score: f32,

    /// 最近一次更新
    pub last_update: Option<FilterUpdate>,

    pub trajectory: Vec<TrackPoint>,

    /// 轨迹点上限
    trajectory_len: usize,

    pub total_frames: u32,
}

impl Track {
    /// 空闲槽位
    pub fn ready(slot: usize, config: &KcfConfig, trajectory_len: usize) -> Self {
        Self {
            slot,
            id: 0,
            state: TrackState::Ready,
            bbox: BBox::default(),
            filter: None,
            descriptor: Vec::new(),
            gate: ConfidenceGate::new(config),
            score: 0.0,
            last_update: None,
            trajectory: Vec::new(),
            trajectory_len,
            total_frames: 0,
        }
    }

    /// 以新ID在该槽位新建轨迹 (统计量全部清零)
    pub fn spawn(
        &mut self,
        id: u32,
        frame: &Frame,
        bbox: BBox,
        params: &KcfParams,
        config: &KcfConfig,
        confirmations: u8,
    ) {
        self.id = id;
        self.state = TrackState::Ready;
        self.gate = ConfidenceGate::new(config);
        self.score = 0.0;
        self.last_update = None;
        self.trajectory.clear();
        self.total_frames = 0;
        self.restart(frame, bbox, params, confirmations);
    }

    /// 在检测框处重启滤波器 (保留ID和置信度统计)
    pub fn restart(&mut self, frame: &Frame, bbox: BBox, params: &KcfParams, confirmations: u8) {
        let filter = KcfTracker::init(params, bbox, frame);
        self.descriptor = filter.appearance();
        self.filter = Some(filter);
        self.bbox = bbox;
        self.state = self.state.on_restart(confirmations);
        self.record();
    }

    /// 用滤波器在新帧上更新位置
    pub fn step(&mut self, frame: &Frame, accepted_bonus: f32) {
        let Some(filter) = self.filter.as_mut() else {
            return;
        };

        let update = filter.update(frame, &mut self.gate);
        self.bbox = update.bbox;
        self.score = update.peak + update.apce + if update.accepted { accepted_bonus } else { 0.0 };
        if update.accepted {
            self.descriptor = filter.appearance();
        }
        self.last_update = Some(update);
        self.record();
    }

    /// 检测周期内未匹配
    pub fn miss(&mut self, lost_substates: u8) {
        let before = self.state;
        self.state = self.state.on_miss(lost_substates);
        if before.is_running() && self.state.is_lost() {
            debug!("⚠️  跟踪 #{} 丢失 (槽位 {})", self.id, self.slot);
        }
        if self.state.is_ready() {
            debug!("🗑️  跟踪 #{} 释放 (槽位 {})", self.id, self.slot);
            self.release();
        }
    }

    /// 释放槽位
    pub fn release(&mut self) {
        self.state = TrackState::Ready;
        self.filter = None;
        self.descriptor.clear();
        self.trajectory.clear();
    }

    pub fn descriptor(&self) -> &[f32] {
        &self.descriptor
    }

    /// 对外输出
    pub fn tracked_object(&self) -> TrackedObject {
        let (peak, apce, accepted) = self
            .last_update
            .map(|u| (u.peak, u.apce, u.accepted))
            .unwrap_or((0.0, 0.0, false));
        TrackedObject {
            id: self.id,
            slot: self.slot,
            bbox: self.bbox,
            state: self.state,
            trajectory: self.trajectory.clone(),
            peak,
            apce,
            accepted,
            color: id_to_color(self.id),
            total_frames: self.total_frames,
        }
    }

    fn record(&mut self) {
        self.total_frames += 1;
        push_trajectory(&mut self.trajectory, &self.bbox, self.trajectory_len);
    }
}
