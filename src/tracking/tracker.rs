// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 多目标跟踪公共组件
//! Common components for multi-object tracking output

use super::state::TrackState;
use crate::detection::types::BBox;

// ========== 公共数据结构 ==========

/// 跟踪点 (用于绘制轨迹)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackPoint {
    pub x: f32,
    pub y: f32,
}

/// 跟踪对象 (对外输出的统一跟踪结果)
#[derive(Clone, Debug)]
pub struct TrackedObject {
    /// 唯一跟踪ID
    pub id: u32,

    /// 所在槽位
    pub slot: usize,

    /// 当前边界框
    pub bbox: BBox,

    /// 生命周期状态
    pub state: TrackState,

    /// 历史轨迹 (中心点)
    pub trajectory: Vec<TrackPoint>,

    /// 最近一次响应峰值
    pub peak: f32,

    /// 最近一次 APCE
    pub apce: f32,

    /// 最近一次更新是否被接受
    pub accepted: bool,

    /// 显示颜色 (每个ID不同颜色)
    pub color: (u8, u8, u8),

    /// 总共被跟踪的帧数 (age)
    pub total_frames: u32,
}

/// 追加轨迹点, 超过上限时丢弃最旧的
pub fn push_trajectory(trajectory: &mut Vec<TrackPoint>, bbox: &BBox, max_len: usize) {
    let (x, y) = bbox.center();
    trajectory.push(TrackPoint { x, y });
    if trajectory.len() > max_len {
        let excess = trajectory.len() - max_len;
        trajectory.drain(..excess);
    }
}

/// 根据ID生成不同颜色
pub fn id_to_color(id: u32) -> (u8, u8, u8) {
    let hue = (id as f32 * 137.508) % 360.0; // 黄金角度采样
    hsv_to_rgb(hue, 0.8, 0.9)
}

/// HSV转RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
