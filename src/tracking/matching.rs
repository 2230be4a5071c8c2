// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 代价矩阵与贪心匹配
//! Cost matrix construction and greedy assignment

use ndarray::Array2;

use super::state::TrackState;
use super::track::Track;
use crate::config::TrackerConfig;
use crate::detection::types::BBox;

/// 外观相似度: exp(-|a - b|^2 / (2 sigma^2)), 维度不一致时为 0
pub fn appearance_score(a: &[f32], b: &[f32], sigma: f32) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dist2: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    (-dist2 / (2.0 * sigma * sigma)).exp()
}

/// 单个 (轨迹, 检测) 的关联代价, 取值 [0, 1]
///
/// RUNNING: IoU 与外观加权; LOST: 只看外观; READY: 1.0
pub fn association_cost(track: &Track, bbox: &BBox, descriptor: &[f32], config: &TrackerConfig) -> f32 {
    let cost = match track.state {
        TrackState::Running { .. } => {
            let mut iou = track.bbox.iou(bbox);
            if iou > config.good_iou {
                iou = 1.0;
            }
            let app = appearance_score(track.descriptor(), descriptor, config.appearance_sigma);
            config.running_iou_weight * (1.0 - iou) + config.running_appearance_weight * (1.0 - app)
        }
        TrackState::Lost { .. } => {
            let app = appearance_score(track.descriptor(), descriptor, config.appearance_sigma);
            config.lost_appearance_weight * (1.0 - app)
        }
        TrackState::Ready => 1.0,
    };
    cost.clamp(0.0, 1.0)
}

/// 代价矩阵 (轨迹槽位 × 检测), 每个检测周期重建
pub fn cost_matrix(
    tracks: &[Track],
    boxes: &[BBox],
    descriptors: &[Vec<f32>],
    config: &TrackerConfig,
) -> Array2<f32> {
    let mut cost = Array2::from_elem((tracks.len(), boxes.len()), 1.0f32);
    for (row, track) in tracks.iter().enumerate() {
        if !track.state.is_active() {
            continue;
        }
        for (col, (bbox, descriptor)) in boxes.iter().zip(descriptors).enumerate() {
            cost[[row, col]] = association_cost(track, bbox, descriptor, config);
        }
    }
    cost
}

/// 贪心匹配: 每次取全局最小的可接受代价, 行列各用一次
///
/// 返回每个检测匹配到的行 (轨迹槽位)
pub fn greedy_match(cost: &Array2<f32>, eligible: &[bool], ceiling: f32) -> Vec<Option<usize>> {
    let (rows, cols) = cost.dim();

    let mut candidates = Vec::new();
    for row in 0..rows {
        if !eligible.get(row).copied().unwrap_or(false) {
            continue;
        }
        for col in 0..cols {
            let c = cost[[row, col]];
            if c < ceiling {
                candidates.push((c, row, col));
            }
        }
    }

    // 按代价排序 (稳定排序, 相同代价保持行优先顺序)
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut assignment = vec![None; cols];
    let mut used_row = vec![false; rows];
    for (_, row, col) in candidates {
        if !used_row[row] && assignment[col].is_none() {
            assignment[col] = Some(row);
            used_row[row] = true;
        }
    }
    assignment
}
