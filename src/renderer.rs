// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 结果绘制 (离线输出用)
//! Draws detections, tracks and trajectories onto a frame copy

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::detection::types::{BBox, Detection, Frame};
use crate::pipeline::FrameResult;
use crate::tracking::TrackedObject;

/// 检测框颜色 (蓝)
const DETECTION_COLOR: Rgb<u8> = Rgb([40, 90, 255]);

/// 绘制选项
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    pub show_detections: bool,
    pub show_trajectories: bool,
    pub thickness: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_detections: true,
            show_trajectories: true,
            thickness: 2,
        }
    }
}

/// 在帧副本上绘制一帧的处理结果
pub fn annotate(frame: &Frame, result: &FrameResult, options: &RenderOptions) -> RgbImage {
    let mut canvas = frame.clone();

    if options.show_detections {
        if let Some(detections) = &result.detections {
            draw_detections(&mut canvas, detections, options.thickness);
        }
    }

    for track in &result.tracked {
        draw_track(&mut canvas, track, options);
    }
    canvas
}

/// 绘制检测框 (带运动方向短线)
pub fn draw_detections(canvas: &mut RgbImage, detections: &[Detection], thickness: u32) {
    for det in detections {
        draw_box(canvas, &det.bbox, DETECTION_COLOR, thickness);
        if let Some((dx, dy)) = det.direction() {
            let (cx, cy) = det.bbox.center();
            let len = det.bbox.width.min(det.bbox.height) * 0.5;
            draw_line_segment_mut(canvas, (cx, cy), (cx + dx * len, cy + dy * len), DETECTION_COLOR);
        }
    }
}

/// 绘制跟踪框与轨迹 (每个ID一种颜色)
pub fn draw_track(canvas: &mut RgbImage, track: &TrackedObject, options: &RenderOptions) {
    let (r, g, b) = track.color;
    let color = Rgb([r, g, b]);
    draw_box(canvas, &track.bbox, color, options.thickness);

    if options.show_trajectories {
        for pair in track.trajectory.windows(2) {
            draw_line_segment_mut(canvas, (pair[0].x, pair[0].y), (pair[1].x, pair[1].y), color);
        }
        if let Some(last) = track.trajectory.last() {
            draw_filled_circle_mut(canvas, (last.x as i32, last.y as i32), 2, color);
        }
    }
}

/// 空心矩形, 多次绘制实现线宽
fn draw_box(canvas: &mut RgbImage, bbox: &BBox, color: Rgb<u8>, thickness: u32) {
    let (w, h) = (bbox.width.round() as i32, bbox.height.round() as i32);
    if w <= 0 || h <= 0 {
        return;
    }
    let (x, y) = (bbox.x.round() as i32, bbox.y.round() as i32);
    for offset in 0..thickness.max(1) as i32 {
        let rect = Rect::at(x - offset, y - offset)
            .of_size((w + offset * 2) as u32, (h + offset * 2) as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}
