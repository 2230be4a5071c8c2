// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 模板窗口截取
/// ROI crop resampled to the template size (bilinear, edge pixels replicated)
use image::{Rgb, RgbImage};

use crate::detection::types::BBox;

/// 目标像素 → 源图坐标的映射 (像素中心对齐, 与 cv::resize 一致)
#[derive(Debug, Clone, Copy, PartialEq)]
struct RoiSampler {
    step_x: f32,
    step_y: f32,
    origin_x: f32,
    origin_y: f32,
}

impl RoiSampler {
    fn new(roi: &BBox, dst_width: u32, dst_height: u32) -> Self {
        let step_x = roi.width.max(1e-3) / dst_width.max(1) as f32;
        let step_y = roi.height.max(1e-3) / dst_height.max(1) as f32;
        Self {
            step_x,
            step_y,
            origin_x: roi.x + 0.5 * step_x - 0.5,
            origin_y: roi.y + 0.5 * step_y - 0.5,
        }
    }

    fn source(&self, dst_x: u32, dst_y: u32) -> (f32, f32) {
        (
            self.origin_x + dst_x as f32 * self.step_x,
            self.origin_y + dst_y as f32 * self.step_y,
        )
    }
}

/// 截取 ROI 并缩放到模板尺寸, 超出图像的部分复制边缘像素
pub fn subwindow(src: &RgbImage, roi: &BBox, dst_width: u32, dst_height: u32) -> RgbImage {
    if src.width() == 0 || src.height() == 0 {
        return RgbImage::new(dst_width, dst_height);
    }
    let sampler = RoiSampler::new(roi, dst_width, dst_height);
    RgbImage::from_fn(dst_width, dst_height, |x, y| {
        let (sx, sy) = sampler.source(x, y);
        sample_bilinear(src, sx, sy)
    })
}

fn sample_bilinear(src: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);

    let p00 = clamped(src, x0, y0);
    let p10 = clamped(src, x0 + 1, y0);
    let p01 = clamped(src, x0, y0 + 1);
    let p11 = clamped(src, x0 + 1, y0 + 1);

    Rgb(std::array::from_fn(|c| {
        let top = p00[c] as f32 + (p10[c] as f32 - p00[c] as f32) * fx;
        let bottom = p01[c] as f32 + (p11[c] as f32 - p01[c] as f32) * fx;
        (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u8
    }))
}

/// 坐标截断到图像内 (边缘复制)
fn clamped(src: &RgbImage, x: i64, y: i64) -> Rgb<u8> {
    let x = x.clamp(0, src.width() as i64 - 1) as u32;
    let y = y.clamp(0, src.height() as i64 - 1) as u32;
    *src.get_pixel(x, y)
}
