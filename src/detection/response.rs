// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 二值响应图处理: 差分, 滞后阈值, 形态学, 轮廓外接框
//! Binary response helpers shared by the motion detector

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use super::types::BBox;

/// 前景像素值
pub const FOREGROUND: u8 = 255;

/// 逐像素 |a - b|
pub fn absdiff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (w, h) = a.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let pa = a.get_pixel(x, y)[0];
        let pb = b.get_pixel(x, y)[0];
        Luma([pa.abs_diff(pb)])
    })
}

/// 二值化 (严格大于阈值为前景)
pub fn binarize(diff: &GrayImage, level: u8) -> GrayImage {
    threshold(diff, level, ThresholdType::Binary)
}

/// 逐像素或
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    combine(a, b, |pa, pb| pa > 0 || pb > 0)
}

/// 逐像素与
pub fn intersection(a: &GrayImage, b: &GrayImage) -> GrayImage {
    combine(a, b, |pa, pb| pa > 0 && pb > 0)
}

fn combine(a: &GrayImage, b: &GrayImage, op: impl Fn(u8, u8) -> bool) -> GrayImage {
    let (w, h) = a.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let on = op(a.get_pixel(x, y)[0], b.get_pixel(x, y)[0]);
        Luma([if on { FOREGROUND } else { 0 }])
    })
}

/// 双阈值滞后
///
/// 高于 `high` 的像素直接保留; 高于 `low` 的像素只有在以它为中心的
/// `kernel` (宽, 高) 邻域内存在高阈值像素时才保留。
/// 横向偏长的核用于连接水平方向上断裂的目标, 同时避免纵向粘连。
pub fn hysteresis(diff: &GrayImage, low: u8, high: u8, kernel: (u32, u32)) -> GrayImage {
    let (w, h) = diff.dimensions();
    let (width, height) = (w as usize, h as usize);
    let dx = (kernel.0.saturating_sub(1) / 2) as usize;
    let dy = (kernel.1.saturating_sub(1) / 2) as usize;

    // 每行高阈值像素的前缀和, 邻域查询 O(kernel 高度)
    let stride = width + 1;
    let mut prefix = vec![0u32; stride * height];
    for y in 0..height {
        let row = y * stride;
        for x in 0..width {
            let strong = diff.get_pixel(x as u32, y as u32)[0] > high;
            prefix[row + x + 1] = prefix[row + x] + strong as u32;
        }
    }

    let mut out = GrayImage::new(w, h);
    for y in 0..height {
        for x in 0..width {
            let v = diff.get_pixel(x as u32, y as u32)[0];
            if v <= low {
                continue;
            }
            let keep = v > high || {
                let x_from = x.saturating_sub(dx);
                let x_to = (x + dx).min(width - 1);
                let y_from = y.saturating_sub(dy);
                let y_to = (y + dy).min(height - 1);
                (y_from..=y_to).any(|ky| {
                    let row = ky * stride;
                    prefix[row + x_to + 1] > prefix[row + x_from]
                })
            };
            if keep {
                out.put_pixel(x as u32, y as u32, Luma([FOREGROUND]));
            }
        }
    }
    out
}

/// 方形结构元素的形态学组合: 闭 → 开 → 膨胀 (半径 0 表示跳过)
pub fn morphology(mask: &GrayImage, close: u8, open: u8, dilate: u8) -> GrayImage {
    let mut out = mask.clone();
    if close > 0 {
        out = morphology::close(&out, Norm::LInf, close);
    }
    if open > 0 {
        out = morphology::open(&out, Norm::LInf, open);
    }
    if dilate > 0 {
        out = morphology::dilate(&out, Norm::LInf, dilate);
    }
    out
}

/// 膨胀 (半径 0 时原样返回)
pub fn dilate(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    morphology::dilate(mask, Norm::LInf, radius)
}

/// 外轮廓的外接矩形, 按尺寸过滤
///
/// 宽高都必须严格大于下限, 面积不小于 `min_area`。
pub fn extract_boxes(mask: &GrayImage, min_width: u32, min_height: u32, min_area: u32) -> Vec<BBox> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|contour| {
            let first = contour.points.first()?;
            let (mut x1, mut y1, mut x2, mut y2) = (first.x, first.y, first.x, first.y);
            for p in &contour.points {
                x1 = x1.min(p.x);
                y1 = y1.min(p.y);
                x2 = x2.max(p.x);
                y2 = y2.max(p.y);
            }
            let (bw, bh) = ((x2 - x1 + 1) as u32, (y2 - y1 + 1) as u32);
            (bw > min_width && bh > min_height && bw * bh >= min_area)
                .then(|| BBox::new(x1 as f32, y1 as f32, bw as f32, bh as f32))
        })
        .collect()
}
