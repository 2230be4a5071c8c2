// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 背景模型 (指数滑动平均, 目标区域不参与更新)
//! Running-average background with masked updates

use image::{GrayImage, Luma};
use ndarray::Array2;

use super::types::BBox;
use crate::config::DetectorConfig;

/// 灰度背景模型
#[derive(Clone, Debug)]
pub struct BackgroundModel {
    /// 背景估计 (行 × 列)
    model: Array2<f32>,

    /// 剩余预热次数, 0 表示已初始化
    warmup_left: u32,
    warmup_frames: u32,

    alpha_init: f32,
    alpha: f32,
    mask_expand: f32,
}

impl BackgroundModel {
    /// 用第一帧作为初始背景
    pub fn new(first: &GrayImage, config: &DetectorConfig) -> Self {
        let (w, h) = first.dimensions();
        let model = Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
            first.get_pixel(x as u32, y as u32)[0] as f32
        });
        Self {
            model,
            warmup_left: config.warmup_frames,
            warmup_frames: config.warmup_frames,
            alpha_init: config.alpha_init,
            alpha: config.alpha,
            mask_expand: config.mask_expand,
        }
    }

    /// 预热计数归零后才参与检测
    pub fn is_initialized(&self) -> bool {
        self.warmup_left == 0
    }

    /// 本次更新使用的融合率
    ///
    /// 预热期间从 `alpha_init` 线性衰减到 `alpha`, 之后固定为 `alpha`
    pub fn current_alpha(&self) -> f32 {
        if self.warmup_left == 0 || self.warmup_frames == 0 {
            return self.alpha;
        }
        let ratio = self.warmup_left as f32 / self.warmup_frames as f32;
        self.alpha + (self.alpha_init - self.alpha) * ratio
    }

    /// 融合新帧, `exclude` 中的框放大后不更新
    pub fn update(&mut self, gray: &GrayImage, exclude: &[BBox]) {
        let alpha = self.current_alpha();
        let (rows, cols) = self.model.dim();
        let mask = self.exclusion_mask(exclude, cols as u32, rows as u32);

        for ((y, x), bg) in self.model.indexed_iter_mut() {
            if mask[y * cols + x] {
                continue;
            }
            let v = gray.get_pixel(x as u32, y as u32)[0] as f32;
            *bg = (1.0 - alpha) * *bg + alpha * v;
        }

        self.warmup_left = self.warmup_left.saturating_sub(1);
    }

    /// |gray - background|
    pub fn difference(&self, gray: &GrayImage) -> GrayImage {
        let (w, h) = gray.dimensions();
        GrayImage::from_fn(w, h, |x, y| {
            let bg = self.model[[y as usize, x as usize]];
            let v = gray.get_pixel(x, y)[0] as f32;
            Luma([(v - bg).abs().round().min(255.0) as u8])
        })
    }

    /// 背景图像 (四舍五入到 u8)
    pub fn image(&self) -> GrayImage {
        let (rows, cols) = self.model.dim();
        GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
            Luma([self.model[[y as usize, x as usize]].round().clamp(0.0, 255.0) as u8])
        })
    }

    fn exclusion_mask(&self, boxes: &[BBox], width: u32, height: u32) -> Vec<bool> {
        let mut mask = vec![false; (width * height) as usize];
        for b in boxes {
            let r = b.expand(self.mask_expand).clip(width, height);
            if r.is_empty() {
                continue;
            }
            let (x1, y1) = (r.x.floor() as u32, r.y.floor() as u32);
            let x2 = (r.x2().ceil() as u32).min(width);
            let y2 = (r.y2().ceil() as u32).min(height);
            for y in y1..y2 {
                let row = (y * width) as usize;
                mask[row + x1 as usize..row + x2 as usize].fill(true);
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(warmup: u32) -> DetectorConfig {
        DetectorConfig {
            warmup_frames: warmup,
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn test_static_scene_converges() {
        let first = GrayImage::from_pixel(20, 10, Luma([0]));
        let scene = GrayImage::from_pixel(20, 10, Luma([120]));
        let mut bg = BackgroundModel::new(&first, &config(20));

        for _ in 0..120 {
            bg.update(&scene, &[]);
        }
        assert!(bg.is_initialized());
        assert!(bg.model.iter().all(|v| (v - 120.0).abs() < 0.5));
        assert_eq!(bg.difference(&scene).get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn test_unchanged_frame_is_fixed_point() {
        let first = GrayImage::from_fn(16, 16, |x, y| Luma([(x * 10 + y) as u8]));
        let mut bg = BackgroundModel::new(&first, &config(3));
        bg.update(&first, &[]);
        assert_eq!(bg.image(), first);
    }

    #[test]
    fn test_masked_region_untouched() {
        let first = GrayImage::from_pixel(40, 40, Luma([50]));
        let bright = GrayImage::from_pixel(40, 40, Luma([250]));
        let mut bg = BackgroundModel::new(&first, &config(0));

        bg.update(&bright, &[BBox::new(10.0, 10.0, 10.0, 10.0)]);
        let img = bg.image();
        assert_eq!(img.get_pixel(15, 15)[0], 50);
        // 1.2 倍放大后仍被排除
        assert_eq!(img.get_pixel(9, 15)[0], 50);
        assert!(img.get_pixel(30, 30)[0] > 50);
    }

    #[test]
    fn test_alpha_decays_during_warmup() {
        let first = GrayImage::new(4, 4);
        let mut bg = BackgroundModel::new(&first, &config(4));
        assert!(!bg.is_initialized());
        assert!((bg.current_alpha() - 0.8).abs() < 1e-6);

        let mut last = bg.current_alpha();
        for _ in 0..4 {
            bg.update(&first, &[]);
            assert!(bg.current_alpha() <= last);
            last = bg.current_alpha();
        }
        assert!(bg.is_initialized());
        assert!((bg.current_alpha() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_box_outside_frame_ignored() {
        let first = GrayImage::from_pixel(8, 8, Luma([0]));
        let mut bg = BackgroundModel::new(&first, &config(0));
        bg.update(&first, &[BBox::new(100.0, 100.0, 5.0, 5.0)]);
        assert_eq!(bg.image(), first);
    }
}
