// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 特征提取: 模板几何 + fHOG/Lab/灰度特征
//! Feature pipeline shared by the correlation filter and the association engine

use image::RgbImage;
use ndarray::{s, Array2, Array3, Axis};

use super::color::{lab_histogram_into, LAB_CLUSTERS};
use super::fhog::{fhog_into, inner_cells, FHOG_CHANNELS};
use crate::config::KcfParams;
use crate::detection::types::{BBox, Frame};
use crate::utils::crop::subwindow;

/// 特征图 (通道, 行, 列)
pub type FeatureMap = Array3<f32>;

/// 模板几何: 原图到模板的缩放比例与模板尺寸
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateGeometry {
    pub scale: f32,
    pub width: u32,
    pub height: u32,
}

/// 特征提取器 (无状态, 可在跟踪器和关联模块之间共享)
#[derive(Clone, Debug)]
pub struct FeatureExtractor {
    params: KcfParams,
}

impl FeatureExtractor {
    pub fn new(params: KcfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KcfParams {
        &self.params
    }

    /// 每个 cell 的通道数
    pub fn channels(&self) -> usize {
        match (self.params.hog, self.params.lab) {
            (true, true) => FHOG_CHANNELS + LAB_CLUSTERS,
            (true, false) => FHOG_CHANNELS,
            _ => 1,
        }
    }

    /// 由目标框计算模板几何 (带 padding 的窗口按最长边缩放到 template_size)
    pub fn geometry(&self, roi: &BBox) -> TemplateGeometry {
        let p = &self.params;
        let padded_w = (roi.width * p.padding).max(1.0);
        let padded_h = (roi.height * p.padding).max(1.0);

        let (scale, mut w, mut h) = if p.fixed_window && p.template_size > 1 {
            let scale = padded_w.max(padded_h) / p.template_size as f32;
            (scale, padded_w / scale, padded_h / scale)
        } else {
            (1.0, padded_w, padded_h)
        };

        let (width, height) = if p.hog {
            // 对齐到 2 * cell, 并多留一对 cell 作为边界
            let step = 2 * p.cell_size;
            let align = |v: f32| (v as usize / step) * step + step;
            w = align(w).max(4 * p.cell_size) as f32;
            h = align(h).max(4 * p.cell_size) as f32;
            (w as u32, h as u32)
        } else {
            // 偶数尺寸
            let even = |v: f32| ((v as u32 / 2) * 2).max(4);
            (even(w), even(h))
        };

        TemplateGeometry {
            scale,
            width,
            height,
        }
    }

    /// 以 center 为中心, 按 geometry.scale * scale_adjust 截取窗口并提取特征 (未加窗)
    pub fn extract(
        &self,
        frame: &Frame,
        center: (f32, f32),
        geometry: &TemplateGeometry,
        scale_adjust: f32,
    ) -> FeatureMap {
        let ext_w = scale_adjust * geometry.scale * geometry.width as f32;
        let ext_h = scale_adjust * geometry.scale * geometry.height as f32;
        let window = BBox::from_center(center.0, center.1, ext_w, ext_h);
        let patch = subwindow(frame, &window, geometry.width, geometry.height);
        self.patch_features(&patch)
    }

    /// 已缩放到模板尺寸的图块 → 特征图
    pub fn patch_features(&self, patch: &RgbImage) -> FeatureMap {
        let cell = self.params.cell_size;
        if !self.params.hog {
            let gray = image::imageops::grayscale(patch);
            let (w, h) = gray.dimensions();
            return Array3::from_shape_fn((1, h as usize, w as usize), |(_, r, c)| {
                gray.get_pixel(c as u32, r as u32)[0] as f32 / 255.0 - 0.5
            });
        }

        let (rows, cols) = inner_cells(patch, cell);
        let mut features = Array3::<f32>::zeros((self.channels(), rows, cols));
        fhog_into(patch, cell, features.slice_mut(s![..FHOG_CHANNELS, .., ..]));
        if self.params.lab {
            lab_histogram_into(patch, cell, features.slice_mut(s![FHOG_CHANNELS.., .., ..]));
        }
        features
    }

    /// 外观描述子: 与跟踪器完全相同的特征流程 (含汉宁窗), 逐通道取均值
    pub fn descriptor(&self, frame: &Frame, roi: &BBox) -> Vec<f32> {
        let geometry = self.geometry(roi);
        let mut features = self.extract(frame, roi.center(), &geometry, 1.0);
        let (_, rows, cols) = features.dim();
        apply_window(&mut features, &super::fft::hann_window(rows, cols));
        channel_means(&features)
    }
}

/// 每个通道乘以汉宁窗
pub fn apply_window(features: &mut FeatureMap, window: &Array2<f32>) {
    for mut channel in features.axis_iter_mut(Axis(0)) {
        channel *= window;
    }
}

/// 逐通道均值
pub fn channel_means(features: &FeatureMap) -> Vec<f32> {
    features
        .axis_iter(Axis(0))
        .map(|channel| channel.mean().unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KcfConfig;
    use image::Rgb;

    fn scene() -> Frame {
        let mut frame = RgbImage::from_pixel(160, 120, Rgb([60, 60, 60]));
        for y in 40..70 {
            for x in 50..70 {
                frame.put_pixel(x, y, Rgb([200, 180, 40]));
            }
        }
        frame
    }

    #[test]
    fn test_geometry_aligned_to_cells() {
        let extractor = FeatureExtractor::new(KcfConfig::default().resolve());
        let g = extractor.geometry(&BBox::new(0.0, 0.0, 16.0, 24.0));
        // 40x60 的 padding 窗口 → 最长边 96
        assert!((g.scale - 0.625).abs() < 1e-6);
        assert_eq!(g.width, 72);
        assert_eq!(g.height, 104);
        assert_eq!(g.width % 8, 0);
    }

    #[test]
    fn test_hog_lab_feature_shape() {
        let extractor = FeatureExtractor::new(KcfConfig::default().resolve());
        let roi = BBox::new(50.0, 40.0, 20.0, 30.0);
        let g = extractor.geometry(&roi);
        let f = extractor.extract(&scene(), roi.center(), &g, 1.0);
        assert_eq!(f.dim().0, FHOG_CHANNELS + LAB_CLUSTERS);
        assert_eq!(f.dim().1, g.height as usize / 4 - 2);
        assert_eq!(f.dim().2, g.width as usize / 4 - 2);
    }

    #[test]
    fn test_raw_gray_features() {
        let cfg = KcfConfig {
            hog: false,
            ..KcfConfig::default()
        };
        let extractor = FeatureExtractor::new(cfg.resolve());
        assert_eq!(extractor.channels(), 1);
        let roi = BBox::new(50.0, 40.0, 20.0, 30.0);
        let g = extractor.geometry(&roi);
        let f = extractor.extract(&scene(), roi.center(), &g, 1.0);
        assert_eq!(f.dim(), (1, g.height as usize, g.width as usize));
        assert!(f.iter().all(|v| (-0.5..=0.5).contains(v)));
    }

    #[test]
    fn test_descriptor_is_deterministic() {
        let extractor = FeatureExtractor::new(KcfConfig::default().resolve());
        let roi = BBox::new(50.0, 40.0, 20.0, 30.0);
        let a = extractor.descriptor(&scene(), &roi);
        let b = extractor.descriptor(&scene(), &roi);
        assert_eq!(a.len(), extractor.channels());
        assert_eq!(a, b);
    }
}
