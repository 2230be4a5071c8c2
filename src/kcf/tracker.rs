// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! KCF 核相关滤波跟踪器
//! Kernelized correlation filter with APCE-gated model update

use ndarray::{Array2, Axis, Zip};
use rustfft::num_complex::Complex32;

use super::features::{apply_window, channel_means, FeatureExtractor, FeatureMap, TemplateGeometry};
use super::fft::{gaussian_peak, hann_window, rearrange, Fft2d};
use crate::config::{KcfConfig, KcfParams};
use crate::detection::types::{BBox, Frame};

// ========== 置信度门控 ==========

/// APCE 置信度门控
///
/// 只有当峰值和 APCE 都超过各自历史均值的一定比例时才允许更新模型,
/// 并且只在接受时更新历史均值。
#[derive(Clone, Debug, PartialEq)]
pub struct ConfidenceGate {
    /// beta_1
    pub peak_ratio: f32,

    /// beta_2
    pub apce_ratio: f32,

    /// 均值更新率
    pub rate: f32,

    pub mean_peak: f32,

    pub mean_apce: f32,
}

impl ConfidenceGate {
    pub fn new(config: &KcfConfig) -> Self {
        Self {
            peak_ratio: config.peak_ratio,
            apce_ratio: config.apce_ratio,
            rate: config.stats_rate,
            mean_peak: 0.0,
            mean_apce: 0.0,
        }
    }

    /// 判断本次响应是否可信, 可信时更新历史均值
    pub fn admit(&mut self, peak: f32, apce: f32) -> bool {
        let accepted =
            peak > self.peak_ratio * self.mean_peak && apce > self.apce_ratio * self.mean_apce;
        if accepted {
            self.mean_peak = (1.0 - self.rate) * self.mean_peak + self.rate * peak;
            self.mean_apce = (1.0 - self.rate) * self.mean_apce + self.rate * apce;
        }
        accepted
    }
}

// ========== 滤波器 ==========

/// 单次更新结果
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterUpdate {
    pub bbox: BBox,
    pub peak: f32,
    pub apce: f32,
    pub accepted: bool,
}

/// 一次响应检测
#[derive(Clone, Copy, Debug)]
struct Response {
    /// 以 cell 为单位的位移 (x, y)
    shift: (f32, f32),
    peak: f32,
    apce: f32,
}

/// KCF 跟踪器 (每条轨迹一个, 重启时整体替换)
#[derive(Clone)]
pub struct KcfTracker {
    extractor: FeatureExtractor,
    roi: BBox,
    geometry: TemplateGeometry,
    fft: Fft2d,
    hann: Array2<f32>,

    /// 高斯标签的频域形式
    prob: Array2<Complex32>,

    /// 频域对偶系数
    alphaf: Array2<Complex32>,

    /// 模板特征 (已加窗)
    tmpl: FeatureMap,
}

impl KcfTracker {
    /// 以给定框在当前帧上初始化 (学习率为 1 的训练)
    pub fn init(params: &KcfParams, roi: BBox, frame: &Frame) -> Self {
        let extractor = FeatureExtractor::new(params.clone());
        let geometry = extractor.geometry(&roi);
        let mut x = extractor.extract(frame, roi.center(), &geometry, 1.0);
        let (_, rows, cols) = x.dim();

        let hann = hann_window(rows, cols);
        apply_window(&mut x, &hann);

        let fft = Fft2d::new(rows, cols);
        let output_sigma = ((rows * cols) as f32).sqrt() / params.padding * params.output_sigma_factor;
        let prob = fft.forward(gaussian_peak(rows, cols, output_sigma).view());

        let mut tracker = Self {
            extractor,
            roi,
            geometry,
            fft,
            hann,
            prob,
            alphaf: Array2::zeros((rows, cols)),
            tmpl: FeatureMap::zeros(x.dim()),
        };
        tracker.train(x, 1.0);
        tracker
    }

    /// 当前模板的外观描述子 (逐通道均值)
    pub fn appearance(&self) -> Vec<f32> {
        channel_means(&self.tmpl)
    }

    /// 在新帧上定位目标, 置信度足够时更新模型
    pub fn update(&mut self, frame: &Frame, gate: &mut ConfidenceGate) -> FilterUpdate {
        let params = self.extractor.params().clone();
        self.clamp_roi(frame);

        let (cx, cy) = self.roi.center();
        let mut best = self.detect(&self.features(frame, 1.0));

        if params.multiscale && params.scale_step > 1.0 {
            // 缩小窗口 (目标变小)
            let smaller = self.detect(&self.features(frame, 1.0 / params.scale_step));
            if params.scale_weight * smaller.peak > best.peak {
                best = smaller;
                self.rescale(1.0 / params.scale_step);
            }

            // 放大窗口 (目标变大)
            let bigger = self.detect(&self.features(frame, params.scale_step));
            if params.scale_weight * bigger.peak > best.peak {
                best = bigger;
                self.rescale(params.scale_step);
            }
        }

        let step = params.cell_size as f32 * self.geometry.scale;
        self.roi.x = cx - self.roi.width / 2.0 + best.shift.0 * step;
        self.roi.y = cy - self.roi.height / 2.0 + best.shift.1 * step;
        self.clamp_roi(frame);

        let accepted = gate.admit(best.peak, best.apce);
        if accepted {
            let x = self.features(frame, 1.0);
            self.train(x, params.interp_factor);
        }

        FilterUpdate {
            bbox: self.roi,
            peak: best.peak,
            apce: best.apce,
            accepted,
        }
    }

    fn rescale(&mut self, factor: f32) {
        self.geometry.scale *= factor;
        self.roi.width *= factor;
        self.roi.height *= factor;
    }

    /// 保证目标框至少有一个像素留在图像内
    fn clamp_roi(&mut self, frame: &Frame) {
        let (w, h) = (frame.width() as f32, frame.height() as f32);
        if self.roi.x + self.roi.width <= 0.0 {
            self.roi.x = -self.roi.width + 1.0;
        }
        if self.roi.y + self.roi.height <= 0.0 {
            self.roi.y = -self.roi.height + 1.0;
        }
        if self.roi.x >= w - 1.0 {
            self.roi.x = w - 2.0;
        }
        if self.roi.y >= h - 1.0 {
            self.roi.y = h - 2.0;
        }
    }

    /// 当前位置的加窗特征
    fn features(&self, frame: &Frame, scale_adjust: f32) -> FeatureMap {
        let mut x = self
            .extractor
            .extract(frame, self.roi.center(), &self.geometry, scale_adjust);
        apply_window(&mut x, &self.hann);
        x
    }

    /// 训练: alphaf = prob / (fft(k_xx) + lambda), 再按学习率融合
    fn train(&mut self, x: FeatureMap, rate: f32) {
        let lambda = self.extractor.params().lambda;
        let k = self.gaussian_correlation(&x, &x);
        let kf = self.fft.forward(k.view());

        let mut alphaf_new = self.prob.clone();
        Zip::from(&mut alphaf_new)
            .and(&kf)
            .for_each(|a, &k| *a /= k + Complex32::new(lambda, 0.0));

        Zip::from(&mut self.tmpl)
            .and(&x)
            .for_each(|t, &v| *t = (1.0 - rate) * *t + rate * v);
        Zip::from(&mut self.alphaf)
            .and(&alphaf_new)
            .for_each(|a, &n| *a = *a * (1.0 - rate) + n * rate);
    }

    /// 在特征 x 上求响应峰值与位移
    fn detect(&self, x: &FeatureMap) -> Response {
        let k = self.gaussian_correlation(x, &self.tmpl);
        let mut spectrum = self.fft.forward(k.view());
        Zip::from(&mut spectrum)
            .and(&self.alphaf)
            .for_each(|s, &a| *s *= a);
        let res = self.fft.inverse_real(&spectrum);
        let (rows, cols) = res.dim();

        let mut peak = f32::MIN;
        let mut min = f32::MAX;
        let mut loc = (0usize, 0usize);
        for ((r, c), &v) in res.indexed_iter() {
            if v > peak {
                peak = v;
                loc = (r, c);
            }
            min = min.min(v);
        }

        // APCE = |max - min|^2 / mean((r - min)^2)
        let fluctuation = res.iter().map(|v| (v - min).powi(2)).sum::<f32>() / (rows * cols) as f32;
        let apce = if fluctuation > 0.0 {
            (peak - min).powi(2) / fluctuation
        } else {
            0.0
        };

        let (py, px) = loc;
        let mut sx = px as f32;
        let mut sy = py as f32;
        if px > 0 && px + 1 < cols {
            sx += sub_pixel_peak(res[[py, px - 1]], peak, res[[py, px + 1]]);
        }
        if py > 0 && py + 1 < rows {
            sy += sub_pixel_peak(res[[py - 1, px]], peak, res[[py + 1, px]]);
        }

        Response {
            shift: (sx - (cols / 2) as f32, sy - (rows / 2) as f32),
            peak,
            apce,
        }
    }

    /// 多通道高斯核相关 (频域逐通道互相关后求和)
    fn gaussian_correlation(&self, x1: &FeatureMap, x2: &FeatureMap) -> Array2<f32> {
        let (channels, rows, cols) = x1.dim();
        let sigma = self.extractor.params().sigma;

        let mut corr = Array2::<f32>::zeros((rows, cols));
        for (a, b) in x1.axis_iter(Axis(0)).zip(x2.axis_iter(Axis(0))) {
            let mut fa = self.fft.forward(a);
            let fb = self.fft.forward(b);
            Zip::from(&mut fa).and(&fb).for_each(|p, &q| *p *= q.conj());
            corr += &self.fft.inverse_real(&fa);
        }
        let corr = rearrange(&corr);

        let s1: f32 = x1.iter().map(|v| v * v).sum();
        let s2: f32 = x2.iter().map(|v| v * v).sum();
        let n = (rows * cols * channels).max(1) as f32;

        corr.mapv(|c| {
            let d = ((s1 + s2 - 2.0 * c) / n).max(0.0);
            (-d / (sigma * sigma)).exp()
        })
    }
}

/// 三点抛物线插值的亚像素偏移
fn sub_pixel_peak(left: f32, center: f32, right: f32) -> f32 {
    let divisor = 2.0 * center - right - left;
    if divisor == 0.0 {
        return 0.0;
    }
    0.5 * (right - left) / divisor
}
