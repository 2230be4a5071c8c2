// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 二维 FFT 与频域辅助函数
//! 2-D FFT helpers on top of rustfft

use std::f32::consts::PI;
use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

/// 固定尺寸的二维 FFT 计划 (行 FFT + 列 FFT)
#[derive(Clone)]
pub struct Fft2d {
    rows: usize,
    cols: usize,
    row_fwd: Arc<dyn Fft<f32>>,
    row_inv: Arc<dyn Fft<f32>>,
    col_fwd: Arc<dyn Fft<f32>>,
    col_inv: Arc<dyn Fft<f32>>,
}

impl Fft2d {
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let mut planner = FftPlanner::<f32>::new();
        Self {
            rows,
            cols,
            row_fwd: planner.plan_fft_forward(cols),
            row_inv: planner.plan_fft_inverse(cols),
            col_fwd: planner.plan_fft_forward(rows),
            col_inv: planner.plan_fft_inverse(rows),
        }
    }

    /// 实数输入的正变换
    pub fn forward(&self, input: ArrayView2<f32>) -> Array2<Complex32> {
        let buf = input.iter().map(|&v| Complex32::new(v, 0.0)).collect();
        self.transform(buf, &self.row_fwd, &self.col_fwd, 1.0)
    }

    /// 逆变换 (已除以 N)
    pub fn inverse(&self, input: &Array2<Complex32>) -> Array2<Complex32> {
        let scale = 1.0 / (self.rows * self.cols) as f32;
        self.transform(input.iter().copied().collect(), &self.row_inv, &self.col_inv, scale)
    }

    /// 逆变换取实部
    pub fn inverse_real(&self, input: &Array2<Complex32>) -> Array2<f32> {
        self.inverse(input).mapv(|c| c.re)
    }

    fn transform(
        &self,
        mut buf: Vec<Complex32>,
        row_fft: &Arc<dyn Fft<f32>>,
        col_fft: &Arc<dyn Fft<f32>>,
        scale: f32,
    ) -> Array2<Complex32> {
        let (rows, cols) = (self.rows, self.cols);
        debug_assert_eq!(buf.len(), rows * cols);

        // 每一行
        row_fft.process(&mut buf);

        // 转置后每一列
        let mut t = vec![Complex32::new(0.0, 0.0); rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                t[c * rows + r] = buf[r * cols + c];
            }
        }
        col_fft.process(&mut t);

        Array2::from_shape_fn((rows, cols), |(r, c)| t[c * rows + r] * scale)
    }
}

/// 象限交换 (fftshift), 把零位移移到中心
pub fn rearrange(input: &Array2<f32>) -> Array2<f32> {
    let (rows, cols) = input.dim();
    let (cy, cx) = (rows / 2, cols / 2);
    let mut out = Array2::<f32>::zeros((rows, cols));
    for ((r, c), &v) in input.indexed_iter() {
        out[[(r + cy) % rows, (c + cx) % cols]] = v;
    }
    out
}

/// 二维汉宁窗 (行窗 × 列窗)
pub fn hann_window(rows: usize, cols: usize) -> Array2<f32> {
    let hann = |i: usize, n: usize| {
        if n <= 1 {
            1.0
        } else {
            0.5 * (1.0 - (2.0 * PI * i as f32 / (n - 1) as f32).cos())
        }
    };
    Array2::from_shape_fn((rows, cols), |(r, c)| hann(r, rows) * hann(c, cols))
}

/// 以中心为峰值的二维高斯标签
pub fn gaussian_peak(rows: usize, cols: usize, sigma: f32) -> Array2<f32> {
    let mult = -0.5 / (sigma * sigma);
    let (cy, cx) = ((rows / 2) as f32, (cols / 2) as f32);
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let ih = r as f32 - cy;
        let jh = c as f32 - cx;
        (mult * (ih * ih + jh * jh)).exp()
    })
}
