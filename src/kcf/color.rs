// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! Lab 颜色聚类直方图特征
//! Per-cell histogram of nearest Lab colour centroids

use image::RgbImage;
use ndarray::ArrayViewMut3;

/// 颜色聚类数
pub const LAB_CLUSTERS: usize = 15;

/// 8 位 Lab 空间中的聚类中心 (L*255/100, a+128, b+128)
/// 3 个亮度层 × (中性, 红, 绿, 蓝, 黄)
const CENTROIDS: [[f32; 3]; LAB_CLUSTERS] = [
    [60.0, 128.0, 128.0],
    [60.0, 165.0, 150.0],
    [60.0, 100.0, 160.0],
    [60.0, 140.0, 85.0],
    [60.0, 125.0, 185.0],
    [135.0, 128.0, 128.0],
    [135.0, 165.0, 150.0],
    [135.0, 100.0, 160.0],
    [135.0, 140.0, 85.0],
    [135.0, 125.0, 185.0],
    [210.0, 128.0, 128.0],
    [210.0, 165.0, 150.0],
    [210.0, 100.0, 160.0],
    [210.0, 140.0, 85.0],
    [210.0, 125.0, 185.0],
];

/// sRGB → 8 位 Lab
pub fn rgb_to_lab8(rgb: [u8; 3]) -> [f32; 3] {
    let lin = |c: u8| {
        let v = c as f32 / 255.0;
        if v <= 0.04045 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    };
    let (r, g, b) = (lin(rgb[0]), lin(rgb[1]), lin(rgb[2]));

    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / 0.950456;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / 1.088754;

    let f = |t: f32| {
        if t > 0.008856 {
            t.cbrt()
        } else {
            7.787 * t + 16.0 / 116.0
        }
    };
    let l = if y > 0.008856 {
        116.0 * y.cbrt() - 16.0
    } else {
        903.3 * y
    };
    let a = 500.0 * (f(x) - f(y));
    let bb = 200.0 * (f(y) - f(z));

    [l * 255.0 / 100.0, a + 128.0, bb + 128.0]
}

/// 最近聚类中心
pub fn nearest_centroid(lab: [f32; 3]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::MAX;
    for (k, c) in CENTROIDS.iter().enumerate() {
        let dist = (lab[0] - c[0]).powi(2) + (lab[1] - c[1]).powi(2) + (lab[2] - c[2]).powi(2);
        if dist < best_dist {
            best_dist = dist;
            best = k;
        }
    }
    best
}

/// 写入 (15, cells_y - 2, cells_x - 2), 与 fHOG 的 cell 网格对齐
pub fn lab_histogram_into(patch: &RgbImage, cell: usize, mut out: ArrayViewMut3<f32>) {
    out.fill(0.0);
    let (_, rows, cols) = out.dim();
    let weight = 1.0 / (cell * cell) as f32;

    for r in 0..rows {
        for c in 0..cols {
            let (y0, x0) = ((r + 1) * cell, (c + 1) * cell);
            for y in y0..y0 + cell {
                for x in x0..x0 + cell {
                    let px = patch.get_pixel(x as u32, y as u32).0;
                    let k = nearest_centroid(rgb_to_lab8(px));
                    out[[k, r, c]] += weight;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::Array3;

    #[test]
    fn test_lab_reference_colors() {
        let white = rgb_to_lab8([255, 255, 255]);
        assert!((white[0] - 255.0).abs() < 1.0);
        assert!((white[1] - 128.0).abs() < 1.0);
        assert!((white[2] - 128.0).abs() < 1.0);

        let black = rgb_to_lab8([0, 0, 0]);
        assert!(black[0].abs() < 1e-3);

        let red = rgb_to_lab8([255, 0, 0]);
        assert!(red[1] > 128.0 + 50.0);
    }

    #[test]
    fn test_gray_maps_to_neutral_cluster() {
        let k = nearest_centroid(rgb_to_lab8([128, 128, 128]));
        assert_eq!(k % 5, 0);
    }

    #[test]
    fn test_histogram_cells_sum_to_one() {
        let patch = RgbImage::from_fn(24, 16, |x, _| {
            if x < 12 {
                Rgb([200, 30, 30])
            } else {
                Rgb([30, 30, 200])
            }
        });
        let mut out = Array3::<f32>::zeros((LAB_CLUSTERS, 2, 4));
        lab_histogram_into(&patch, 4, out.view_mut());
        for r in 0..2 {
            for c in 0..4 {
                let total: f32 = (0..LAB_CLUSTERS).map(|k| out[[k, r, c]]).sum();
                assert!((total - 1.0).abs() < 1e-5);
            }
        }
    }
}
