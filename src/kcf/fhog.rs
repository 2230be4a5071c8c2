// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! fHOG 梯度方向直方图特征 (31 通道)
//! Felzenszwalb HOG: 9 insensitive + 18 sensitive orientations,
//! four block normalisations, projected to 31 channels per cell.

use std::f32::consts::PI;

use image::RgbImage;
use ndarray::ArrayViewMut3;

/// 方向扇区数
pub const NUM_SECTOR: usize = 9;

/// 每个 cell 输出通道数 (18 + 9 + 4)
pub const FHOG_CHANNELS: usize = 31;

/// 每个 cell 原始特征数: [0, 9) 方向不敏感, [9, 27) 方向敏感
const RAW_FEATURES: usize = 3 * NUM_SECTOR;

/// 截断阈值
const TRUNCATE: f32 = 0.2;

/// 去掉一圈边界 cell 后的尺寸 (rows, cols)
pub fn inner_cells(patch: &RgbImage, cell: usize) -> (usize, usize) {
    let size_x = patch.width() as usize / cell;
    let size_y = patch.height() as usize / cell;
    (size_y.saturating_sub(2), size_x.saturating_sub(2))
}

/// 写入预先分配好的输出 (通道, 行, 列)
pub fn fhog_into(patch: &RgbImage, cell: usize, mut out: ArrayViewMut3<f32>) {
    let width = patch.width() as usize;
    let height = patch.height() as usize;
    let size_x = width / cell;
    let size_y = height / cell;
    if size_x < 3 || size_y < 3 {
        out.fill(0.0);
        return;
    }

    let (magnitude, bins) = gradients(patch);
    let map = cell_histograms(&magnitude, &bins, width, height, cell, size_x, size_y);

    // 每个 cell 的方向不敏感能量
    let part_norm: Vec<f32> = map
        .chunks_exact(RAW_FEATURES)
        .map(|f| f[..NUM_SECTOR].iter().map(|v| v * v).sum())
        .collect();

    let nx = 1.0 / (2.0 * NUM_SECTOR as f32).sqrt();
    for i in 1..size_y - 1 {
        for j in 1..size_x - 1 {
            let pos = i * size_x + j;
            let block = |a: usize, b: usize, c: usize| {
                (part_norm[pos] + part_norm[a] + part_norm[b] + part_norm[c]).sqrt() + f32::EPSILON
            };
            let norms = [
                block(pos + 1, pos + size_x, pos + size_x + 1),
                block(pos + 1, pos - size_x, pos - size_x + 1),
                block(pos - 1, pos + size_x, pos + size_x - 1),
                block(pos - 1, pos - size_x, pos - size_x - 1),
            ];

            let feat = &map[pos * RAW_FEATURES..(pos + 1) * RAW_FEATURES];
            let (r, c) = (i - 1, j - 1);

            // 方向敏感: 18 通道
            for k in 0..2 * NUM_SECTOR {
                let v: f32 = norms
                    .iter()
                    .map(|n| (feat[NUM_SECTOR + k] / n).min(TRUNCATE))
                    .sum();
                out[[k, r, c]] = 0.5 * v;
            }

            // 方向不敏感: 9 通道
            for k in 0..NUM_SECTOR {
                let v: f32 = norms.iter().map(|n| (feat[k] / n).min(TRUNCATE)).sum();
                out[[2 * NUM_SECTOR + k, r, c]] = 0.5 * v;
            }

            // 纹理能量: 每种归一化一个通道
            for (b, n) in norms.iter().enumerate() {
                let v: f32 = (0..2 * NUM_SECTOR)
                    .map(|k| (feat[NUM_SECTOR + k] / n).min(TRUNCATE))
                    .sum();
                out[[3 * NUM_SECTOR + b, r, c]] = nx * v;
            }
        }
    }
}

/// 逐像素梯度幅值与方向 (取三通道中幅值最大的一个)
fn gradients(patch: &RgbImage) -> (Vec<f32>, Vec<(usize, usize)>) {
    let width = patch.width() as usize;
    let height = patch.height() as usize;
    let mut magnitude = vec![0.0f32; width * height];
    let mut bins = vec![(0usize, 0usize); width * height];

    let boundary: Vec<(f32, f32)> = (0..=NUM_SECTOR)
        .map(|i| {
            let angle = i as f32 * PI / NUM_SECTOR as f32;
            (angle.cos(), angle.sin())
        })
        .collect();

    let px = |x: usize, y: usize, c: usize| patch.get_pixel(x as u32, y as u32)[c] as f32;

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let mut best = (0.0f32, 0.0f32, 0.0f32);
            for c in 0..3 {
                let dx = px(x + 1, y, c) - px(x - 1, y, c);
                let dy = px(x, y + 1, c) - px(x, y - 1, c);
                let m = dx * dx + dy * dy;
                if m > best.0 {
                    best = (m, dx, dy);
                }
            }

            let (m, dx, dy) = best;
            let mut max_dot = 0.0f32;
            let mut max_idx = 0usize;
            for (k, (bx, by)) in boundary.iter().take(NUM_SECTOR).enumerate() {
                let dot = bx * dx + by * dy;
                if dot > max_dot {
                    max_dot = dot;
                    max_idx = k;
                } else if -dot > max_dot {
                    max_dot = -dot;
                    max_idx = k + NUM_SECTOR;
                }
            }

            let idx = y * width + x;
            magnitude[idx] = m.sqrt();
            bins[idx] = (max_idx % NUM_SECTOR, max_idx);
        }
    }

    (magnitude, bins)
}

/// 双线性插值累加到相邻 cell
fn cell_histograms(
    magnitude: &[f32],
    bins: &[(usize, usize)],
    width: usize,
    height: usize,
    cell: usize,
    size_x: usize,
    size_y: usize,
) -> Vec<f32> {
    let half = cell / 2;
    let nearest: Vec<i64> = (0..cell).map(|i| if i < half { -1 } else { 1 }).collect();

    // w[2i] 本 cell 权重, w[2i + 1] 相邻 cell 权重
    let mut w = vec![0.0f32; cell * 2];
    for i in 0..cell {
        let (a, b) = if i < half {
            (half as f32 - i as f32 - 0.5, half as f32 + i as f32 + 0.5)
        } else {
            (i as f32 - half as f32 + 0.5, half as f32 - i as f32 - 0.5 + cell as f32)
        };
        w[i * 2] = b / (a + b);
        w[i * 2 + 1] = a / (a + b);
    }

    let mut map = vec![0.0f32; size_x * size_y * RAW_FEATURES];
    let mut add = |ci: i64, cj: i64, bin: (usize, usize), v: f32| {
        if ci < 0 || cj < 0 || ci >= size_y as i64 || cj >= size_x as i64 {
            return;
        }
        let base = (ci as usize * size_x + cj as usize) * RAW_FEATURES;
        map[base + bin.0] += v;
        map[base + NUM_SECTOR + bin.1] += v;
    };

    for i in 0..size_y {
        for j in 0..size_x {
            for ii in 0..cell {
                for jj in 0..cell {
                    let y = i * cell + ii;
                    let x = j * cell + jj;
                    if y == 0 || x == 0 || y >= height - 1 || x >= width - 1 {
                        continue;
                    }
                    let d = y * width + x;
                    let r = magnitude[d];
                    if r == 0.0 {
                        continue;
                    }
                    let bin = bins[d];
                    let (ci, cj) = (i as i64, j as i64);
                    let (ni, nj) = (ci + nearest[ii], cj + nearest[jj]);

                    add(ci, cj, bin, r * w[ii * 2] * w[jj * 2]);
                    add(ni, cj, bin, r * w[ii * 2 + 1] * w[jj * 2]);
                    add(ci, nj, bin, r * w[ii * 2] * w[jj * 2 + 1]);
                    add(ni, nj, bin, r * w[ii * 2 + 1] * w[jj * 2 + 1]);
                }
            }
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::Array3;

    fn fhog(patch: &RgbImage, cell: usize) -> Array3<f32> {
        let (rows, cols) = inner_cells(patch, cell);
        let mut out = Array3::<f32>::zeros((FHOG_CHANNELS, rows, cols));
        fhog_into(patch, cell, out.view_mut());
        out
    }

    #[test]
    fn test_flat_patch_has_no_gradient_energy() {
        let patch = RgbImage::from_pixel(32, 24, Rgb([90, 90, 90]));
        let f = fhog(&patch, 4);
        assert_eq!(f.dim(), (FHOG_CHANNELS, 4, 6));
        assert!(f.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_vertical_edge_uses_horizontal_orientation() {
        let patch = RgbImage::from_fn(32, 32, |x, _| if x < 16 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let f = fhog(&patch, 4);

        // 梯度沿 +x, 落在敏感方向 0 / 不敏感方向 0
        let sensitive_0: f32 = f.index_axis(ndarray::Axis(0), 0).sum();
        let sensitive_9: f32 = f.index_axis(ndarray::Axis(0), NUM_SECTOR).sum();
        let insensitive_0: f32 = f.index_axis(ndarray::Axis(0), 2 * NUM_SECTOR).sum();
        assert!(sensitive_0 > 0.0);
        assert!(insensitive_0 > 0.0);
        assert!(sensitive_9.abs() < 1e-6);
    }

    #[test]
    fn test_values_are_bounded() {
        let patch = RgbImage::from_fn(40, 40, |x, y| Rgb([((x * 37 + y * 11) % 256) as u8, (x * 5) as u8, (y * 6) as u8]));
        let f = fhog(&patch, 4);
        // 截断后每个通道至多 4 * 0.2 * 0.5
        for v in f.iter() {
            assert!(*v >= 0.0);
        }
        for k in 0..2 * NUM_SECTOR + NUM_SECTOR {
            assert!(f.index_axis(ndarray::Axis(0), k).iter().all(|v| *v <= 0.4 + 1e-6));
        }
    }

    #[test]
    fn test_tiny_patch_is_zero() {
        let patch = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let f = fhog(&patch, 4);
        assert_eq!(f.dim(), (FHOG_CHANNELS, 0, 0));
    }
}
