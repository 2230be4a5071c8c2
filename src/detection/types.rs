// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 检测与跟踪共用的数据结构
/// Data structures shared by detection and tracking
use image::{GrayImage, RgbImage};

// ========== 公共类型 ==========

/// 输入帧 (任意尺寸的 RGB 图像, 同一序列内尺寸固定)
pub type Frame = RgbImage;

/// 转换为单通道灰度图
pub fn to_gray(frame: &Frame) -> GrayImage {
    image::imageops::grayscale(frame)
}

// ========== 数据结构 ==========

/// 轴对齐边界框 (x, y, width, height)
///
/// 宽高永远非负; 相交为空时得到宽高为 0 的框。
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// 从左上/右下角点构造
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// 以中心点和尺寸构造
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    pub fn x2(&self) -> f32 {
        self.x + self.width
    }

    pub fn y2(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// 交集 (不相交时宽高为 0)
    pub fn intersect(&self, other: &BBox) -> BBox {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.x2().min(other.x2());
        let y2 = self.y2().min(other.y2());
        if x2 <= x1 || y2 <= y1 {
            return BBox::new(x1, y1, 0.0, 0.0);
        }
        BBox::from_corners(x1, y1, x2, y2)
    }

    /// 交并比, 取值 [0, 1]
    ///
    /// 三个面积都由角点坐标计算, 相同的框得到 inter == union。
    pub fn iou(&self, other: &BBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.x2().min(other.x2());
        let y2 = self.y2().min(other.y2());
        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let inter = (x2 - x1) * (y2 - y1);
        let union = self.corner_area() + other.corner_area() - inter;
        if union <= 0.0 {
            return 0.0;
        }

        (inter / union).min(1.0)
    }

    /// 由角点计算的面积
    fn corner_area(&self) -> f32 {
        (self.x2() - self.x) * (self.y2() - self.y)
    }

    /// 以中心为基准放大
    pub fn expand(&self, ratio: f32) -> BBox {
        let (cx, cy) = self.center();
        BBox::from_center(cx, cy, self.width * ratio, self.height * ratio)
    }

    /// 裁剪到图像范围内
    pub fn clip(&self, width: u32, height: u32) -> BBox {
        self.intersect(&BBox::new(0.0, 0.0, width as f32, height as f32))
    }

    /// 中心点距离
    pub fn center_distance(&self, other: &BBox) -> f32 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }
}

/// 运动检测结果
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// 当前检测框
    pub bbox: BBox,

    /// 之前检测周期中同一目标的检测框 (旧 → 新)
    pub history: Vec<BBox>,
}

impl Detection {
    pub fn new(bbox: BBox) -> Self {
        Self {
            bbox,
            history: Vec::new(),
        }
    }

    /// 运动方向 (单位向量), 没有历史或没有位移时返回 None
    pub fn direction(&self) -> Option<(f32, f32)> {
        let oldest = self.history.first()?;
        let (x0, y0) = oldest.center();
        let (x1, y1) = self.bbox.center();
        let (dx, dy) = (x1 - x0, y1 - y0);
        let norm = (dx * dx + dy * dy).sqrt();
        if norm < f32::EPSILON {
            return None;
        }
        Some((dx / norm, dy / norm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_box(rng: &mut StdRng) -> BBox {
        BBox::new(
            rng.gen_range(-50.0..200.0),
            rng.gen_range(-50.0..200.0),
            rng.gen_range(0.0..120.0),
            rng.gen_range(0.0..120.0),
        )
    }

    #[test]
    fn test_iou_symmetric_and_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let a = random_box(&mut rng);
            let b = random_box(&mut rng);
            let ab = a.iou(&b);
            let ba = b.iou(&a);
            assert!((0.0..=1.0).contains(&ab));
            assert!((ab - ba).abs() < 1e-6);
        }
    }

    #[test]
    fn test_iou_identity() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let a = random_box(&mut rng);
            if a.x2() > a.x && a.y2() > a.y {
                assert_eq!(a.iou(&a), 1.0, "{:?}", a);
            }
        }
    }

    #[test]
    fn test_iou_identity_off_origin() {
        // x + w 会丢精度的框
        let a = BBox::new(142.77423, 75.216064, 5.507741, 72.05462);
        let b = BBox::new(-26.065994, 130.5, 33.3, 0.07721901);
        assert_eq!(a.iou(&a), 1.0);
        assert_eq!(b.iou(&b), 1.0);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(10.0, 0.0, 10.0, 10.0);
        let c = BBox::new(30.0, 30.0, 5.0, 5.0);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.iou(&c), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 0.0, 10.0, 10.0);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_intersect_empty() {
        let a = BBox::new(0.0, 0.0, 4.0, 4.0);
        let b = BBox::new(8.0, 8.0, 4.0, 4.0);
        let inter = a.intersect(&b);
        assert!(inter.is_empty());
        assert_eq!(inter.area(), 0.0);
    }

    #[test]
    fn test_expand_and_clip() {
        let b = BBox::new(10.0, 10.0, 10.0, 20.0);
        let e = b.expand(1.2);
        assert_eq!(e.center(), b.center());
        assert!((e.width - 12.0).abs() < 1e-5);
        assert!((e.height - 24.0).abs() < 1e-5);

        let c = BBox::new(-5.0, 90.0, 20.0, 20.0).clip(100, 100);
        assert_eq!(c, BBox::new(0.0, 90.0, 15.0, 10.0));
    }

    #[test]
    fn test_detection_direction() {
        let mut det = Detection::new(BBox::new(20.0, 0.0, 10.0, 10.0));
        assert!(det.direction().is_none());

        det.history.push(BBox::new(0.0, 0.0, 10.0, 10.0));
        let (dx, dy) = det.direction().unwrap();
        assert!((dx - 1.0).abs() < 1e-6);
        assert!(dy.abs() < 1e-6);
    }
}
