// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 图片序列输入 (按文件名顺序)
//! Frame source reading a directory of still images

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::detection::types::Frame;
use crate::error::{MotError, Result};

/// 支持的图片扩展名
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// 图片序列, 迭代结束表示输入耗尽
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequence {
    /// 扫描目录中的图片文件, 按文件名排序
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(MotError::EmptySequence(dir.to_path_buf()));
        }
        info!("📂 图片序列: {} ({} 帧)", dir.display(), paths.len());
        Ok(Self { paths, next: 0 })
    }

    /// 直接使用给定的文件列表
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths, next: 0 }
    }

    /// 只保留前 n 帧
    pub fn limit(mut self, n: usize) -> Self {
        self.paths.truncate(n);
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Iterator for ImageSequence {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.get(self.next)?;
        self.next += 1;
        Some(image::open(path).map(|img| img.to_rgb8()).map_err(|e| {
            warn!("⚠️  读取失败: {} ({})", path.display(), e);
            MotError::from(e)
        }))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kcf_mot_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_reads_in_name_order() {
        let dir = temp_dir("order");
        for (name, v) in [("b.png", 20u8), ("a.png", 10), ("c.png", 30)] {
            RgbImage::from_pixel(4, 3, Rgb([v, v, v]))
                .save(dir.join(name))
                .unwrap();
        }
        fs::write(dir.join("notes.txt"), "skip").unwrap();

        let seq = ImageSequence::open(&dir).unwrap();
        assert_eq!(seq.len(), 3);
        let values: Vec<u8> = seq.map(|f| f.unwrap().get_pixel(0, 0)[0]).collect();
        assert_eq!(values, vec![10, 20, 30]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_directory_is_error() {
        let dir = temp_dir("empty");
        assert!(matches!(
            ImageSequence::open(&dir),
            Err(MotError::EmptySequence(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_yields_error_item() {
        let mut seq = ImageSequence::from_paths(vec![PathBuf::from("/nonexistent/frame.png")]);
        assert!(seq.next().unwrap().is_err());
        assert!(seq.next().is_none());
    }
}
