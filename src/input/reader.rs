// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 读帧线程: 帧源 → 有界通道 → 跟踪主循环
//! Moves a frame source onto its own thread

use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver};
use tracing::{debug, info};

use crate::detection::types::Frame;
use crate::error::Result;

/// 在独立线程中读取帧
///
/// 通道满时阻塞读线程 (离线序列不丢帧); 接收端关闭后线程退出。
pub fn spawn_reader<I>(source: I, capacity: usize) -> (Receiver<Result<Frame>>, JoinHandle<u64>)
where
    I: Iterator<Item = Result<Frame>> + Send + 'static,
{
    let (tx, rx) = bounded(capacity.max(1));
    let handle = thread::spawn(move || {
        info!("🎬 读帧线程启动");
        let start = Instant::now();
        let mut count = 0u64;
        for item in source {
            if tx.send(item).is_err() {
                debug!("读帧线程: 接收端已关闭");
                break;
            }
            count += 1;
        }
        let secs = start.elapsed().as_secs_f64().max(1e-9);
        info!("🏁 读帧线程退出: {} 帧 ({:.1} fps)", count, count as f64 / secs);
        count
    });
    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_forwards_all_frames_in_order() {
        let frames: Vec<Result<Frame>> = (0..5u32).map(|i| Ok(RgbImage::new(i + 1, 1))).collect();
        let (rx, handle) = spawn_reader(frames.into_iter(), 2);
        let widths: Vec<u32> = rx.iter().map(|f| f.unwrap().width()).collect();
        assert_eq!(widths, vec![1, 2, 3, 4, 5]);
        assert_eq!(handle.join().unwrap(), 5);
    }

    #[test]
    fn test_stops_when_receiver_dropped() {
        let frames = (0..1000).map(|_| Ok(RgbImage::new(2, 2)));
        let (rx, handle) = spawn_reader(frames, 1);
        let first = rx.recv().unwrap();
        assert!(first.is_ok());
        drop(rx);
        assert!(handle.join().unwrap() < 1000);
    }
}
