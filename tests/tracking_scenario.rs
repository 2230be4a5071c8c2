// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 端到端场景: 静止背景上匀速运动的矩形
use std::collections::BTreeSet;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use kcf_mot::{BBox, MotConfig, MotPipeline};

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;
const OBJ_W: u32 = 16;
const OBJ_H: u32 = 24;
const APPEAR_AT: u64 = 10;
const LAST_FRAME: u64 = 40;
const SPEED: u64 = 3;

fn object_box(index: u64) -> Option<BBox> {
    (index >= APPEAR_AT).then(|| {
        let x = 20 + (index - APPEAR_AT) * SPEED;
        BBox::new(x as f32, 48.0, OBJ_W as f32, OBJ_H as f32)
    })
}

/// 双色矩形 (左亮右暗), 背景灰度 60
fn render(index: u64) -> RgbImage {
    let mut frame = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([60, 60, 60]));
    if let Some(b) = object_box(index) {
        let (x, y) = (b.x as i32, b.y as i32);
        draw_filled_rect_mut(&mut frame, Rect::at(x, y).of_size(OBJ_W / 2, OBJ_H), Rgb([220, 220, 220]));
        draw_filled_rect_mut(
            &mut frame,
            Rect::at(x + OBJ_W as i32 / 2, y).of_size(OBJ_W / 2, OBJ_H),
            Rgb([160, 160, 160]),
        );
    }
    frame
}

fn config() -> MotConfig {
    let mut config = MotConfig::default();
    config.detector.warmup_frames = 5;
    config.detector.detection_interval = 5;
    config
}

#[test]
fn constant_velocity_rectangle_keeps_one_identity() {
    let mut pipeline = MotPipeline::new(&render(0), &config()).unwrap();
    let mut ids = BTreeSet::new();

    for index in 1..=LAST_FRAME {
        let result = pipeline.process(&render(index)).unwrap();
        assert_eq!(result.frame_index, index);

        match object_box(index) {
            None => assert!(result.tracked.is_empty(), "frame {}: unexpected track", index),
            Some(truth) => {
                assert_eq!(result.tracked.len(), 1, "frame {}", index);
                let track = &result.tracked[0];
                let iou = track.bbox.iou(&truth);
                assert!(iou > 0.5, "frame {}: iou {} box {:?}", index, iou, track.bbox);
                ids.insert(track.id);
            }
        }
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(pipeline.associator().total_ids(), 1);
}

#[test]
fn detections_only_on_cycle_frames() {
    let mut pipeline = MotPipeline::new(&render(0), &config()).unwrap();
    for index in 1..=20 {
        let result = pipeline.process(&render(index)).unwrap();
        assert_eq!(result.detections.is_some(), index % 5 == 0, "frame {}", index);
        if index == APPEAR_AT {
            let dets = result.detections.unwrap();
            assert_eq!(dets.len(), 1);
            assert!(dets[0].bbox.iou(&object_box(index).unwrap()) > 0.8);
        }
    }
}

#[test]
fn object_leaving_scene_releases_track() {
    let mut pipeline = MotPipeline::new(&render(0), &config()).unwrap();
    for index in 1..=APPEAR_AT {
        pipeline.process(&render(index)).unwrap();
    }
    assert_eq!(pipeline.associator().active_count(), 1);

    // 目标消失后连续 3 个检测周期没有匹配
    let empty = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([60, 60, 60]));
    for _ in 0..15 {
        pipeline.process(&empty).unwrap();
    }
    assert_eq!(pipeline.associator().active_count(), 0);
}
