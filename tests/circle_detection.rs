mod common;

use common::{disk_frame, ring_frame, MockOpener, MockPort};
use holecheck::centering::{CenteringLoop, CenteringOutcome};
use holecheck::image::io::save_gray_image;
use holecheck::{detect_center, CircleConfig, ImageView, MotionCommand, OwnedImage};

#[test]
fn detects_synthetic_disk_center() {
    let (w, h) = (320, 240);
    let frame = disk_frame(w, h, 160.0, 120.0, 60.0);
    let view = ImageView::from_slice(&frame, w, h).unwrap();
    let center = detect_center(view, &CircleConfig::default()).expect("circle");
    assert!((center.x - 160.0).abs() <= 3.0, "x {}", center.x);
    assert!((center.y - 120.0).abs() <= 3.0, "y {}", center.y);
    assert!((center.radius - 60.0).abs() <= 3.0, "r {}", center.radius);
}

fn assert_found(frame: &[u8], w: usize, h: usize, cx: f32, cy: f32, r: f32) {
    let view = ImageView::from_slice(frame, w, h).unwrap();
    let center = detect_center(view, &CircleConfig::default()).expect("circle");
    assert!(
        (center.x - cx).abs() <= 2.0 && (center.y - cy).abs() <= 2.0,
        "expected ({cx}, {cy}), got ({}, {})",
        center.x,
        center.y
    );
    assert!(
        (center.radius - r).abs() <= 3.0,
        "expected r {r}, got {}",
        center.radius
    );
}

#[test]
fn locates_disks_across_the_frame() {
    let (w, h) = (640, 480);
    for &(cx, cy, r) in &[(200.0, 150.0, 90.0), (320.0, 240.0, 150.0), (450.0, 300.0, 70.0)] {
        assert_found(&disk_frame(w, h, cx, cy, r), w, h, cx, cy, r);
    }
}

#[test]
fn locates_outline_rings() {
    let (w, h) = (640, 480);
    for &(cx, cy, r) in &[(200.0, 150.0, 90.0), (160.0, 130.0, 60.0)] {
        assert_found(&ring_frame(w, h, cx, cy, r), w, h, cx, cy, r);
    }
}

#[test]
fn flat_frame_has_no_circle() {
    let data = vec![90u8; 320 * 240];
    let view = ImageView::from_slice(&data, 320, 240).unwrap();
    assert!(detect_center(view, &CircleConfig::default()).is_none());
}

#[test]
fn straight_edges_are_not_circles() {
    let (w, h) = (320, 240);
    let mut data = vec![40u8; w * h];
    for y in 0..h {
        for x in 100..140 {
            data[y * w + x] = 200;
        }
    }
    let view = ImageView::from_slice(&data, w, h).unwrap();
    assert!(detect_center(view, &CircleConfig::default()).is_none());
}

#[test]
fn radius_outside_range_is_ignored() {
    let (w, h) = (320, 240);
    let frame = disk_frame(w, h, 160.0, 120.0, 20.0);
    let view = ImageView::from_slice(&frame, w, h).unwrap();
    assert!(detect_center(view, &CircleConfig::default()).is_none());
}

#[test]
fn correction_follows_center_offset() {
    let (w, h) = (320, 240);
    let frame = disk_frame(w, h, 178.0, 120.0, 60.0);
    let view = ImageView::from_slice(&frame, w, h).unwrap();
    let correction = CenteringLoop::default()
        .compute_correction(view)
        .expect("circle");
    assert!((17..=19).contains(&correction.offset_px), "{correction:?}");
    assert!((7..=8).contains(&correction.units));
    assert_eq!(correction.command, MotionCommand::MoveBy(correction.units));
}

#[test]
fn centering_sends_command_for_latest_frame() {
    let dir = tempfile::tempdir().unwrap();
    let blank = OwnedImage::filled(320, 240, 90).unwrap();
    save_gray_image(&blank, dir.path().join("A0001.png")).unwrap();
    // Make sure the disk frame is strictly newer.
    std::thread::sleep(std::time::Duration::from_millis(20));
    let disk = OwnedImage::new(disk_frame(320, 240, 140.0, 120.0, 60.0), 320, 240).unwrap();
    save_gray_image(&disk, dir.path().join("A0002.png")).unwrap();

    let port = MockPort::default();
    let opener = MockOpener::new(port.clone());
    let outcome = CenteringLoop::default()
        .correct_latest(dir.path(), &opener)
        .unwrap();
    match outcome {
        CenteringOutcome::Sent { path, correction } => {
            assert!(path.ends_with("A0002.png"));
            assert!(correction.units < 0);
            assert_eq!(port.written(), correction.command.encode());
            assert!(port.written().starts_with("TN"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(opener.opened(), 1);
}

#[test]
fn centering_without_circle_leaves_device_alone() {
    let dir = tempfile::tempdir().unwrap();
    let opener = MockOpener::new(MockPort::default());
    let loop_ = CenteringLoop::default();
    assert_eq!(
        loop_.correct_latest(dir.path(), &opener).unwrap(),
        CenteringOutcome::NoImages
    );

    let blank = OwnedImage::filled(320, 240, 90).unwrap();
    save_gray_image(&blank, dir.path().join("A0001.png")).unwrap();
    assert!(matches!(
        loop_.correct_latest(dir.path(), &opener).unwrap(),
        CenteringOutcome::NoCircle { .. }
    ));
    assert_eq!(opener.opened(), 0);
}
