use holecheck::image::io::save_gray_image;
use holecheck::inspect::RunState;
use holecheck::search::{RegionMatchConfig, RegionMatcher};
use holecheck::{
    BaselineTemplate, CropSpec, InspectionMatcher, Orchestrator, OrchestratorConfig, OwnedImage,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::sync::atomic::AtomicBool;

const W: usize = 300;
const H: usize = 240;

fn scene(dx: usize, dy: usize) -> OwnedImage {
    let mut data = Vec::with_capacity(W * H);
    for y in 0..H {
        for x in 0..W {
            let (sx, sy) = (x + 100 - dx, y + 100 - dy);
            data.push((((sx * 13) ^ (sy * 7) ^ (sx * sy)) & 0xFF) as u8);
        }
    }
    OwnedImage::new(data, W, H).unwrap()
}

fn debris(seed: u64) -> OwnedImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..W * H).map(|_| rng.random_range(0..=255u8)).collect();
    OwnedImage::new(data, W, H).unwrap()
}

#[test]
fn region_pipeline_reports_only_the_dirty_hole() {
    let root = tempfile::tempdir().unwrap();
    let baseline_path = root.path().join("baseline.png");
    save_gray_image(&scene(0, 0), &baseline_path).unwrap();

    let capture_dir = root.path().join("ImageStorage");
    fs::create_dir(&capture_dir).unwrap();
    save_gray_image(&scene(0, 0), capture_dir.join("A0001.png")).unwrap();
    save_gray_image(&debris(3), capture_dir.join("A0002.png")).unwrap();
    save_gray_image(&scene(12, 9), capture_dir.join("A0003.png")).unwrap();

    let template = BaselineTemplate::from_file(&baseline_path, &CropSpec::default()).unwrap();
    let matcher = RegionMatcher::with_config(
        template,
        RegionMatchConfig {
            scale_min: 0.9,
            scale_max: 1.1,
            steps: 3,
            ..RegionMatchConfig::default()
        },
    )
    .unwrap();

    let cfg = OrchestratorConfig {
        total_holes: 3,
        poll_interval_ms: 1,
        ..OrchestratorConfig::in_dir(&capture_dir)
    };
    let mut orch = Orchestrator::new(InspectionMatcher::Region(matcher), cfg.clone());
    orch.start_processing().unwrap();
    let summary = orch.run(&AtomicBool::new(false)).unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.defects, 1);
    assert!(summary.skipped.is_empty());

    let csv = fs::read_to_string(&cfg.report_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Hole Number,Percent difference from Baseline Image")
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with("A0002,"), "{row}");
    assert!(row.ends_with('%'), "{row}");
    assert!(lines.next().is_none());
    assert_eq!(fs::read_to_string(&cfg.progress_file).unwrap(), "100.00");
}
