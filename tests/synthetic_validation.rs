//! Region matcher checked against a table of synthetic inspection scenarios.
//!
//! Every scenario starts from the same textured scene, derives one captured
//! frame from it, and states the expected verdict.

use holecheck::search::{RegionMatchConfig, RegionMatcher};
use holecheck::{BaselineTemplate, CropSpec, Diagnostic, FrameMatcher, HoleId, ImageView};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

const WIDTH: usize = 300;
const HEIGHT: usize = 240;

const CASES: &str = r#"{
  "matcher": { "scale_min": 0.9, "scale_max": 1.1, "steps": 3 },
  "cases": [
    { "case_id": "identity", "expect_match": true, "location": [110, 80] },
    { "case_id": "shifted", "frame": { "shift": [23, -17] }, "expect_match": true, "location": [133, 63] },
    { "case_id": "low_contrast", "frame": { "gain": 0.5, "bias": 60 }, "expect_match": true, "location": [110, 80] },
    { "case_id": "sensor_noise", "frame": { "noise": 20, "seed": 5 }, "expect_match": true, "location": [110, 80] },
    { "case_id": "obstructed", "frame": { "replace_with_noise": true, "seed": 9 }, "expect_match": false },
    { "case_id": "lens_cap", "frame": { "flat": 0 }, "expect_match": false, "diagnostic": -100.0 }
  ]
}"#;

#[derive(Debug, Deserialize)]
struct Suite {
    matcher: MatcherJson,
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatcherJson {
    threshold: f32,
    scale_min: f32,
    scale_max: f32,
    steps: usize,
}

impl Default for MatcherJson {
    fn default() -> Self {
        let cfg = RegionMatchConfig::default();
        Self {
            threshold: cfg.threshold,
            scale_min: cfg.scale_min,
            scale_max: cfg.scale_max,
            steps: cfg.steps,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Case {
    case_id: String,
    #[serde(default)]
    frame: FrameJson,
    expect_match: bool,
    #[serde(default)]
    location: Option<[usize; 2]>,
    #[serde(default)]
    diagnostic: Option<f32>,
}

/// How the captured frame is derived from the scene.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct FrameJson {
    shift: [i64; 2],
    gain: f32,
    bias: f32,
    noise: i32,
    seed: u64,
    replace_with_noise: bool,
    flat: Option<u8>,
}

impl Default for FrameJson {
    fn default() -> Self {
        Self {
            shift: [0, 0],
            gain: 1.0,
            bias: 0.0,
            noise: 0,
            seed: 0,
            replace_with_noise: false,
            flat: None,
        }
    }
}

/// Texture value at scene coordinates; offset so small shifts stay positive.
fn texture(x: i64, y: i64) -> u8 {
    let (x, y) = ((x + 100) as usize, (y + 100) as usize);
    (((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF) as u8
}

fn render(frame: &FrameJson) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(frame.seed);
    if let Some(value) = frame.flat {
        return vec![value; WIDTH * HEIGHT];
    }
    if frame.replace_with_noise {
        return (0..WIDTH * HEIGHT)
            .map(|_| rng.random_range(0..=255u8))
            .collect();
    }
    let [dx, dy] = frame.shift;
    let mut data = Vec::with_capacity(WIDTH * HEIGHT);
    for y in 0..HEIGHT as i64 {
        for x in 0..WIDTH as i64 {
            let mut v = texture(x - dx, y - dy) as f32 * frame.gain + frame.bias;
            if frame.noise > 0 {
                v += rng.random_range(-frame.noise..=frame.noise) as f32;
            }
            data.push(v.round().clamp(0.0, 255.0) as u8);
        }
    }
    data
}

#[test]
fn synthetic_scenarios_meet_expectations() {
    let suite: Suite = serde_json::from_str(CASES).unwrap();
    let scene = render(&FrameJson::default());
    let scene_view = ImageView::from_slice(&scene, WIDTH, HEIGHT).unwrap();
    let template = BaselineTemplate::crop(scene_view, &CropSpec::default()).unwrap();
    let matcher = RegionMatcher::with_config(
        template,
        RegionMatchConfig {
            threshold: suite.matcher.threshold,
            scale_min: suite.matcher.scale_min,
            scale_max: suite.matcher.scale_max,
            steps: suite.matcher.steps,
            ..RegionMatchConfig::default()
        },
    )
    .unwrap();

    assert_eq!(suite.cases.len(), 6);
    for case in &suite.cases {
        let frame = render(&case.frame);
        let view = ImageView::from_slice(&frame, WIDTH, HEIGHT).unwrap();
        let result = matcher.match_frame(&HoleId::new(case.case_id.as_str()), view);

        assert_eq!(
            result.matched, case.expect_match,
            "{}: score {}",
            case.case_id, result.score
        );
        if let Some([x, y]) = case.location {
            let location = result.location.unwrap();
            assert_eq!((location.x, location.y), (x, y), "{}", case.case_id);
            assert!((location.scale - 1.0).abs() < 1e-3, "{}", case.case_id);
        }
        if let Some(expected) = case.diagnostic {
            assert_eq!(
                result.diagnostic,
                Some(Diagnostic::Percent(expected)),
                "{}",
                case.case_id
            );
        }
        assert_eq!(result.diagnostic.is_some(), !case.expect_match);
    }
}
