use holecheck::search::{RegionMatchConfig, RegionMatcher, NO_SCALE_SCORE};
use holecheck::{BaselineTemplate, CropSpec, Diagnostic, FrameMatcher, HoleId, ImageView};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn make_baseline(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as u8);
        }
    }
    data
}

fn noise(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height).map(|_| rng.random_range(0..=255u8)).collect()
}

#[test]
fn baseline_frame_matches_its_own_template() {
    let (w, h) = (300, 240);
    let baseline = make_baseline(w, h);
    let view = ImageView::from_slice(&baseline, w, h).unwrap();
    let template = BaselineTemplate::crop(view, &CropSpec::default()).unwrap();
    let cfg = RegionMatchConfig {
        scale_min: 0.9,
        scale_max: 1.1,
        steps: 3,
        ..RegionMatchConfig::default()
    };
    let matcher = RegionMatcher::with_config(template, cfg).unwrap();

    let result = matcher.match_frame(&HoleId::new("A0170"), view);
    assert!(result.matched);
    assert!(result.score > 0.999, "score {}", result.score);
    assert!(result.diagnostic.is_none());
    let location = result.location.unwrap();
    assert_eq!((location.x, location.y), (110, 80));
    assert_eq!((location.width, location.height), (50, 50));
}

#[test]
fn unrelated_frame_is_flagged_with_percentage() {
    let template = BaselineTemplate::new(make_baseline(40, 40), 40, 40).unwrap();
    let cfg = RegionMatchConfig {
        steps: 3,
        ..RegionMatchConfig::default()
    };
    let matcher = RegionMatcher::with_config(template, cfg).unwrap();
    let frame = noise(120, 100, 7);
    let view = ImageView::from_slice(&frame, 120, 100).unwrap();

    let result = matcher.match_frame(&HoleId::new("A0171"), view);
    assert!(!result.matched);
    assert!(result.score < 0.6);
    match result.diagnostic {
        Some(Diagnostic::Percent(pct)) => {
            assert!((pct - result.score * 100.0).abs() < 1e-4);
            assert_eq!(
                Diagnostic::Percent(pct).to_string(),
                format!("{:.2}%", result.score * 100.0)
            );
        }
        other => panic!("unexpected diagnostic {other:?}"),
    }
}

#[test]
fn sweep_containing_unit_scale_is_never_worse() {
    let (w, h) = (160, 120);
    let mut frame = noise(w, h, 3);
    let tpl_data = make_baseline(36, 28);
    let (x0, y0) = (61, 37);
    for y in 0..28 {
        for x in 0..36 {
            frame[(y0 + y) * w + x0 + x] = tpl_data[y * 36 + x];
        }
    }
    let view = ImageView::from_slice(&frame, w, h).unwrap();

    let unit = RegionMatcher::with_config(
        BaselineTemplate::new(tpl_data.clone(), 36, 28).unwrap(),
        RegionMatchConfig {
            scale_min: 1.0,
            scale_max: 1.0,
            steps: 1,
            ..RegionMatchConfig::default()
        },
    )
    .unwrap()
    .sweep(view);
    let swept = RegionMatcher::with_config(
        BaselineTemplate::new(tpl_data, 36, 28).unwrap(),
        RegionMatchConfig {
            scale_min: 0.8,
            scale_max: 1.2,
            steps: 5,
            ..RegionMatchConfig::default()
        },
    )
    .unwrap()
    .sweep(view);

    assert!(unit.matched);
    assert!(swept.score >= unit.score);
    let loc = swept.location.unwrap();
    assert_eq!((loc.x, loc.y), (x0, y0));
}

#[test]
fn template_larger_than_frame_reports_sentinel() {
    let template = BaselineTemplate::new(make_baseline(64, 64), 64, 64).unwrap();
    let matcher = RegionMatcher::new(template).unwrap();
    let frame = noise(40, 40, 1);
    let result = matcher.match_frame(
        &HoleId::new("B0001"),
        ImageView::from_slice(&frame, 40, 40).unwrap(),
    );
    assert!(!result.matched);
    assert_eq!(result.score, NO_SCALE_SCORE);
    assert_eq!(result.diagnostic, Some(Diagnostic::Percent(-100.0)));
}

#[cfg(feature = "rayon")]
#[test]
fn parallel_scan_matches_sequential() {
    let (w, h) = (180, 140);
    let frame = make_baseline(w, h);
    let view = ImageView::from_slice(&frame, w, h).unwrap();
    let crop = CropSpec {
        center_x: 90,
        center_y: 70,
        width: 30,
        height: 24,
        offset_x: 0,
        offset_y: 0,
    };
    let make = |parallel| {
        RegionMatcher::with_config(
            BaselineTemplate::crop(view, &crop).unwrap(),
            RegionMatchConfig {
                steps: 5,
                parallel,
                ..RegionMatchConfig::default()
            },
        )
        .unwrap()
    };
    let seq = make(false).sweep(view);
    let par = make(true).sweep(view);
    assert_eq!(seq, par);
}
