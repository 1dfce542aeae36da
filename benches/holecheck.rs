use criterion::{criterion_group, criterion_main, Criterion};
use holecheck::features::{extract, DetectorConfig};
use holecheck::search::{FeatureMatcher, RegionMatchConfig, RegionMatcher};
use holecheck::{
    detect_center, BaselineTemplate, CircleConfig, CropSpec, FrameMatcher, HoleId, ImageView,
    OwnedImage,
};
use std::hint::black_box;

fn make_image(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as u8);
        }
    }
    data
}

fn make_disk(width: usize, height: usize, radius: f32) -> Vec<u8> {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    (0..width * height)
        .map(|i| {
            let dx = (i % width) as f32 - cx;
            let dy = (i / width) as f32 - cy;
            if dx * dx + dy * dy <= radius * radius {
                200
            } else {
                40
            }
        })
        .collect()
}

fn bench_region(c: &mut Criterion) {
    let (w, h) = (640, 480);
    let frame = make_image(w, h);
    let view = ImageView::from_slice(&frame, w, h).unwrap();
    let template = BaselineTemplate::crop(view, &CropSpec::default()).unwrap();
    let hole = HoleId::new("A0170");

    let sequential = RegionMatcher::with_config(
        template.clone(),
        RegionMatchConfig {
            parallel: false,
            ..RegionMatchConfig::default()
        },
    )
    .unwrap();
    c.bench_function("region_sweep_20_scales", |b| {
        b.iter(|| black_box(sequential.match_frame(&hole, view)));
    });

    #[cfg(feature = "rayon")]
    {
        let parallel = RegionMatcher::with_config(
            template,
            RegionMatchConfig {
                parallel: true,
                ..RegionMatchConfig::default()
            },
        )
        .unwrap();
        c.bench_function("region_sweep_20_scales_rayon", |b| {
            b.iter(|| black_box(parallel.match_frame(&hole, view)));
        });
    }
}

fn bench_features(c: &mut Criterion) {
    let (w, h) = (640, 480);
    let frame = make_image(w, h);
    let view = ImageView::from_slice(&frame, w, h).unwrap();

    c.bench_function("feature_extract", |b| {
        b.iter(|| black_box(extract(view, &DetectorConfig::default()).unwrap()));
    });

    let baseline = OwnedImage::new(frame.clone(), w, h).unwrap();
    let matcher = FeatureMatcher::new(baseline).unwrap();
    let hole = HoleId::new("A0170");
    c.bench_function("feature_match_count", |b| {
        b.iter(|| black_box(matcher.match_frame(&hole, view)));
    });
}

fn bench_circle(c: &mut Criterion) {
    let (w, h) = (640, 480);
    let frame = make_disk(w, h, 120.0);
    let view = ImageView::from_slice(&frame, w, h).unwrap();
    let cfg = CircleConfig::default();
    c.bench_function("circle_detect", |b| {
        b.iter(|| black_box(detect_center(view, &cfg)));
    });
}

criterion_group!(benches, bench_region, bench_features, bench_circle);
criterion_main!(benches);
