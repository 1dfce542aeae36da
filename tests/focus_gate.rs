use holecheck::{
    is_blurry, sharpness_score, FocusConfig, FocusGate, FocusOutcome, FocusRig, HoleCheckError,
    HoleCheckResult, OwnedImage,
};
use std::collections::VecDeque;
use std::time::Duration;

fn checkerboard(w: usize, h: usize, cell: usize) -> OwnedImage {
    let data = (0..w * h)
        .map(|i| {
            let (x, y) = (i % w, i / w);
            if (x / cell + y / cell) % 2 == 0 {
                30
            } else {
                220
            }
        })
        .collect();
    OwnedImage::new(data, w, h).unwrap()
}

fn flat(w: usize, h: usize) -> OwnedImage {
    OwnedImage::filled(w, h, 128).unwrap()
}

/// Replays a fixed sequence of preview frames.
#[derive(Default)]
struct ScriptedRig {
    previews: VecDeque<OwnedImage>,
    adjustments: usize,
    captures: usize,
}

impl FocusRig for ScriptedRig {
    fn preview(&mut self) -> HoleCheckResult<OwnedImage> {
        self.previews
            .pop_front()
            .ok_or(HoleCheckError::InvalidInput("no preview left"))
    }

    fn adjust_focus(&mut self) -> HoleCheckResult<()> {
        self.adjustments += 1;
        Ok(())
    }

    fn capture(&mut self) -> HoleCheckResult<()> {
        self.captures += 1;
        Ok(())
    }
}

fn gate() -> FocusGate {
    FocusGate::new(FocusConfig {
        retry_delay: Duration::ZERO,
        ..FocusConfig::default()
    })
}

#[test]
fn sharp_texture_outscores_flat_frame() {
    let sharp = checkerboard(64, 64, 4);
    let blank = flat(64, 64);
    assert!(sharpness_score(sharp.view()) > 1000.0);
    assert_eq!(sharpness_score(blank.view()), 0.0);
    assert!(is_blurry(blank.view(), 100.0));
    assert!(!is_blurry(sharp.view(), 100.0));
}

#[test]
fn captures_after_refocusing() {
    let mut rig = ScriptedRig {
        previews: VecDeque::from([flat(32, 32), checkerboard(32, 32, 4)]),
        ..ScriptedRig::default()
    };
    let outcome = gate().capture_with_focus_check(&mut rig).unwrap();
    assert!(matches!(outcome, FocusOutcome::Captured { attempts: 2, .. }));
    assert_eq!(rig.adjustments, 1);
    assert_eq!(rig.captures, 1);
}

#[test]
fn gives_up_after_max_attempts() {
    let mut rig = ScriptedRig {
        previews: (0..5).map(|_| flat(32, 32)).collect(),
        ..ScriptedRig::default()
    };
    let outcome = gate().capture_with_focus_check(&mut rig).unwrap();
    assert_eq!(
        outcome,
        FocusOutcome::GaveUp {
            attempts: 3,
            last_score: 0.0,
        }
    );
    assert_eq!(rig.adjustments, 3);
    assert_eq!(rig.captures, 0);
    assert_eq!(rig.previews.len(), 2);
}

#[test]
fn preview_failure_propagates() {
    let mut rig = ScriptedRig::default();
    assert!(gate().capture_with_focus_check(&mut rig).is_err());
    assert_eq!(rig.captures, 0);
}
