//! holecheck inspects drilled holes against a known-good baseline and keeps
//! the positioning stage centered on them.
//!
//! The crate provides the template store, the focus gate, two matching
//! strategies (multi-scale normalized correlation and sparse feature
//! matching), the hole-center detector, the motion controller protocol, and
//! the inspection run state machine. Correlation scans can run in parallel
//! via the `rayon` feature; the serial transport sits behind `serial`.

pub mod bank;
mod candidate;
pub mod centering;
pub mod circle;
pub mod features;
pub mod focus;
pub mod hole;
pub mod image;
pub mod inspect;
pub mod kernel;
pub mod motion;
pub mod search;
pub mod template;
mod trace;
pub mod util;

pub use candidate::Peak;
pub use centering::{CenteringLoop, CenteringOutcome, Correction};
pub use circle::{detect_center, pixel_offset, Calibration, CircleCenter, CircleConfig};
pub use focus::{is_blurry, sharpness_score, FocusConfig, FocusGate, FocusOutcome, FocusRig};
pub use hole::{HoleCode, HoleId};
pub use image::pyramid::ImagePyramid;
pub use image::{ImageView, OwnedImage};
pub use inspect::{
    CounterCell, DefectLog, Orchestrator, OrchestratorConfig, PauseFlag, Phase, ProgressView,
    RunState,
};
pub use kernel::scalar::ZnccScalar;
pub use kernel::{Kernel, ScanParams};
pub use motion::{Ack, ChannelOpener, MotionChannel, MotionCommand, MotionConfig};
pub use search::{
    Diagnostic, FeatureDecision, FeatureMatchConfig, FeatureMatcher, FrameMatcher,
    InspectionMatcher, MatchLocation, MatchResult, RegionMatchConfig, RegionMatcher,
};
pub use template::{BaselineTemplate, CropSpec, TemplatePlan};
pub use util::{HoleCheckError, HoleCheckResult};
