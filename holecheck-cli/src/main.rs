use clap::{Parser, Subcommand};
use holecheck::centering::CenteringOutcome;
use holecheck::image::io::load_gray_image;
use holecheck::inspect::{
    clear_run_files, reset_device, CaptureTrigger, ProgressPoller, ReadyWait, RetakeWorkflow,
    RunSummary, ScanOrder,
};
use holecheck::motion::SerialOpener;
use holecheck::{
    sharpness_score, BaselineTemplate, Calibration, CenteringLoop, CircleConfig, CounterCell,
    CropSpec, FeatureDecision, FeatureMatchConfig, FeatureMatcher, FocusConfig, HoleCheckError,
    HoleCheckResult, HoleCode, InspectionMatcher, MotionConfig, Orchestrator, OrchestratorConfig,
    PauseFlag, ProgressView, RegionMatchConfig, RegionMatcher,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Drilled-hole inspection (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "holecheck.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run an inspection over the capture folder until every hole is processed.
    Inspect {
        /// Skip the capture phase and process the images already present.
        #[arg(long)]
        process_only: bool,
    },
    /// Send a centering correction for the newest frame in the centering folder.
    Center {
        /// Keep correcting, one cycle per interval.
        #[arg(long)]
        watch: bool,
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Move to one hole and capture it again.
    Retake {
        /// Five-character hole code, e.g. A0170.
        code: String,
    },
    /// Clear the capture folder and counters, then reset the controller.
    Reset,
    /// Ask a running inspection to pause.
    Pause,
    /// Resume a paused inspection.
    Resume,
    /// Show run progress.
    Status {
        /// Refresh until processing completes.
        #[arg(long)]
        watch: bool,
    },
    /// Score the sharpness of one image.
    Focus { image: PathBuf },
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
enum StrategyConfig {
    #[default]
    Region,
    Feature,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
enum DecisionConfig {
    #[default]
    Count,
    Geometric,
}

impl From<DecisionConfig> for FeatureDecision {
    fn from(value: DecisionConfig) -> Self {
        match value {
            DecisionConfig::Count => FeatureDecision::Count,
            DecisionConfig::Geometric => FeatureDecision::Geometric,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
enum ScanOrderConfig {
    #[default]
    Name,
    ArrivalTime,
}

impl From<ScanOrderConfig> for ScanOrder {
    fn from(value: ScanOrderConfig) -> Self {
        match value {
            ScanOrderConfig::Name => ScanOrder::Name,
            ScanOrderConfig::ArrivalTime => ScanOrder::ArrivalTime,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CropJson {
    center_x: i64,
    center_y: i64,
    width: usize,
    height: usize,
    offset_x: i64,
    offset_y: i64,
}

impl Default for CropJson {
    fn default() -> Self {
        let spec = CropSpec::default();
        Self {
            center_x: spec.center_x,
            center_y: spec.center_y,
            width: spec.width,
            height: spec.height,
            offset_x: spec.offset_x,
            offset_y: spec.offset_y,
        }
    }
}

impl From<&CropJson> for CropSpec {
    fn from(value: &CropJson) -> Self {
        Self {
            center_x: value.center_x,
            center_y: value.center_y,
            width: value.width,
            height: value.height,
            offset_x: value.offset_x,
            offset_y: value.offset_y,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RegionJson {
    threshold: f32,
    scale_min: f32,
    scale_max: f32,
    steps: usize,
    parallel: bool,
}

impl Default for RegionJson {
    fn default() -> Self {
        let cfg = RegionMatchConfig::default();
        Self {
            threshold: cfg.threshold,
            scale_min: cfg.scale_min,
            scale_max: cfg.scale_max,
            steps: cfg.steps,
            parallel: cfg.parallel,
        }
    }
}

impl From<&RegionJson> for RegionMatchConfig {
    fn from(value: &RegionJson) -> Self {
        Self {
            threshold: value.threshold,
            scale_min: value.scale_min,
            scale_max: value.scale_max,
            steps: value.steps,
            parallel: value.parallel,
            ..RegionMatchConfig::default()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FeatureJson {
    decision: DecisionConfig,
    ratio: f32,
    min_count_matches: usize,
    min_geometric_matches: usize,
    min_inliers: usize,
    reprojection_tolerance: f64,
    ransac_iters: usize,
    seed: u64,
    max_keypoints: usize,
    fast_threshold: u8,
    lsh_tables: usize,
    lsh_key_bits: usize,
}

impl Default for FeatureJson {
    fn default() -> Self {
        let cfg = FeatureMatchConfig::default();
        Self {
            decision: DecisionConfig::Count,
            ratio: cfg.ratio,
            min_count_matches: cfg.min_count_matches,
            min_geometric_matches: cfg.min_geometric_matches,
            min_inliers: cfg.min_inliers,
            reprojection_tolerance: cfg.reprojection_tolerance,
            ransac_iters: cfg.ransac_iters,
            seed: cfg.seed,
            max_keypoints: cfg.max_keypoints,
            fast_threshold: cfg.fast_threshold,
            lsh_tables: cfg.lsh_tables,
            lsh_key_bits: cfg.lsh_key_bits,
        }
    }
}

impl From<&FeatureJson> for FeatureMatchConfig {
    fn from(value: &FeatureJson) -> Self {
        Self {
            decision: value.decision.into(),
            ratio: value.ratio,
            min_count_matches: value.min_count_matches,
            min_geometric_matches: value.min_geometric_matches,
            min_inliers: value.min_inliers,
            reprojection_tolerance: value.reprojection_tolerance,
            ransac_iters: value.ransac_iters,
            seed: value.seed,
            max_keypoints: value.max_keypoints,
            fast_threshold: value.fast_threshold,
            lsh_tables: value.lsh_tables,
            lsh_key_bits: value.lsh_key_bits,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FocusJson {
    enabled: bool,
    threshold: f64,
    max_attempts: usize,
    retry_delay_ms: u64,
}

impl Default for FocusJson {
    fn default() -> Self {
        let cfg = FocusConfig::default();
        Self {
            enabled: false,
            threshold: cfg.threshold,
            max_attempts: cfg.max_attempts,
            retry_delay_ms: cfg.retry_delay.as_millis() as u64,
        }
    }
}

impl From<&FocusJson> for FocusConfig {
    fn from(value: &FocusJson) -> Self {
        Self {
            threshold: value.threshold,
            max_attempts: value.max_attempts,
            retry_delay: Duration::from_millis(value.retry_delay_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CircleJson {
    min_radius: u32,
    max_radius: u32,
    canny_low: f32,
    canny_high: f32,
    dp: f32,
    min_distance: f32,
    param1: f32,
    param2: u32,
}

impl Default for CircleJson {
    fn default() -> Self {
        let cfg = CircleConfig::default();
        Self {
            min_radius: cfg.min_radius,
            max_radius: cfg.max_radius,
            canny_low: cfg.canny_low,
            canny_high: cfg.canny_high,
            dp: cfg.dp,
            min_distance: cfg.min_distance,
            param1: cfg.param1,
            param2: cfg.param2,
        }
    }
}

impl From<&CircleJson> for CircleConfig {
    fn from(value: &CircleJson) -> Self {
        Self {
            min_radius: value.min_radius,
            max_radius: value.max_radius,
            canny_low: value.canny_low,
            canny_high: value.canny_high,
            dp: value.dp,
            min_distance: value.min_distance,
            param1: value.param1,
            param2: value.param2,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CalibrationJson {
    pixels_per_unit: f64,
    scale: f64,
}

impl Default for CalibrationJson {
    fn default() -> Self {
        let cal = Calibration::default();
        Self {
            pixels_per_unit: cal.pixels_per_unit,
            scale: cal.scale,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MotionJson {
    port: String,
    baud_rate: u32,
    read_timeout_ms: u64,
    ack_timeout_ms: u64,
    settle_ms: u64,
}

impl Default for MotionJson {
    fn default() -> Self {
        let cfg = MotionConfig::default();
        Self {
            port: cfg.port,
            baud_rate: cfg.baud_rate,
            read_timeout_ms: cfg.read_timeout_ms,
            ack_timeout_ms: cfg.ack_timeout_ms,
            settle_ms: cfg.settle_ms,
        }
    }
}

impl From<&MotionJson> for MotionConfig {
    fn from(value: &MotionJson) -> Self {
        Self {
            port: value.port.clone(),
            baud_rate: value.baud_rate,
            read_timeout_ms: value.read_timeout_ms,
            ack_timeout_ms: value.ack_timeout_ms,
            settle_ms: value.settle_ms,
        }
    }
}

/// Run layout. Shared files default to the capture folder.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RunJson {
    capture_dir: PathBuf,
    total_holes: u32,
    poll_interval_ms: u64,
    scan_order: ScanOrderConfig,
    capture_counter: Option<PathBuf>,
    processing_counter: Option<PathBuf>,
    progress_file: Option<PathBuf>,
    pause_flag: Option<PathBuf>,
    report_path: Option<PathBuf>,
}

impl Default for RunJson {
    fn default() -> Self {
        let cfg = OrchestratorConfig::default();
        Self {
            capture_dir: cfg.capture_dir,
            total_holes: cfg.total_holes,
            poll_interval_ms: cfg.poll_interval_ms,
            scan_order: ScanOrderConfig::Name,
            capture_counter: None,
            processing_counter: None,
            progress_file: None,
            pause_flag: None,
            report_path: None,
        }
    }
}

impl From<&RunJson> for OrchestratorConfig {
    fn from(value: &RunJson) -> Self {
        let mut cfg = OrchestratorConfig::in_dir(&value.capture_dir);
        cfg.total_holes = value.total_holes;
        cfg.poll_interval_ms = value.poll_interval_ms;
        cfg.scan_order = value.scan_order.into();
        let overrides = [
            (&value.capture_counter, &mut cfg.capture_counter),
            (&value.processing_counter, &mut cfg.processing_counter),
            (&value.progress_file, &mut cfg.progress_file),
            (&value.pause_flag, &mut cfg.pause_flag),
            (&value.report_path, &mut cfg.report_path),
        ];
        for (custom, slot) in overrides {
            if let Some(path) = custom {
                *slot = path.clone();
            }
        }
        cfg
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    baseline_path: PathBuf,
    strategy: StrategyConfig,
    crop: CropJson,
    region: RegionJson,
    feature: FeatureJson,
    focus: FocusJson,
    circle: CircleJson,
    calibration: CalibrationJson,
    motion: MotionJson,
    run: RunJson,
    centering_dir: PathBuf,
    /// Program and arguments that trigger a capture; `{code}` is replaced by
    /// the hole code.
    capture_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baseline_path: PathBuf::from("baseline.jpg"),
            strategy: StrategyConfig::Region,
            crop: CropJson::default(),
            region: RegionJson::default(),
            feature: FeatureJson::default(),
            focus: FocusJson::default(),
            circle: CircleJson::default(),
            calibration: CalibrationJson::default(),
            motion: MotionJson::default(),
            run: RunJson::default(),
            centering_dir: PathBuf::from("CenteringImages"),
            capture_command: Vec::new(),
        }
    }
}

impl Config {
    fn matcher(&self) -> HoleCheckResult<InspectionMatcher> {
        match self.strategy {
            StrategyConfig::Region => {
                let template =
                    BaselineTemplate::from_file(&self.baseline_path, &(&self.crop).into())?;
                let matcher = RegionMatcher::with_config(template, (&self.region).into())?;
                Ok(InspectionMatcher::Region(matcher))
            }
            StrategyConfig::Feature => {
                let baseline = load_gray_image(&self.baseline_path)?;
                let matcher = FeatureMatcher::with_config(baseline, (&self.feature).into())?;
                Ok(InspectionMatcher::Feature(matcher))
            }
        }
    }

    fn opener(&self) -> SerialOpener {
        SerialOpener::new((&self.motion).into())
    }
}

/// Runs the configured external program to take a picture.
struct CommandTrigger {
    argv: Vec<String>,
}

impl CaptureTrigger for CommandTrigger {
    fn trigger(&mut self, code: &HoleCode) -> HoleCheckResult<()> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(HoleCheckError::Configuration {
                reason: "capture_command is empty".into(),
            });
        };
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.replace("{code}", code.as_str()))
            .collect();
        let status = Command::new(program)
            .args(&args)
            .status()
            .map_err(|e| HoleCheckError::io(format!("running {program}"), &e))?;
        if !status.success() {
            return Err(HoleCheckError::Io {
                context: format!("running {program}"),
                reason: format!("exited with {status}"),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RunRecord {
    state: &'static str,
    captured: u32,
    processed: u32,
    defects: usize,
    skipped: Vec<String>,
    report: Option<String>,
}

impl From<RunSummary> for RunRecord {
    fn from(value: RunSummary) -> Self {
        Self {
            state: value.state.name(),
            captured: value.captured,
            processed: value.processed,
            defects: value.defects,
            skipped: value
                .skipped
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            report: value.report.map(|p| p.display().to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ProgressRecord {
    phase: &'static str,
    count: u32,
    total: u32,
    percent: f64,
    label: String,
    complete: bool,
    paused: bool,
}

impl ProgressRecord {
    fn new(view: &ProgressView, paused: bool) -> Self {
        Self {
            phase: view.phase.as_str(),
            count: view.count,
            total: view.total,
            percent: view.percent,
            label: view.label.clone(),
            complete: view.complete,
            paused,
        }
    }
}

#[derive(Debug, Serialize)]
struct CenteringRecord {
    image: Option<String>,
    center: Option<[f32; 3]>,
    offset_px: Option<i32>,
    command: Option<String>,
}

impl From<CenteringOutcome> for CenteringRecord {
    fn from(value: CenteringOutcome) -> Self {
        match value {
            CenteringOutcome::NoImages => Self {
                image: None,
                center: None,
                offset_px: None,
                command: None,
            },
            CenteringOutcome::NoCircle { path } => Self {
                image: Some(path.display().to_string()),
                center: None,
                offset_px: None,
                command: None,
            },
            CenteringOutcome::Sent { path, correction } => Self {
                image: Some(path.display().to_string()),
                center: Some([
                    correction.center.x,
                    correction.center.y,
                    correction.center.radius,
                ]),
                offset_px: Some(correction.offset_px),
                command: Some(correction.command.encode().trim_end().to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ResetRecord {
    removed_images: usize,
    device_status: Option<String>,
}

#[derive(Debug, Serialize)]
struct FocusRecord {
    image: String,
    score: f64,
    threshold: f64,
    blurry: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Raises `stop` on Ctrl-C or SIGTERM, so an interrupted inspection run
/// finishes its current step and writes the defect report.
fn stop_on_signal(stop: Arc<AtomicBool>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    // Handlers are installed before the run starts.
    let shutdown = {
        let _guard = runtime.enter();
        shutdown_signal()?
    };
    std::thread::spawn(move || {
        runtime.block_on(shutdown);
        tracing::info!("shutdown signal received, stopping after the current step");
        stop.store(true, Ordering::Release);
    });
    Ok(())
}

#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {},
            _ = terminate.recv() => {},
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("holecheck=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }
    let Some(command) = cli.command else {
        return Err("no command given; see --help".into());
    };

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.run.total_holes == 0 {
        return Err("run.total_holes must be at least 1".into());
    }
    let run_cfg = OrchestratorConfig::from(&config.run);

    match command {
        Cmd::Inspect { process_only } => {
            let matcher = config.matcher()?;
            tracing::info!(strategy = matcher.name(), "matcher ready");
            let mut orch = Orchestrator::new(matcher, run_cfg);
            if config.focus.enabled {
                orch = orch.with_focus_check((&config.focus).into());
            }
            if process_only {
                orch.start_processing()?;
            } else {
                orch.start()?;
            }
            let stop = Arc::new(AtomicBool::new(false));
            stop_on_signal(Arc::clone(&stop))?;
            let summary = orch.run(&stop)?;
            print_json(&RunRecord::from(summary))?;
        }
        Cmd::Center { watch, interval_ms } => {
            let centering = CenteringLoop::new(
                (&config.circle).into(),
                Calibration {
                    pixels_per_unit: config.calibration.pixels_per_unit,
                    scale: config.calibration.scale,
                },
            );
            let opener = config.opener();
            loop {
                let outcome = centering.correct_latest(&config.centering_dir, &opener)?;
                print_json(&CenteringRecord::from(outcome))?;
                if !watch {
                    break;
                }
                std::thread::sleep(Duration::from_millis(interval_ms));
            }
        }
        Cmd::Retake { code } => {
            let workflow = RetakeWorkflow::new(config.opener(), ReadyWait::Indefinite);
            let mut trigger = CommandTrigger {
                argv: config.capture_command.clone(),
            };
            let code = workflow.run(&code, &mut trigger)?;
            println!("retake of {code} captured");
        }
        Cmd::Reset => {
            let removed_images = clear_run_files(&run_cfg)?;
            let device_status = reset_device(&config.opener())?;
            print_json(&ResetRecord {
                removed_images,
                device_status,
            })?;
        }
        Cmd::Pause => PauseFlag::new(&run_cfg.pause_flag).set(true)?,
        Cmd::Resume => PauseFlag::new(&run_cfg.pause_flag).set(false)?,
        Cmd::Status { watch } => {
            let capture = CounterCell::new(&run_cfg.capture_counter);
            let processing = CounterCell::new(&run_cfg.processing_counter);
            let pause = PauseFlag::new(&run_cfg.pause_flag);
            if !watch {
                let view = ProgressView::read(&capture, &processing, run_cfg.total_holes);
                print_json(&ProgressRecord::new(&view, pause.is_paused()))?;
                return Ok(());
            }
            let (tx, rx) = mpsc::channel();
            let poller = ProgressPoller::spawn(
                capture,
                processing,
                pause,
                run_cfg.total_holes,
                Duration::from_secs(1),
                move |view: &ProgressView| {
                    let _ = tx.send(view.clone());
                },
            );
            for view in rx {
                println!("{}", view.label);
                if view.complete {
                    break;
                }
            }
            poller.stop();
        }
        Cmd::Focus { image } => {
            let frame = load_gray_image(&image)?;
            let score = sharpness_score(frame.view());
            print_json(&FocusRecord {
                image: image.display().to_string(),
                score,
                threshold: config.focus.threshold,
                blurry: score < config.focus.threshold,
            })?;
        }
    }

    Ok(())
}
