//! Inspection run state machine.
//!
//! ```text
//! Idle --start--> Running <--pause flag--> Paused
//!                   |
//!                   +-- capture count reaches total --> processing phase
//!                   +-- processing count reaches total --> Completed
//! any --reset--> Idle
//! ```
//!
//! The orchestrator is the only writer of both counters. The pause flag is
//! written by the operator side and only read here, except that start and
//! reset clear it.

use super::cells::{write_atomic, CounterCell, PauseFlag};
use super::folder::{clear_images, CaptureFolder, ScanOrder, CAPTURE_EXTENSIONS};
use super::progress::{Phase, ProgressView};
use super::report::DefectLog;
use crate::focus::{FocusConfig, FocusGate};
use crate::hole::HoleId;
use crate::image::io::load_gray_image;
use crate::motion::{Ack, ChannelOpener, MotionCommand};
use crate::search::{Diagnostic, FrameMatcher};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{HoleCheckError, HoleCheckResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Holes on one part.
pub const TOTAL_HOLES: u32 = 1587;

/// Diagnostic recorded for frames rejected by the focus check.
pub const RETAKE_DIAGNOSTIC: &str = "Image unable to be used, please retake";

/// Run parameters and the locations of the shared files.
#[derive(Clone, Debug, PartialEq)]
pub struct OrchestratorConfig {
    pub capture_dir: PathBuf,
    pub total_holes: u32,
    /// Delay between folder scans in [`Orchestrator::run`].
    pub poll_interval_ms: u64,
    pub scan_order: ScanOrder,
    pub capture_counter: PathBuf,
    pub processing_counter: PathBuf,
    /// Processing percentage with two decimals.
    pub progress_file: PathBuf,
    pub pause_flag: PathBuf,
    pub report_path: PathBuf,
}

impl OrchestratorConfig {
    /// Default layout with every shared file inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            capture_counter: dir.join("run_count.txt"),
            processing_counter: dir.join("image_counter.txt"),
            progress_file: dir.join("progress.txt"),
            pause_flag: dir.join("pause_flag.txt"),
            report_path: dir.join("holes_needing_cleaning.csv"),
            capture_dir: dir,
            total_holes: TOTAL_HOLES,
            poll_interval_ms: 1000,
            scan_order: ScanOrder::Name,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::in_dir("ImageStorage")
    }
}

/// Clears the pause flag, deletes captured images, and zeroes both counters.
/// Returns how many images were removed.
pub fn clear_run_files(cfg: &OrchestratorConfig) -> HoleCheckResult<usize> {
    PauseFlag::new(&cfg.pause_flag).set(false)?;
    let removed = clear_images(&cfg.capture_dir, CAPTURE_EXTENSIONS)?;
    CounterCell::new(&cfg.capture_counter).write(0)?;
    CounterCell::new(&cfg.processing_counter).write(0)?;
    trace_event!("run_files_cleared", removed = removed);
    Ok(removed)
}

/// Sends the reset frame and returns the controller's status line.
pub fn reset_device<O: ChannelOpener>(opener: &O) -> HoleCheckResult<Option<String>> {
    let mut channel = opener.open()?;
    match channel.send(&MotionCommand::ResetAll)? {
        Ack::Status(line) => Ok(Some(line)),
        _ => Ok(None),
    }
}

/// Orchestrator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Completed,
}

impl RunState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

/// What one scan did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepReport {
    pub state: RunState,
    pub phase: Phase,
    /// Files consumed by this scan, across both phases.
    pub consumed: usize,
}

/// Outcome of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub state: RunState,
    pub captured: u32,
    pub processed: u32,
    pub defects: usize,
    /// Files that could not be decoded.
    pub skipped: Vec<PathBuf>,
    /// Report file, when one was written.
    pub report: Option<PathBuf>,
}

/// Outcome of a reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResetReport {
    pub removed_images: usize,
    /// Controller status line, when the device was reset.
    pub device_status: Option<String>,
}

/// Drives one inspection run over the capture folder.
pub struct Orchestrator<M: FrameMatcher> {
    cfg: OrchestratorConfig,
    matcher: M,
    focus: Option<FocusGate>,
    arrivals: CaptureFolder,
    queue: CaptureFolder,
    capture_counter: CounterCell,
    processing_counter: CounterCell,
    pause: PauseFlag,
    log: DefectLog,
    skipped: Vec<PathBuf>,
    state: RunState,
    phase: Phase,
    captured: u32,
    processed: u32,
    flushed_len: usize,
}

impl<M: FrameMatcher> Orchestrator<M> {
    pub fn new(matcher: M, cfg: OrchestratorConfig) -> Self {
        let log = DefectLog::new(matcher.report_header());
        Self {
            arrivals: CaptureFolder::new(&cfg.capture_dir, cfg.scan_order),
            queue: CaptureFolder::new(&cfg.capture_dir, cfg.scan_order),
            capture_counter: CounterCell::new(&cfg.capture_counter),
            processing_counter: CounterCell::new(&cfg.processing_counter),
            pause: PauseFlag::new(&cfg.pause_flag),
            cfg,
            matcher,
            focus: None,
            log,
            skipped: Vec::new(),
            state: RunState::Idle,
            phase: Phase::Capture,
            captured: 0,
            processed: 0,
            flushed_len: 0,
        }
    }

    /// Rejects blurry frames before matching.
    pub fn with_focus_check(mut self, cfg: FocusConfig) -> Self {
        self.focus = Some(FocusGate::new(cfg));
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.cfg
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn captured(&self) -> u32 {
        self.captured
    }

    pub fn processed(&self) -> u32 {
        self.processed
    }

    pub fn log(&self) -> &DefectLog {
        &self.log
    }

    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    pub fn pause_flag(&self) -> &PauseFlag {
        &self.pause
    }

    /// Progress as an operator would see it.
    pub fn progress(&self) -> ProgressView {
        ProgressView::compute(self.captured, self.processed, self.cfg.total_holes)
    }

    /// Starts a full run: capture phase first, then processing.
    pub fn start(&mut self) -> HoleCheckResult<()> {
        self.begin("start", Phase::Capture)
    }

    /// Starts a processing-only run over images already in the folder.
    pub fn start_processing(&mut self) -> HoleCheckResult<()> {
        self.begin("start processing", Phase::Processing)
    }

    fn begin(&mut self, command: &'static str, phase: Phase) -> HoleCheckResult<()> {
        if self.state != RunState::Idle {
            return Err(HoleCheckError::InvalidStateTransition {
                from: self.state.name(),
                command,
            });
        }
        self.pause.set(false)?;
        if phase == Phase::Capture {
            self.capture_counter.write(0)?;
        }
        self.processing_counter.write(0)?;
        self.captured = 0;
        self.processed = 0;
        self.phase = phase;
        self.state = RunState::Running;
        trace_event!("phase_change", phase = phase.as_str());
        Ok(())
    }

    /// Operator pause; takes effect at the next file boundary.
    pub fn pause(&mut self) -> HoleCheckResult<()> {
        self.pause.set(true)?;
        if self.state == RunState::Running {
            self.state = RunState::Paused;
        }
        Ok(())
    }

    pub fn resume(&mut self) -> HoleCheckResult<()> {
        self.pause.set(false)?;
        if self.state == RunState::Paused {
            self.state = RunState::Running;
        }
        Ok(())
    }

    /// Scans the folder once and consumes every new file the current phase
    /// allows. Re-scanning an unchanged folder consumes nothing.
    pub fn step(&mut self) -> HoleCheckResult<StepReport> {
        match self.state {
            RunState::Idle => {
                return Err(HoleCheckError::InvalidStateTransition {
                    from: self.state.name(),
                    command: "step",
                })
            }
            RunState::Completed => return Ok(self.report(0)),
            RunState::Running | RunState::Paused => {}
        }
        let _span = trace_span!("orchestrator_scan", phase = self.phase.as_str()).entered();

        if self.sync_pause() {
            return Ok(self.report(0));
        }

        let mut consumed = 0usize;
        if self.phase == Phase::Capture {
            consumed += self.count_arrivals()?;
        }
        if self.phase == Phase::Processing && self.state == RunState::Running {
            consumed += self.process_pending()?;
        }
        Ok(self.report(consumed))
    }

    /// Steps until completion or until `stop` is raised, sleeping
    /// `poll_interval_ms` between scans. The defect report is flushed on
    /// every exit path.
    pub fn run(&mut self, stop: &AtomicBool) -> HoleCheckResult<RunSummary> {
        let interval = Duration::from_millis(self.cfg.poll_interval_ms);
        while !stop.load(Ordering::Acquire) {
            if let Err(err) = self.step() {
                if let Err(flush_err) = self.flush() {
                    trace_warn!("defect report flush failed: {flush_err}");
                }
                return Err(err);
            }
            if self.state == RunState::Completed {
                break;
            }
            thread::sleep(interval);
        }
        let report = self.flush()?;
        Ok(RunSummary {
            state: self.state,
            captured: self.captured,
            processed: self.processed,
            defects: self.log.len(),
            skipped: self.skipped.clone(),
            report,
        })
    }

    /// Writes the defect report if it has entries not yet written.
    pub fn flush(&mut self) -> HoleCheckResult<Option<PathBuf>> {
        if self.log.is_empty() {
            trace_event!("report_skipped", reason = "no holes need cleaning");
            return Ok(None);
        }
        if self.log.len() == self.flushed_len {
            return Ok(Some(self.cfg.report_path.clone()));
        }
        self.log.write_csv(&self.cfg.report_path)?;
        self.flushed_len = self.log.len();
        trace_event!("report_written", rows = self.log.len());
        Ok(Some(self.cfg.report_path.clone()))
    }

    /// Clears local state only: pause flag, queued images, both counters.
    pub fn reset_local(&mut self) -> HoleCheckResult<usize> {
        if let Err(err) = self.flush() {
            trace_warn!("defect report flush before reset failed: {err}");
        }
        let removed = clear_run_files(&self.cfg)?;
        self.arrivals.forget_all();
        self.queue.forget_all();
        self.log.clear();
        self.skipped.clear();
        self.flushed_len = 0;
        self.captured = 0;
        self.processed = 0;
        self.phase = Phase::Capture;
        self.state = RunState::Idle;
        Ok(removed)
    }

    /// Full reset. Local state is cleared first so it completes even when the
    /// controller is unreachable; the device error is then returned.
    pub fn reset<O: ChannelOpener>(&mut self, opener: &O) -> HoleCheckResult<ResetReport> {
        let removed_images = self.reset_local()?;
        let device_status = reset_device(opener)?;
        Ok(ResetReport {
            removed_images,
            device_status,
        })
    }

    fn report(&self, consumed: usize) -> StepReport {
        StepReport {
            state: self.state,
            phase: self.phase,
            consumed,
        }
    }

    /// Mirrors the pause flag into the state; returns true when paused.
    fn sync_pause(&mut self) -> bool {
        if self.pause.is_paused() {
            self.state = RunState::Paused;
            true
        } else {
            self.state = RunState::Running;
            false
        }
    }

    fn count_arrivals(&mut self) -> HoleCheckResult<usize> {
        let mut consumed = 0;
        for path in self.arrivals.pending()? {
            if self.captured >= self.cfg.total_holes {
                break;
            }
            self.arrivals.mark_processed(&path);
            self.captured += 1;
            consumed += 1;
            self.capture_counter.write(self.captured)?;
            trace_event!("counter_persisted", phase = "capture", value = self.captured);
        }
        if self.captured >= self.cfg.total_holes {
            self.phase = Phase::Processing;
            self.processed = 0;
            self.processing_counter.write(0)?;
            trace_event!("phase_change", phase = "processing");
        }
        Ok(consumed)
    }

    fn process_pending(&mut self) -> HoleCheckResult<usize> {
        let mut consumed = 0;
        for path in self.queue.pending()? {
            if self.processed >= self.cfg.total_holes {
                break;
            }
            if self.sync_pause() {
                break;
            }
            self.queue.mark_processed(&path);
            self.inspect(&path)?;
            self.processed += 1;
            consumed += 1;
            self.processing_counter.write(self.processed)?;
            let percent = self.processed as f64 / self.cfg.total_holes.max(1) as f64 * 100.0;
            write_atomic(&self.cfg.progress_file, &format!("{percent:.2}"))?;
            trace_event!("counter_persisted", phase = "processing", value = self.processed);
        }
        if self.processed >= self.cfg.total_holes {
            self.state = RunState::Completed;
            trace_event!("phase_change", phase = "completed");
            self.flush()?;
        }
        Ok(consumed)
    }

    /// Matches one frame and records it when it needs attention. Frames that
    /// cannot be decoded are skipped.
    fn inspect(&mut self, path: &Path) -> HoleCheckResult<()> {
        let hole = HoleId::from_path(path);
        if !hole.is_well_formed() {
            trace_warn!("frame {} has an unexpected hole identifier", path.display());
        }
        let frame = match load_gray_image(path) {
            Ok(frame) => frame,
            Err(err) if err.is_per_frame() => {
                trace_warn!("skipping {}: {err}", path.display());
                trace_event!("frame_skipped", hole = hole.as_str());
                self.skipped.push(path.to_path_buf());
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        if let Some(gate) = &self.focus {
            if gate.is_blurry(frame.view()) {
                self.record(hole, Diagnostic::Indeterminate(RETAKE_DIAGNOSTIC.to_string()));
                return Ok(());
            }
        }

        let result = self.matcher.match_frame(&hole, frame.view());
        if !result.matched {
            let diagnostic = result.diagnostic.unwrap_or(Diagnostic::NeedsCleaning);
            self.record(hole, diagnostic);
        }
        Ok(())
    }

    fn record(&mut self, hole: HoleId, diagnostic: Diagnostic) {
        trace_event!("defect_recorded", hole = hole.as_str());
        self.log.push(hole, diagnostic);
    }
}

impl<M: FrameMatcher> Drop for Orchestrator<M> {
    fn drop(&mut self) {
        if self.log.len() != self.flushed_len {
            if let Err(err) = self.flush() {
                trace_warn!("defect report flush on shutdown failed: {err}");
            }
        }
    }
}
