//! Inspection runs: shared persisted cells, the capture folder queue, the
//! defect report, operator progress, retakes and the run state machine.

pub mod cells;
pub mod folder;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod retake;

pub use cells::{CounterCell, PauseFlag};
pub use folder::{
    clear_images, latest_image, CaptureFolder, ScanOrder, CAPTURE_EXTENSIONS, CENTERING_EXTENSIONS,
};
pub use orchestrator::{
    clear_run_files, reset_device, Orchestrator, OrchestratorConfig, ResetReport, RunState,
    RunSummary, StepReport, RETAKE_DIAGNOSTIC, TOTAL_HOLES,
};
pub use progress::{Phase, ProgressPoller, ProgressView};
pub use report::{DefectEntry, DefectLog};
pub use retake::{CaptureTrigger, ReadyWait, RetakeWorkflow};
