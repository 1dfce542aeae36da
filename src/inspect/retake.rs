//! Operator-requested retake of a single hole.

use crate::hole::HoleCode;
use crate::motion::{ChannelOpener, MotionCommand};
use crate::trace::{trace_event, trace_span};
use crate::util::HoleCheckResult;

/// Side effect that makes the external capture software take a picture.
pub trait CaptureTrigger {
    fn trigger(&mut self, code: &HoleCode) -> HoleCheckResult<()>;
}

impl<F> CaptureTrigger for F
where
    F: FnMut(&HoleCode) -> HoleCheckResult<()>,
{
    fn trigger(&mut self, code: &HoleCode) -> HoleCheckResult<()> {
        self(code)
    }
}

/// How long to wait for the controller to report it is positioned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadyWait {
    /// Give up after the channel's acknowledgement timeout.
    Bounded,
    /// Wait until the controller answers.
    #[default]
    Indefinite,
}

/// Validate, position, capture.
pub struct RetakeWorkflow<O> {
    opener: O,
    wait: ReadyWait,
}

impl<O: ChannelOpener> RetakeWorkflow<O> {
    pub fn new(opener: O, wait: ReadyWait) -> Self {
        Self { opener, wait }
    }

    /// Runs a retake for the operator input `code`.
    ///
    /// Invalid codes are rejected before the device is touched. The capture
    /// is triggered only after the controller reports ready.
    pub fn run<T: CaptureTrigger>(&self, code: &str, trigger: &mut T) -> HoleCheckResult<HoleCode> {
        let code = HoleCode::parse(code)?;
        let _span = trace_span!("retake", code = code.as_str()).entered();
        {
            let mut channel = self.opener.open()?;
            match self.wait {
                ReadyWait::Bounded => channel.send(&MotionCommand::RetakeHole(code.clone()))?,
                ReadyWait::Indefinite => channel.send_and_wait_ready(&code)?,
            };
        }
        trigger.trigger(&code)?;
        trace_event!("retake_captured", code = code.as_str());
        Ok(code)
    }
}
