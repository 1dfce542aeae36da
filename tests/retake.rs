mod common;

use common::{MockOpener, MockPort};
use holecheck::inspect::{ReadyWait, RetakeWorkflow};
use holecheck::{HoleCheckError, HoleCheckResult, HoleCode};

#[test]
fn invalid_code_never_touches_the_device() {
    let opener = MockOpener::new(MockPort::with_replies(b"1\n"));
    let workflow = RetakeWorkflow::new(opener.clone(), ReadyWait::Bounded);
    let mut triggered = 0;
    let mut trigger = |_: &HoleCode| -> HoleCheckResult<()> {
        triggered += 1;
        Ok(())
    };
    let err = workflow.run("A01", &mut trigger).unwrap_err();
    assert!(matches!(err, HoleCheckError::InvalidHoleCode { .. }));
    assert_eq!(triggered, 0);
    assert_eq!(opener.opened(), 0);
}

#[test]
fn capture_follows_ready_acknowledgement() {
    let port = MockPort::with_replies(b"1\n");
    let opener = MockOpener::new(port.clone());
    let workflow = RetakeWorkflow::new(opener, ReadyWait::Indefinite);
    let mut seen = Vec::new();
    let mut trigger = |code: &HoleCode| -> HoleCheckResult<()> {
        seen.push(code.to_string());
        Ok(())
    };
    let code = workflow.run("a0170", &mut trigger).unwrap();
    assert_eq!(code.as_str(), "A0170");
    assert_eq!(seen, vec!["A0170".to_string()]);
    assert_eq!(port.written(), "A0170\n");
}

#[test]
fn bounded_wait_skips_capture_on_timeout() {
    let opener = MockOpener::new(MockPort::default());
    let workflow = RetakeWorkflow::new(opener, ReadyWait::Bounded);
    let mut triggered = false;
    let mut trigger = |_: &HoleCode| -> HoleCheckResult<()> {
        triggered = true;
        Ok(())
    };
    let err = workflow.run("A0170", &mut trigger).unwrap_err();
    assert!(matches!(err, HoleCheckError::DeviceTimeout { .. }));
    assert!(!triggered);
}

#[test]
fn unreachable_device_is_reported() {
    let workflow = RetakeWorkflow::new(MockOpener::unreachable(), ReadyWait::Indefinite);
    let mut trigger = |_: &HoleCode| -> HoleCheckResult<()> { Ok(()) };
    assert!(matches!(
        workflow.run("A0170", &mut trigger),
        Err(HoleCheckError::Device { .. })
    ));
}
