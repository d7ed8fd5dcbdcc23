//! Relay write → read-back → verify pipeline against a mock register bus.

use crate::mock_hw::{BusCall, MockBoard};

use relaynode::error::{BusError, SyncError};
use relaynode::pins::EXPANDER_REG_OUTPUT;
use relaynode::protocol::OutboundMessage;
use relaynode::relay::sync::{SyncEngine, SyncReport};

#[test]
fn relay_on_writes_then_verifies() {
    let mut engine = SyncEngine::new();
    let mut board = MockBoard::new();

    let outcome = engine.apply(&mut board, 3, true);

    assert!(outcome.applied());
    assert_eq!(
        board.calls,
        vec![
            BusCall::Write { reg: EXPANDER_REG_OUTPUT, value: 0x08 },
            BusCall::Read { reg: EXPANDER_REG_OUTPUT },
        ]
    );
    assert_eq!(outcome.readback, Some(Ok(0x08)));
    assert_eq!(outcome.report, None);
    assert_eq!(
        outcome.messages,
        vec![
            OutboundMessage::RelayStateVerified {
                relay: 3,
                exio_pin: 4,
                expected_state: true,
                actual_state: true,
            },
            OutboundMessage::RelayControlAck {
                relay: 3,
                state: true,
                success: true,
                error: None,
            },
        ]
    );
    assert_eq!(engine.bank().current(), 0x08);
    assert_eq!(engine.bank().expected(), 0x08);
}

#[test]
fn masks_accumulate_across_channels() {
    let mut engine = SyncEngine::new();
    let mut board = MockBoard::new();

    engine.apply(&mut board, 0, true);
    engine.apply(&mut board, 7, true);
    engine.apply(&mut board, 0, false);

    assert_eq!(engine.bank().current(), 0x80);
    assert_eq!(board.output(), 0x80);
}

#[test]
fn write_failure_rolls_back_and_skips_readback() {
    let mut engine = SyncEngine::new();
    let mut board = MockBoard::new();
    engine.apply(&mut board, 1, true);
    board.calls.clear();
    board.fail_writes = true;

    let outcome = engine.apply(&mut board, 3, true);

    assert!(!outcome.applied());
    assert_eq!(board.calls.len(), 1, "no read-back after a failed write");
    assert_eq!(engine.bank().current(), 0x02);
    assert_eq!(engine.bank().verified(), 0x02);
    assert_eq!(
        outcome.report,
        Some(SyncReport::WriteFailed(SyncError::BusCommunicationFailure(
            BusError::Nack
        )))
    );
    match &outcome.messages[..] {
        [OutboundMessage::RelayControlAck { relay: 3, state: true, success: false, error: Some(e) }] => {
            assert!(e.contains("I2C"), "error text: {e}");
        }
        other => panic!("unexpected messages {other:?}"),
    }
}

#[test]
fn success_after_write_failure_leaves_masks_in_step() {
    let mut engine = SyncEngine::new();
    let mut board = MockBoard::new();

    board.fail_writes = true;
    assert!(!engine.apply(&mut board, 5, true).applied());
    assert_eq!(engine.bank().expected(), 0x00);

    board.fail_writes = false;
    let outcome = engine.apply(&mut board, 1, true);

    assert!(outcome.applied());
    assert_eq!(outcome.report, None);
    assert_eq!(engine.bank().current(), 0x02);
    assert_eq!(engine.bank().expected(), 0x02);
    assert_eq!(engine.bank().verified(), 0x02);
    assert_eq!(board.output(), 0x02);
}

#[test]
fn invalid_channel_never_touches_the_bus() {
    let mut engine = SyncEngine::new();
    let mut board = MockBoard::new();

    for relay in [-1, 8, 42, i64::MAX] {
        let outcome = engine.apply(&mut board, relay, true);
        assert_eq!(outcome.result, Err(SyncError::InvalidChannel(relay)));
        assert_eq!(outcome.report.map(|r| r.error_type()), Some("INVALID_RELAY"));
        assert!(!outcome.report.is_some_and(|r| r.is_rate_limited()));
    }
    assert!(board.calls.is_empty());
    assert_eq!(engine.bank().current(), 0);
}

#[test]
fn readback_mismatch_is_reported_but_kept() {
    let mut engine = SyncEngine::new();
    let mut board = MockBoard::new();
    board.readback_override = Some(0x00);

    let outcome = engine.apply(&mut board, 2, true);

    assert!(outcome.applied());
    assert_eq!(engine.bank().current(), 0x04);
    assert_eq!(
        outcome.report,
        Some(SyncReport::VerifyMismatch { written: 0x04, readback: 0x00 })
    );
    assert_eq!(outcome.report.map(|r| r.error_type()), Some("I2C_VERIFY_MISMATCH"));
    assert_eq!(outcome.messages.len(), 2);
}

#[test]
fn readback_failure_skips_verification_message() {
    let mut engine = SyncEngine::new();
    let mut board = MockBoard::new();
    board.fail_reads = true;

    let outcome = engine.apply(&mut board, 5, false);

    assert!(outcome.applied());
    assert_eq!(outcome.readback, Some(Err(BusError::Nack)));
    assert_eq!(outcome.report, Some(SyncReport::ReadbackFailed(BusError::Nack)));
    assert_eq!(
        outcome.messages.iter().map(OutboundMessage::kind).collect::<Vec<_>>(),
        vec!["relay_control_ack"]
    );
}

#[test]
fn boot_sync_drives_all_off() {
    let mut engine = SyncEngine::new();
    let mut board = MockBoard::new();
    board.regs[1] = 0xFF;

    engine.sync_outputs(&mut board).unwrap();

    assert_eq!(board.writes(), vec![(EXPANDER_REG_OUTPUT, 0x00)]);
    assert_eq!(board.output(), 0x00);
}
