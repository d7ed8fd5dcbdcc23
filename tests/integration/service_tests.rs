//! Integration tests for the AppService → sync engine → server link
//! pipeline.
//!
//! These run on the host and drive the service exactly the way the main
//! loop does: one `poll` per iteration with a monotonically increasing
//! uptime.

use crate::mock_hw::{MockBoard, MockConfigStore, MockConsole, MockLink, RecordingSink};

use relaynode::app::events::AppEvent;
use relaynode::app::ports::NetworkInfo;
use relaynode::app::service::AppService;
use relaynode::config::{DeviceConfig, TimingConfig};
use relaynode::connection::ConnectionState;
use relaynode::protocol::OutboundMessage;

struct Rig {
    app: AppService,
    board: MockBoard,
    link: MockLink,
    store: MockConfigStore,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        let mut config = DeviceConfig::default();
        config.device_id = heapless::String::try_from("RELAY-230680").unwrap();
        config.device_name = heapless::String::try_from("Greenhouse").unwrap();
        let mut rig = Self {
            app: AppService::new(config, TimingConfig::default()),
            board: MockBoard::new(),
            link: MockLink::new(),
            store: MockConfigStore::new(),
            sink: RecordingSink::new(),
        };
        rig.app.start(&mut rig.board, &mut rig.sink);
        rig
    }

    fn poll(&mut self, now_ms: u64) {
        self.app
            .poll(now_ms, &mut self.board, &mut self.link, &self.store, &mut self.sink);
    }

    fn network_up(&mut self) {
        let info = NetworkInfo {
            mac: "94:A9:90:23:06:80".into(),
            ip: "192.168.1.50".into(),
        };
        self.app.set_network(true, info, &mut self.link, &mut self.sink);
    }

    /// Bring the link up at t=0/10 and discard the greeting.
    fn online() -> Self {
        let mut rig = Self::new();
        rig.network_up();
        rig.poll(0);
        rig.poll(10);
        assert!(rig.app.is_connected());
        rig.link.take_sent();
        rig
    }

    fn server_says(&mut self, now_ms: u64, text: &str) -> Vec<OutboundMessage> {
        self.link.push_text(text);
        self.poll(now_ms);
        self.link.take_sent()
    }
}

fn error_types(messages: &[OutboundMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|m| match m {
            OutboundMessage::ErrorReport { error_type, .. } => Some(error_type.clone()),
            _ => None,
        })
        .collect()
}

// ── Connect / register ───────────────────────────────────────

#[test]
fn register_precedes_first_state_after_connect() {
    let mut rig = Rig::new();
    rig.network_up();

    rig.poll(0);
    assert_eq!(rig.link.connects, vec!["ws://192.168.1.100:40000/".to_string()]);
    assert!(rig.link.sent.is_empty(), "nothing is sent before the link is up");

    rig.poll(10);
    let sent = rig.link.take_sent();
    assert_eq!(MockLink::kinds(&sent), vec!["register", "state"]);
    assert_eq!(
        sent[0],
        OutboundMessage::Register {
            device_id: "RELAY-230680".into(),
            device_name: "Greenhouse".into(),
            mac: "94:A9:90:23:06:80".into(),
            ip: "192.168.1.50".into(),
        }
    );
    assert!(rig.sink.events.contains(&AppEvent::LinkUp));
}

#[test]
fn no_connect_attempt_without_network() {
    let mut rig = Rig::new();
    rig.poll(0);
    rig.poll(100_000);
    assert!(rig.link.connects.is_empty());
    assert_eq!(rig.app.connection_state(), ConnectionState::Disconnected);
}

// ── Heartbeat ────────────────────────────────────────────────

#[test]
fn heartbeat_every_500_ms_while_connected() {
    let mut rig = Rig::online();

    rig.poll(400);
    assert!(rig.link.take_sent().is_empty());

    rig.poll(510);
    assert_eq!(MockLink::kinds(&rig.link.take_sent()), vec!["state"]);

    rig.poll(900);
    assert!(rig.link.take_sent().is_empty());

    rig.poll(1_010);
    assert_eq!(MockLink::kinds(&rig.link.take_sent()), vec!["state"]);
}

#[test]
fn state_carries_inputs_and_relays() {
    let mut rig = Rig::online();
    rig.board.inputs = 0b0000_0101;

    rig.poll(200);
    rig.server_says(300, r#"{"type":"relay_control","relay":6,"state":true}"#);
    rig.poll(810);

    match rig.link.take_sent().as_slice() {
        [OutboundMessage::State { inputs, relays, .. }] => {
            assert_eq!(*inputs, [true, false, true, false, false, false, false, false]);
            assert_eq!(*relays, [false, false, false, false, false, false, true, false]);
        }
        other => panic!("expected one state, got {other:?}"),
    }
}

// ── Relay control ────────────────────────────────────────────

#[test]
fn relay_3_on_success() {
    let mut rig = Rig::online();

    let sent = rig.server_says(100, r#"{"type":"relay_control","relay":3,"state":true}"#);

    assert_eq!(
        MockLink::kinds(&sent),
        vec!["relay_state_verified", "relay_control_ack", "state"]
    );
    assert_eq!(
        sent[1],
        OutboundMessage::RelayControlAck {
            relay: 3,
            state: true,
            success: true,
            error: None,
        }
    );
    assert_eq!(rig.board.output(), 0x08);
    assert_eq!(rig.app.relay_mask(), 0x08);

    // The snapshot restarted the heartbeat.
    rig.poll(510);
    assert!(rig.link.take_sent().is_empty());
    rig.poll(600);
    assert_eq!(MockLink::kinds(&rig.link.take_sent()), vec!["state"]);
}

#[test]
fn relay_index_as_string_is_accepted() {
    let mut rig = Rig::online();
    rig.server_says(100, r#"{"type":"relay_control","relay":"2","state":true}"#);
    assert_eq!(rig.app.relay_mask(), 0x04);
}

#[test]
fn relay_3_bus_failure_rolls_back() {
    let mut rig = Rig::online();
    rig.server_says(50, r#"{"type":"relay_control","relay":0,"state":true}"#);
    rig.board.fail_writes = true;

    let sent = rig.server_says(100, r#"{"type":"relay_control","relay":3,"state":true}"#);

    assert_eq!(MockLink::kinds(&sent), vec!["relay_control_ack", "error_report"]);
    assert!(matches!(
        &sent[0],
        OutboundMessage::RelayControlAck { relay: 3, success: false, error: Some(_), .. }
    ));
    assert_eq!(error_types(&sent), vec!["I2C_ERROR"]);
    assert_eq!(rig.app.relay_mask(), 0x01);
    assert!(rig.sink.events.iter().any(|e| matches!(e, AppEvent::RelayFailed { relay: 3, .. })));
}

#[test]
fn invalid_relay_is_rejected_without_bus_traffic() {
    let mut rig = Rig::online();
    let before = rig.board.calls.len();

    let sent = rig.server_says(100, r#"{"type":"relay_control","relay":9,"state":true}"#);

    assert_eq!(rig.board.calls.len(), before);
    assert_eq!(MockLink::kinds(&sent), vec!["relay_control_ack", "error_report"]);
    assert_eq!(error_types(&sent), vec!["INVALID_RELAY"]);

    // Request errors are never throttled.
    let sent = rig.server_says(200, r#"{"type":"relay_control","relay":-1,"state":false}"#);
    assert_eq!(error_types(&sent), vec!["INVALID_RELAY"]);
}

#[test]
fn unrepresentable_relay_numbers_get_invalid_relay_ack() {
    let mut rig = Rig::online();
    let before = rig.board.calls.len();

    for relay in ["18446744073709551615", "3.0", "1.5"] {
        let text = format!(r#"{{"type":"relay_control","relay":{relay},"state":true}}"#);
        let sent = rig.server_says(100, &text);
        assert!(
            matches!(
                sent.first(),
                Some(OutboundMessage::RelayControlAck { success: false, .. })
            ),
            "relay {relay}: {sent:?}"
        );
        assert_eq!(error_types(&sent), vec!["INVALID_RELAY"], "relay {relay}");
    }

    assert_eq!(rig.board.calls.len(), before);
    assert_eq!(rig.app.relay_mask(), 0);
}

#[test]
fn bus_error_reports_are_rate_limited() {
    let mut rig = Rig::online();
    rig.board.fail_writes = true;
    let cmd = r#"{"type":"relay_control","relay":1,"state":true}"#;

    assert_eq!(error_types(&rig.server_says(100, cmd)), vec!["I2C_ERROR"]);
    assert!(error_types(&rig.server_says(5_000, cmd)).is_empty());
    assert!(error_types(&rig.server_says(30_099, cmd)).is_empty());
    assert_eq!(error_types(&rig.server_says(30_100, cmd)), vec!["I2C_ERROR"]);

    // Every request still gets its ack.
    let sent = rig.server_says(30_200, cmd);
    assert_eq!(MockLink::kinds(&sent), vec!["relay_control_ack"]);
}

#[test]
fn readback_mismatch_reports_verify_error() {
    let mut rig = Rig::online();
    rig.board.readback_override = Some(0x00);

    let sent = rig.server_says(100, r#"{"type":"relay_control","relay":4,"state":true}"#);

    assert_eq!(error_types(&sent), vec!["I2C_VERIFY_MISMATCH"]);
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::VerifyMismatch { written: 0x10, readback: 0x00 }));
    assert_eq!(rig.app.relay_mask(), 0x10);
}

// ── Codec errors / ping ──────────────────────────────────────

#[test]
fn malformed_input_gets_parse_error() {
    let mut rig = Rig::online();

    let sent = rig.server_says(100, "{not json");
    assert_eq!(error_types(&sent), vec!["JSON_PARSE_ERROR"]);

    let sent = rig.server_says(200, r#"{"type":"relay_control","state":true}"#);
    assert_eq!(error_types(&sent), vec!["JSON_PARSE_ERROR"]);

    let sent = rig.server_says(300, r#"{"type":"reboot"}"#);
    assert_eq!(error_types(&sent), vec!["UNKNOWN_MESSAGE_TYPE"]);

    assert_eq!(rig.app.relay_mask(), 0);
}

#[test]
fn oversized_message_is_rejected() {
    let mut rig = Rig::online();
    let text = format!(r#"{{"type":"ping","pad":"{}"}}"#, "x".repeat(600));
    let sent = rig.server_says(100, &text);
    assert_eq!(error_types(&sent), vec!["MESSAGE_TOO_LARGE"]);
}

#[test]
fn ping_gets_pong_with_uptime() {
    let mut rig = Rig::online();
    let sent = rig.server_says(321, r#"{"type":"ping"}"#);
    assert_eq!(
        sent,
        vec![OutboundMessage::Pong {
            device_id: "RELAY-230680".into(),
            uptime_ms: 321,
        }]
    );
}

// ── Config ───────────────────────────────────────────────────

#[test]
fn config_patch_is_persisted_and_requests_restart() {
    let mut rig = Rig::online();

    let sent = rig.server_says(
        100,
        r#"{"type":"config","data":{"server_host":"10.0.0.5","server_port":8080}}"#,
    );

    assert_eq!(
        sent,
        vec![OutboundMessage::ConfigResponse {
            success: true,
            message: "configuration updated".into(),
        }]
    );
    assert_eq!(rig.store.saves.get(), 1);
    let saved = rig.store.saved.borrow().clone().unwrap();
    assert_eq!(saved.server_host.as_str(), "10.0.0.5");
    assert_eq!(saved.server_port, 8080);
    assert_eq!(rig.app.config().server_uri(), "ws://10.0.0.5:8080/");

    let change = rig.app.take_network_restart().unwrap();
    assert!(change.server);
    assert!(!change.wifi);
    assert_eq!(rig.app.take_network_restart(), None);

    rig.app.restart_link(&mut rig.link, &mut rig.sink);
    assert!(!rig.app.is_connected());
    rig.poll(200);
    assert_eq!(rig.link.connects.last().map(String::as_str), Some("ws://10.0.0.5:8080/"));
}

#[test]
fn invalid_config_patch_changes_nothing() {
    let mut rig = Rig::online();
    let before = rig.app.config().clone();

    let sent = rig.server_says(
        100,
        r#"{"type":"config","data":{"device_name":"Barn","server_port":0}}"#,
    );

    assert!(matches!(
        sent.as_slice(),
        [OutboundMessage::ConfigResponse { success: false, .. }]
    ));
    assert_eq!(rig.app.config(), &before);
    assert_eq!(rig.store.saves.get(), 0);
    assert_eq!(rig.app.take_network_restart(), None);
}

#[test]
fn mistyped_config_values_get_a_config_response() {
    let mut rig = Rig::online();
    let before = rig.app.config().clone();

    for (data, reason) in [
        (r#"{"server_port":70000}"#, "server_port must be 1-65535"),
        (r#"{"server_port":"8080"}"#, "server_port must be 1-65535"),
        (r#"{"device_id":5}"#, "device_id must be a string"),
    ] {
        let text = format!(r#"{{"type":"config","data":{data}}}"#);
        let sent = rig.server_says(100, &text);
        match sent.as_slice() {
            [OutboundMessage::ConfigResponse { success: false, message }] => {
                assert!(message.contains(reason), "{data}: {message}");
            }
            other => panic!("{data}: unexpected {other:?}"),
        }
        assert!(error_types(&sent).is_empty());
    }

    assert_eq!(rig.app.config(), &before);
    assert_eq!(rig.store.saves.get(), 0);
}

#[test]
fn failed_save_keeps_old_config() {
    let mut rig = Rig::online();
    rig.store.fail_save.set(true);

    rig.server_says(100, r#"{"type":"config","data":{"device_name":"Barn"}}"#);

    assert_eq!(rig.app.config().device_name.as_str(), "Greenhouse");
}

#[test]
fn identity_change_re_registers() {
    let mut rig = Rig::online();

    let sent = rig.server_says(100, r#"{"type":"config","data":{"device_name":"Barn"}}"#);

    assert_eq!(MockLink::kinds(&sent), vec!["register", "config_response"]);
    assert!(matches!(
        &sent[0],
        OutboundMessage::Register { device_name, .. } if device_name == "Barn"
    ));
    assert_eq!(rig.app.take_network_restart(), None);
}

// ── Console ──────────────────────────────────────────────────

#[test]
fn console_show_masks_password() {
    let mut rig = Rig::new();
    let mut console = MockConsole::new();
    rig.app.handle_console_line(
        r#"{"wifi_ssid":"Farm","wifi_password":"supersecret"}"#,
        &rig.store,
        &mut console,
        &mut rig.sink,
    );
    assert_eq!(console.output, vec!["OK: configuration saved".to_string()]);

    console.output.clear();
    rig.app
        .handle_console_line("show", &rig.store, &mut console, &mut rig.sink);

    let text = console.output.join("\n");
    assert!(text.contains("Farm"));
    assert!(!text.contains("supersecret"));
    assert!(text.contains("RELAY-230680"));

    let change = rig.app.take_network_restart().unwrap();
    assert!(change.wifi);
}

#[test]
fn console_rejects_garbage() {
    let mut rig = Rig::new();
    let mut console = MockConsole::new();

    rig.app
        .handle_console_line("reboot now", &rig.store, &mut console, &mut rig.sink);
    rig.app.handle_console_line("", &rig.store, &mut console, &mut rig.sink);
    rig.app.handle_console_line(
        r#"{"wifi_password":"short"}"#,
        &rig.store,
        &mut console,
        &mut rig.sink,
    );
    rig.app.handle_console_line(
        r#"{"server_port":"8080"}"#,
        &rig.store,
        &mut console,
        &mut rig.sink,
    );

    assert_eq!(console.output.len(), 3);
    assert!(console.output.iter().all(|l| l.starts_with("ERROR")));
    assert_eq!(rig.store.saves.get(), 0);
}

// ── Link loss ────────────────────────────────────────────────

#[test]
fn send_failure_drops_link_and_stops_heartbeat() {
    let mut rig = Rig::online();
    rig.link.fail_send = true;

    rig.poll(510);
    assert!(!rig.app.is_connected());
    assert_eq!(rig.link.disconnects, 1);
    assert!(rig.sink.events.contains(&AppEvent::LinkDown));

    rig.link.fail_send = false;
    rig.poll(1_010);
    assert!(rig.link.take_sent().is_empty());
}

#[test]
fn relay_commands_offline_still_drive_outputs() {
    let mut rig = Rig::new();
    let outcome = rig.app.apply_relay(0, 2, true, &mut rig.board, &mut rig.sink);
    assert!(outcome.applied());
    assert_eq!(rig.board.output(), 0x04);
    assert!(rig.link.sent.is_empty());
}
