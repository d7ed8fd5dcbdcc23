//! Reconnect pacing as seen through the service, with both the mock link
//! and the host simulation of the WebSocket adapter.

use crate::mock_hw::{MockBoard, MockConfigStore, MockLink, RecordingSink};

use relaynode::adapters::ws_link::WsLink;
use relaynode::app::events::AppEvent;
use relaynode::app::ports::NetworkInfo;
use relaynode::app::service::AppService;
use relaynode::config::{DeviceConfig, TimingConfig};
use relaynode::connection::Immediate;
use relaynode::protocol::transport::NullLink;

fn lan() -> NetworkInfo {
    NetworkInfo {
        mac: "94:A9:90:23:06:80".into(),
        ip: "192.168.1.50".into(),
    }
}

#[test]
fn refused_server_is_retried_after_cooldown() {
    let mut app = AppService::new(DeviceConfig::default(), TimingConfig::default());
    let mut board = MockBoard::new();
    let mut link = MockLink::new();
    let store = MockConfigStore::new();
    let mut sink = RecordingSink::new();
    link.accept = false;

    app.set_network(true, lan(), &mut link, &mut sink);
    for now in (0..=59_990).step_by(10) {
        app.poll(now, &mut board, &mut link, &store, &mut sink);
    }
    assert_eq!(link.connects.len(), 1, "one attempt inside the cooldown");

    app.poll(60_000, &mut board, &mut link, &store, &mut sink);
    assert_eq!(link.connects.len(), 2);

    link.accept = true;
    app.poll(60_010, &mut board, &mut link, &store, &mut sink);
    assert!(!app.is_connected(), "the refused second attempt is still pending");
    app.poll(120_000, &mut board, &mut link, &store, &mut sink);
    app.poll(120_010, &mut board, &mut link, &store, &mut sink);
    assert!(app.is_connected());
    assert_eq!(MockLink::kinds(&link.take_sent()), vec!["register", "state"]);
}

#[test]
fn network_loss_drops_link_and_regain_reconnects_at_once() {
    let mut app = AppService::new(DeviceConfig::default(), TimingConfig::default());
    let mut board = MockBoard::new();
    let mut link = MockLink::new();
    let store = MockConfigStore::new();
    let mut sink = RecordingSink::new();

    app.set_network(true, lan(), &mut link, &mut sink);
    app.poll(0, &mut board, &mut link, &store, &mut sink);
    app.poll(10, &mut board, &mut link, &store, &mut sink);
    assert!(app.is_connected());

    app.set_network(false, lan(), &mut link, &mut sink);
    assert!(!app.is_connected());
    assert_eq!(link.disconnects, 1);
    assert!(sink.events.contains(&AppEvent::LinkDown));

    app.poll(1_000, &mut board, &mut link, &store, &mut sink);
    assert_eq!(link.connects.len(), 1, "no attempts while the network is down");

    app.set_network(true, lan(), &mut link, &mut sink);
    app.poll(2_000, &mut board, &mut link, &store, &mut sink);
    assert_eq!(link.connects.len(), 2);
}

#[test]
fn immediate_policy_over_simulated_websocket() {
    let mut app = AppService::with_backoff(DeviceConfig::default(), TimingConfig::default(), Immediate);
    let mut board = MockBoard::new();
    let mut link = WsLink::new();
    let store = MockConfigStore::new();
    let mut sink = RecordingSink::new();

    link.sim_set_accepting(false);
    app.set_network(true, lan(), &mut link, &mut sink);
    app.poll(0, &mut board, &mut link, &store, &mut sink);
    app.poll(10, &mut board, &mut link, &store, &mut sink);
    assert!(!app.is_connected());

    link.sim_set_accepting(true);
    app.poll(20, &mut board, &mut link, &store, &mut sink);
    app.poll(30, &mut board, &mut link, &store, &mut sink);
    assert!(app.is_connected());

    let greeting = link.sim_take_received();
    assert_eq!(greeting.len(), 2);
    assert!(greeting[0].contains(r#""type":"register""#));
    assert!(greeting[1].contains(r#""type":"state""#));

    link.sim_push_text(r#"{"type":"relay_control","relay":7,"state":true}"#);
    app.poll(40, &mut board, &mut link, &store, &mut sink);
    assert_eq!(board.output(), 0x80);
    let replies = link.sim_take_received();
    assert!(replies.iter().any(|t| t.contains(r#""type":"relay_control_ack""#)));

    link.sim_close();
    app.poll(50, &mut board, &mut link, &store, &mut sink);
    assert!(!app.is_connected());
}

#[test]
fn synchronous_connect_failure_waits_out_cooldown() {
    let mut app = AppService::new(DeviceConfig::default(), TimingConfig::default());
    let mut board = MockBoard::new();
    let mut link = NullLink;
    let store = MockConfigStore::new();
    let mut sink = RecordingSink::new();

    app.set_network(true, lan(), &mut link, &mut sink);
    app.poll(0, &mut board, &mut link, &store, &mut sink);
    app.poll(59_999, &mut board, &mut link, &store, &mut sink);
    app.poll(60_000, &mut board, &mut link, &store, &mut sink);
    assert!(!app.is_connected());

    // Relay requests keep working with no server at all.
    let outcome = app.apply_relay(60_100, 1, true, &mut board, &mut sink);
    assert!(outcome.applied());
    assert_eq!(board.output(), 0x02);
}
