//! Operator commands driven through the console against an in-memory radio.
mod common;

use std::sync::{Arc, Mutex, RwLock};

use common::{text_event, MockRadio, Sent, SharedBuf};
use meshconsole::config::ConsoleConfig;
use meshconsole::console::{spawn_event_pump, AckCorrelator, Console, Flow, SharedOutput};
use meshconsole::meshtastic::{
    ChannelRecord, ChannelRole, DeviceState, EventPayload, MeshEvent, PortKind,
};
use meshconsole::protobuf::meshtastic as proto;
use tokio::sync::mpsc;

const ME: u32 = 0x0000_0001;

fn user(long: &str, short: &str) -> proto::User {
    proto::User {
        long_name: long.to_string(),
        short_name: short.to_string(),
        ..Default::default()
    }
}

fn mesh_state() -> DeviceState {
    let mut st = DeviceState::default();
    st.my_node_num = Some(ME);
    st.nodes.update_user(ME, &user("Home Base", "HOME"));
    st.nodes.update_user(
        0x0000_beef,
        &proto::User {
            hw_model: 9,
            ..user("Ridge Relay", "RDG")
        },
    );
    st.nodes.update_position(
        0x0000_beef,
        &proto::Position {
            latitude_i: Some(476_062_000),
            longitude_i: Some(-1_223_321_000),
            ..Default::default()
        },
    );
    st.nodes.update_metrics(
        0x0000_beef,
        &proto::DeviceMetrics {
            battery_level: Some(87),
            ..Default::default()
        },
    );
    st.nodes.update_user(0x0000_cafe, &user("Twin", "TW1"));
    st.nodes.update_user(0x0000_f00d, &user("Twin", "TW2"));
    st.set_channel(ChannelRecord {
        index: 0,
        name: String::new(),
        role: ChannelRole::Primary,
        psk: vec![1],
    });
    st.set_channel(ChannelRecord {
        index: 1,
        name: "Ops".into(),
        role: ChannelRole::Secondary,
        psk: vec![2; 32],
    });
    st
}

struct Harness {
    console: Console<MockRadio>,
    radio: Arc<MockRadio>,
    output: SharedBuf,
    correlator: Arc<AckCorrelator>,
    _feed: mpsc::UnboundedSender<MeshEvent>,
}

fn harness(state: DeviceState, replying: Option<&str>) -> Harness {
    let (feed_tx, feed_rx) = mpsc::unbounded_channel();
    let correlator = Arc::new(AckCorrelator::new());
    let (_display, _pump) = spawn_event_pump(feed_rx, correlator.clone());
    let radio = Arc::new(match replying {
        Some(reason) => MockRadio::replying(feed_tx.clone(), reason),
        None => MockRadio::new(),
    });
    let output = SharedBuf::default();
    let out: SharedOutput = Arc::new(Mutex::new(Box::new(output.clone())));
    let config = ConsoleConfig {
        color: false,
        ..Default::default()
    };
    let console = Console::new(
        radio.clone(),
        Arc::new(RwLock::new(state)),
        correlator.clone(),
        config,
        out,
    );
    Harness {
        console,
        radio,
        output,
        correlator,
        _feed: feed_tx,
    }
}

#[tokio::test]
async fn direct_message_by_name_reports_delivery() {
    let mut h = harness(mesh_state(), Some("NONE"));
    assert_eq!(h.console.handle_line("dm rdg relay check"), Flow::Continue);
    h.console.drain_direct_messages().await;

    assert_eq!(
        h.radio.sent(),
        vec![Sent::Direct {
            text: "relay check".into(),
            destination: "!0000beef".into(),
            want_ack: true
        }]
    );
    let text = h.output.text();
    assert!(text.contains("Sending direct message to rdg and waiting for acknowledgment..."));
    assert!(text.contains("Message delivered successfully to rdg!"));
}

#[tokio::test]
async fn direct_message_failure_shows_reason() {
    let mut h = harness(mesh_state(), Some("MAX_RETRANSMIT"));
    h.console.handle_line("dm !0000beef hello");
    h.console.drain_direct_messages().await;
    assert!(h
        .output
        .text()
        .contains("Message failed to deliver to !0000beef. Reason: MAX_RETRANSMIT"));
}

#[tokio::test]
async fn unresolvable_targets_send_nothing() {
    let mut h = harness(mesh_state(), Some("NONE"));
    h.console.handle_line("dm Nobody hello");
    h.console.handle_line("dm twin hello");
    h.console.drain_direct_messages().await;
    assert!(h.radio.sent().is_empty());
    let text = h.output.text();
    assert!(text.contains("node 'Nobody' not found"));
    assert!(text.contains("multiple nodes named 'twin' (!0000cafe, !0000f00d)"));
}

#[tokio::test]
async fn broadcast_follows_selected_channel() {
    let mut h = harness(mesh_state(), None);
    h.console.handle_line("hello all");
    h.console.handle_line("channel set ops");
    assert_eq!(h.console.active_channel(), 1);
    h.console.handle_line("second hello");
    h.console.handle_line("channel set 5");
    assert_eq!(h.console.active_channel(), 1);

    assert_eq!(
        h.radio.sent(),
        vec![
            Sent::Broadcast {
                text: "hello all".into(),
                channel: 0
            },
            Sent::Broadcast {
                text: "second hello".into(),
                channel: 1
            },
        ]
    );
    assert!(h.output.text().contains("Channel '5' not found or not enabled"));
}

#[tokio::test]
async fn deleting_active_channel_falls_back_to_primary() {
    let mut h = harness(mesh_state(), None);
    h.console.handle_line("channel set 1");
    h.console.handle_line("channel del 1");
    assert_eq!(h.console.active_channel(), 0);
    assert_eq!(h.radio.sent(), vec![Sent::DeleteChannel(1)]);
}

#[tokio::test]
async fn owner_short_name_defaults_from_long_name() {
    let mut h = harness(mesh_state(), None);
    h.console.handle_line(r#"config set owner "Base Camp""#);
    h.console.handle_line("config set owner Lookout LK");
    assert_eq!(
        h.radio.sent(),
        vec![
            Sent::Owner {
                long_name: "Base Camp".into(),
                short_name: "Base".into()
            },
            Sent::Owner {
                long_name: "Lookout".into(),
                short_name: "LK".into()
            },
        ]
    );
}

#[tokio::test]
async fn invalid_arguments_are_rejected_before_sending() {
    let mut h = harness(mesh_state(), None);
    h.console.handle_line("config set pos 95 10");
    h.console.handle_line("config set owner Lookout TOOLONG");
    h.console.handle_line("channel add ThisNameIsTooLong");
    assert!(h.radio.sent().is_empty());
    let text = h.output.text();
    assert!(text.contains("latitude 95 is outside"));
    assert!(text.contains("short name is too long"));
    assert!(text.contains("channel name is too long"));
}

#[tokio::test]
async fn admin_commands_wait_for_device_info() {
    let mut h = harness(DeviceState::default(), None);
    h.console.handle_line("config reboot");
    h.console.handle_line("channel add Hike");
    assert!(h.radio.sent().is_empty());
    assert!(h.output.text().contains("device not ready"));

    let mut h = harness(mesh_state(), None);
    h.console.handle_line("config reboot");
    h.console.handle_line("config set pos 47.6 -122.3");
    assert_eq!(
        h.radio.sent(),
        vec![
            Sent::Reboot(5),
            Sent::Position {
                lat: 47.6,
                lon: -122.3
            }
        ]
    );
}

#[tokio::test]
async fn display_filter_hides_packet_types() {
    let mut h = harness(mesh_state(), None);
    assert!(h.console.hidden_ports().contains(&PortKind::Routing));

    let event = text_event("!0000beef", "!00000001", "ping from the ridge");
    h.console.handle_line("filter hide text");
    h.console.show_event(&event);
    assert!(!h.output.text().contains("ping from the ridge"));

    h.console.handle_line("filter show text");
    h.console.show_event(&event);
    let text = h.output.text();
    assert!(text.contains("[DIRECT]"));
    assert!(text.contains("Ridge Relay [RDG] (!0000beef)"));
    assert!(text.contains("\"ping from the ridge\""));
}

#[tokio::test]
async fn node_detail_by_name_and_id() {
    let mut h = harness(mesh_state(), None);
    h.console.handle_line("node rdg");
    let text = h.output.text();
    assert!(text.contains("Node Information"));
    assert!(text.contains("Ridge Relay"));
    assert!(text.contains("RDG"));
    assert!(text.contains("!0000beef"));
    assert!(text.contains("RAK4631"));
    assert!(text.contains("47.60620"));
    assert!(text.contains("-122.33210"));
    assert!(text.contains("87%"));
    assert!(text.contains("Last SNR:    N/A"));

    h.console.handle_line("node !00000001");
    assert!(h.output.text().contains("Home Base (Me)"));

    h.console.handle_line("node !0000abcd");
    h.console.handle_line("node twin");
    let text = h.output.text();
    assert!(text.contains("node '!0000abcd' not found"));
    assert!(text.contains("multiple nodes named 'twin'"));
    assert!(h.radio.sent().is_empty());
}

#[tokio::test]
async fn terminal_controls_from_the_mesh_are_scrubbed() {
    let mut st = mesh_state();
    st.nodes
        .update_user(0x0000_0bad, &user("Evil\u{1b}[31m", "\u{1b}[2J"));
    let mut h = harness(st, None);
    h.console.handle_line("filter show routing");

    let spoof = "hi\u{1b}[2J\u{1b}[HMessage delivered successfully to Base!";
    h.console.show_event(&text_event("!00000bad", "!00000001", spoof));
    h.console.show_event(&MeshEvent {
        payload: EventPayload::NodeInfo {
            long_name: "Bell\u{7}Name".into(),
            short_name: "\u{1b}]0;x\u{7}".into(),
        },
        port: PortKind::NodeInfo,
        ..text_event("!00000bad", "^all", "")
    });
    h.console.show_event(&MeshEvent {
        payload: EventPayload::Telemetry("battery 50%\u{1b}[K".into()),
        port: PortKind::Telemetry,
        ..text_event("!00000bad", "^all", "")
    });
    h.console.handle_line("nodes all");
    h.console.handle_line("node !00000bad");

    let text = h.output.text();
    assert!(!text.contains('\u{1b}'), "raw ESC reached the terminal");
    assert!(!text.contains('\u{7}'));
    assert!(text.contains("hi\u{FFFD}[2J\u{FFFD}[HMessage delivered"));
    assert!(text.contains("Evil\u{FFFD}[31m"));
    assert!(text.contains("Bell\u{FFFD}Name"));
}

#[tokio::test]
async fn node_listings() {
    let mut h = harness(mesh_state(), None);
    h.console.handle_line("nodes all");
    let text = h.output.text();
    assert!(text.contains("Home Base [HOME] (Me)"));
    assert!(text.contains("Ridge Relay [RDG]"));

    h.console.handle_line("nodes online");
    assert!(h.output.text().contains("No nodes heard recently."));
}

#[tokio::test]
async fn exit_releases_pending_direct_message() {
    let h = harness(mesh_state(), None);
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (_display_tx, display_rx) = mpsc::unbounded_channel();
    input_tx.send("dm !0000beef are you there".to_string()).unwrap();
    input_tx.send("exit".to_string()).unwrap();

    h.console.run(display_rx, input_rx).await;

    assert!(h.correlator.is_closed());
    let text = h.output.text();
    assert!(text.contains("console is shutting down"));
    assert!(text.contains("Exiting."));
    assert!(h.radio.sent().len() <= 1);
}
