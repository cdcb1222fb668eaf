use meshconsole::console::commands::{
    USAGE_CHANNEL, USAGE_CONFIG, USAGE_DM, USAGE_NODE, USAGE_NODES,
};
use meshconsole::console::{parse, Command, FilterAction, NodeScope};
use meshconsole::meshtastic::PortKind;

#[test]
fn blank_lines_are_ignored() {
    assert_eq!(parse(""), None);
    assert_eq!(parse("   \t "), None);
}

#[test]
fn plain_text_is_broadcast() {
    assert_eq!(
        parse("  good morning mesh  "),
        Some(Command::Broadcast("good morning mesh".into()))
    );
    // Keywords only count as commands when they stand alone
    assert_eq!(
        parse("exit the building now"),
        Some(Command::Broadcast("exit the building now".into()))
    );
    assert_eq!(
        parse("info desk is open"),
        Some(Command::Broadcast("info desk is open".into()))
    );
}

#[test]
fn simple_keywords() {
    assert_eq!(parse("exit"), Some(Command::Exit));
    assert_eq!(parse("QUIT"), Some(Command::Exit));
    assert_eq!(parse("help"), Some(Command::Help));
    assert_eq!(parse("?"), Some(Command::Help));
    assert_eq!(parse("info"), Some(Command::Info));
    assert_eq!(parse("stats"), Some(Command::Stats));
}

#[test]
fn node_lists() {
    assert_eq!(parse("nodes"), Some(Command::Nodes(NodeScope::All)));
    assert_eq!(parse("nodes all"), Some(Command::Nodes(NodeScope::All)));
    assert_eq!(parse("nodes Online"), Some(Command::Nodes(NodeScope::Online)));
    assert_eq!(parse("nodes nearby"), Some(Command::Invalid(USAGE_NODES.into())));
}

#[test]
fn node_detail() {
    assert_eq!(parse("node rdg"), Some(Command::NodeDetail("rdg".into())));
    assert_eq!(
        parse(r#"node "Ridge Relay""#),
        Some(Command::NodeDetail("Ridge Relay".into()))
    );
    assert_eq!(parse("node"), Some(Command::Invalid(USAGE_NODE.into())));
    assert_eq!(parse("node a b"), Some(Command::Invalid(USAGE_NODE.into())));
}

#[test]
fn direct_messages() {
    assert_eq!(
        parse("dm !a1b2c3d4 on my way"),
        Some(Command::Direct {
            target: "!a1b2c3d4".into(),
            text: "on my way".into()
        })
    );
    assert_eq!(
        parse(r#"dm "Base Camp" radio check"#),
        Some(Command::Direct {
            target: "Base Camp".into(),
            text: "radio check".into()
        })
    );
    assert_eq!(parse("dm"), Some(Command::Invalid(USAGE_DM.into())));
    assert_eq!(parse("dm Ridge"), Some(Command::Invalid(USAGE_DM.into())));
}

#[test]
fn channel_commands() {
    assert_eq!(parse("channel list"), Some(Command::ChannelList));
    assert_eq!(parse("channel set 2"), Some(Command::ChannelSet("2".into())));
    assert_eq!(parse("channel set Ops"), Some(Command::ChannelSet("Ops".into())));
    assert_eq!(parse("channel add Ops"), Some(Command::ChannelAdd("Ops".into())));
    assert_eq!(parse("channel del 3"), Some(Command::ChannelDelete(3)));
    assert_eq!(parse("channel delete 3"), Some(Command::ChannelDelete(3)));
    assert!(matches!(parse("channel del x"), Some(Command::Invalid(_))));
    assert_eq!(parse("channel"), Some(Command::Invalid(USAGE_CHANNEL.into())));
    assert_eq!(parse("channel add"), Some(Command::Invalid(USAGE_CHANNEL.into())));
}

#[test]
fn config_commands() {
    assert_eq!(parse("config reboot"), Some(Command::Reboot));
    assert_eq!(
        parse("config set owner Alice"),
        Some(Command::SetOwner {
            long_name: "Alice".into(),
            short_name: None
        })
    );
    assert_eq!(
        parse(r#"config set owner "Base Camp" BC"#),
        Some(Command::SetOwner {
            long_name: "Base Camp".into(),
            short_name: Some("BC".into())
        })
    );
    assert_eq!(
        parse("config set pos 47.6 -122.3"),
        Some(Command::SetPosition {
            lat: 47.6,
            lon: -122.3
        })
    );
    assert!(matches!(
        parse("config set pos north west"),
        Some(Command::Invalid(msg)) if msg.contains("latitude")
    ));
    assert_eq!(parse("config"), Some(Command::Invalid(USAGE_CONFIG.into())));
    assert_eq!(parse("config reboot now"), Some(Command::Invalid(USAGE_CONFIG.into())));
}

#[test]
fn filter_commands() {
    assert_eq!(parse("filter"), Some(Command::Filter(FilterAction::List)));
    assert_eq!(
        parse("filter show routing"),
        Some(Command::Filter(FilterAction::Show(PortKind::Routing)))
    );
    assert_eq!(
        parse("filter hide TELEMETRY_APP"),
        Some(Command::Filter(FilterAction::Hide(PortKind::Telemetry)))
    );
    assert!(matches!(
        parse("filter hide WEATHER"),
        Some(Command::Invalid(msg)) if msg.contains("WEATHER")
    ));
}
