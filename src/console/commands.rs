//! Operator command parsing.
//!
//! Any line that does not start with a command keyword is broadcast as typed.
//! Arguments are whitespace separated; double quotes group words
//! (`config set owner "Base Camp" BASE`).
use log::trace;

use crate::meshtastic::PortKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeScope {
    All,
    Online,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterAction {
    List,
    Show(PortKind),
    Hide(PortKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Broadcast(String),
    Direct { target: String, text: String },
    Nodes(NodeScope),
    /// Detail view of one node, by id or name.
    NodeDetail(String),
    Info,
    ChannelList,
    ChannelSet(String),
    ChannelAdd(String),
    ChannelDelete(u32),
    SetOwner { long_name: String, short_name: Option<String> },
    SetPosition { lat: f64, lon: f64 },
    Reboot,
    Filter(FilterAction),
    Stats,
    Help,
    Exit,
    /// Recognised keyword with bad arguments; carries the usage hint.
    Invalid(String),
}

pub const USAGE_DM: &str = "Usage: dm <name_or_id> <message>";
pub const USAGE_NODES: &str = "Usage: nodes all | nodes online";
pub const USAGE_NODE: &str = "Usage: node <name_or_id>";
pub const USAGE_CHANNEL: &str =
    "Usage: channel list | channel set <index_or_name> | channel add <name> | channel del <index>";
pub const USAGE_CONFIG: &str =
    "Usage: config set owner <long> [short] | config set pos <lat> <lon> | config reboot";
pub const USAGE_FILTER: &str = "Usage: filter | filter show <PORT> | filter hide <PORT>";

/// Split off the next argument, honouring double quotes. Returns the argument
/// and the unparsed remainder.
fn next_token(input: &str) -> Option<(String, &str)> {
    let s = input.trim_start();
    if s.is_empty() {
        return None;
    }
    if let Some(rest) = s.strip_prefix('"') {
        return match rest.find('"') {
            Some(end) => Some((rest[..end].to_string(), &rest[end + 1..])),
            None => Some((rest.to_string(), "")),
        };
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((s[..end].to_string(), &s[end..]))
}

fn tokens(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = input;
    while let Some((tok, r)) = next_token(rest) {
        out.push(tok);
        rest = r;
    }
    out
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (keyword, rest) = next_token(trimmed)?;
    let cmd = match keyword.to_ascii_lowercase().as_str() {
        "exit" | "quit" if rest.trim().is_empty() => Command::Exit,
        "help" | "?" if rest.trim().is_empty() => Command::Help,
        "info" if rest.trim().is_empty() => Command::Info,
        "stats" if rest.trim().is_empty() => Command::Stats,
        "nodes" => parse_nodes(rest),
        "node" => parse_node(rest),
        "dm" => parse_dm(rest),
        "channel" => parse_channel(rest),
        "config" => parse_config(rest),
        "filter" => parse_filter(rest),
        _ => Command::Broadcast(trimmed.to_string()),
    };
    trace!("Parsed {:?} from '{}'", cmd, crate::logutil::escape_log(line));
    Some(cmd)
}

fn parse_nodes(rest: &str) -> Command {
    match tokens(rest).as_slice() {
        [] => Command::Nodes(NodeScope::All),
        [scope] if scope.eq_ignore_ascii_case("all") => Command::Nodes(NodeScope::All),
        [scope] if scope.eq_ignore_ascii_case("online") => Command::Nodes(NodeScope::Online),
        _ => Command::Invalid(USAGE_NODES.into()),
    }
}

fn parse_node(rest: &str) -> Command {
    match tokens(rest).as_slice() {
        [target] if !target.is_empty() => Command::NodeDetail(target.clone()),
        _ => Command::Invalid(USAGE_NODE.into()),
    }
}

fn parse_dm(rest: &str) -> Command {
    let Some((target, text)) = next_token(rest) else {
        return Command::Invalid(USAGE_DM.into());
    };
    let text = text.trim();
    if target.is_empty() || text.is_empty() {
        return Command::Invalid(USAGE_DM.into());
    }
    Command::Direct {
        target,
        text: text.to_string(),
    }
}

fn parse_channel(rest: &str) -> Command {
    let args = tokens(rest);
    let Some(sub) = args.first() else {
        return Command::Invalid(USAGE_CHANNEL.into());
    };
    match (sub.to_ascii_lowercase().as_str(), &args[1..]) {
        ("list", []) => Command::ChannelList,
        ("set", [key]) => Command::ChannelSet(key.clone()),
        ("add", [name]) => Command::ChannelAdd(name.clone()),
        ("del" | "delete", [index]) => match index.parse::<u32>() {
            Ok(i) => Command::ChannelDelete(i),
            Err(_) => Command::Invalid(format!("Invalid channel index '{}'", index)),
        },
        _ => Command::Invalid(USAGE_CHANNEL.into()),
    }
}

fn parse_config(rest: &str) -> Command {
    let args = tokens(rest);
    let lowered: Vec<String> = args.iter().take(2).map(|a| a.to_ascii_lowercase()).collect();
    match lowered.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["reboot"] if args.len() == 1 => Command::Reboot,
        ["set", "owner"] => match &args[2..] {
            [long] => Command::SetOwner {
                long_name: long.clone(),
                short_name: None,
            },
            [long, short] => Command::SetOwner {
                long_name: long.clone(),
                short_name: Some(short.clone()),
            },
            _ => Command::Invalid(USAGE_CONFIG.into()),
        },
        ["set", "pos"] => match &args[2..] {
            [lat, lon] => match (lat.parse::<f64>(), lon.parse::<f64>()) {
                (Ok(lat), Ok(lon)) => Command::SetPosition { lat, lon },
                _ => Command::Invalid(
                    "Invalid latitude/longitude. Please provide numbers.".into(),
                ),
            },
            _ => Command::Invalid(USAGE_CONFIG.into()),
        },
        _ => Command::Invalid(USAGE_CONFIG.into()),
    }
}

fn parse_filter(rest: &str) -> Command {
    let args = tokens(rest);
    let port = |label: &str| PortKind::parse_label(label);
    match args.as_slice() {
        [] => Command::Filter(FilterAction::List),
        [action, label] => match (action.to_ascii_lowercase().as_str(), port(label)) {
            ("show", Some(p)) => Command::Filter(FilterAction::Show(p)),
            ("hide", Some(p)) => Command::Filter(FilterAction::Hide(p)),
            ("show" | "hide", None) => Command::Invalid(format!("Unknown packet type '{}'", label)),
            _ => Command::Invalid(USAGE_FILTER.into()),
        },
        _ => Command::Invalid(USAGE_FILTER.into()),
    }
}
