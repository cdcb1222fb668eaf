//! Inbound mesh events.
//!
//! Every decoded [`MeshPacket`] received from the radio becomes one
//! [`MeshEvent`]: addressing in `!xxxxxxxx` form, the application port, and the
//! payload decoded as far as the console understands it. Payloads that fail to
//! decode are kept as [`EventPayload::Raw`] rather than dropped.
use chrono::{DateTime, TimeZone, Utc};
use prost::Message;

use crate::protobuf::meshtastic as proto;

/// Destination number of packets addressed to every node.
pub const BROADCAST_NUM: u32 = 0xFFFF_FFFF;
/// Destination id rendered for broadcast packets.
pub const BROADCAST_ID: &str = "^all";

/// `!%08x` rendering of a node number.
/// SNR as carried in `MeshPacket.rx_snr` / `NodeInfo.snr`.
///
/// Both are plain proto3 floats, so the firmware never puts 0.0 on the wire:
/// a packet the radio did not measure and one received at exactly 0 dB decode
/// the same. Zero is therefore reported as "no reading".
pub fn snr_reading(raw: f32) -> Option<f32> {
    (raw != 0.0 && raw.is_finite()).then_some(raw)
}

pub fn node_id_string(num: u32) -> String {
    format!("!{:08x}", num)
}

/// Application port of a packet, with the ports the console treats specially
/// broken out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    TextMessage,
    Position,
    Routing,
    NodeInfo,
    Telemetry,
    Admin,
    Other(i32),
}

impl From<i32> for PortKind {
    fn from(value: i32) -> Self {
        match proto::PortNum::try_from(value) {
            Ok(proto::PortNum::TextMessageApp) => PortKind::TextMessage,
            Ok(proto::PortNum::PositionApp) => PortKind::Position,
            Ok(proto::PortNum::RoutingApp) => PortKind::Routing,
            Ok(proto::PortNum::NodeinfoApp) => PortKind::NodeInfo,
            Ok(proto::PortNum::TelemetryApp) => PortKind::Telemetry,
            Ok(proto::PortNum::AdminApp) => PortKind::Admin,
            _ => PortKind::Other(value),
        }
    }
}

impl PortKind {
    /// Display/filter label: the upstream port name without its `_APP` suffix.
    pub fn label(&self) -> String {
        match self {
            PortKind::TextMessage => "TEXT_MESSAGE".to_string(),
            PortKind::Position => "POSITION".to_string(),
            PortKind::Routing => "ROUTING".to_string(),
            PortKind::NodeInfo => "NODEINFO".to_string(),
            PortKind::Telemetry => "TELEMETRY".to_string(),
            PortKind::Admin => "ADMIN".to_string(),
            PortKind::Other(n) => match proto::PortNum::try_from(*n) {
                Ok(p) => p.as_str_name().trim_end_matches("_APP").to_string(),
                Err(_) => format!("PORT_{}", n),
            },
        }
    }

    /// Parse a filter label. Accepts the label, the full upstream name
    /// (`ROUTING_APP`), `TEXT` as shorthand, or a bare port number.
    pub fn parse_label(input: &str) -> Option<PortKind> {
        let upper = input.trim().to_ascii_uppercase();
        let name = upper.trim_end_matches("_APP");
        if name.is_empty() {
            return None;
        }
        if name == "TEXT" {
            return Some(PortKind::TextMessage);
        }
        if let Ok(n) = name.parse::<i32>() {
            return Some(PortKind::from(n));
        }
        if let Some(n) = name.strip_prefix("PORT_").and_then(|n| n.parse::<i32>().ok()) {
            return Some(PortKind::from(n));
        }
        (0..=proto::PortNum::Max as i32)
            .filter_map(|n| proto::PortNum::try_from(n).ok())
            .find(|p| p.as_str_name().trim_end_matches("_APP") == name)
            .map(|p| PortKind::from(p as i32))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Text(String),
    Position {
        lat: Option<f64>,
        lon: Option<f64>,
        alt: Option<i32>,
    },
    /// Routing control message. `error_reason` is the upstream error name
    /// (`"NONE"` on successful delivery) and is absent for route discovery.
    Routing { error_reason: Option<String> },
    NodeInfo { long_name: String, short_name: String },
    Telemetry(String),
    Admin,
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshEvent {
    pub source_id: String,
    pub destination_id: String,
    pub channel: u32,
    pub port: PortKind,
    pub payload: EventPayload,
    pub packet_id: u32,
    pub rx_snr: Option<f32>,
    pub rx_time: Option<DateTime<Utc>>,
}

impl MeshEvent {
    /// Build an event from a received packet. Encrypted packets (ones this node
    /// could not decrypt) carry nothing to show and yield `None`.
    pub fn from_packet(packet: &proto::MeshPacket) -> Option<MeshEvent> {
        let data = match packet.payload_variant.as_ref()? {
            proto::mesh_packet::PayloadVariant::Decoded(data) => data,
            proto::mesh_packet::PayloadVariant::Encrypted(_) => return None,
        };
        let port = PortKind::from(data.portnum);
        Some(MeshEvent {
            source_id: node_id_string(packet.from),
            destination_id: if packet.to == BROADCAST_NUM {
                BROADCAST_ID.to_string()
            } else {
                node_id_string(packet.to)
            },
            channel: packet.channel,
            port,
            payload: decode_payload(port, &data.payload),
            packet_id: packet.id,
            rx_snr: snr_reading(packet.rx_snr),
            rx_time: if packet.rx_time != 0 {
                Utc.timestamp_opt(packet.rx_time as i64, 0).single()
            } else {
                None
            },
        })
    }

    pub fn is_broadcast(&self) -> bool {
        self.destination_id == BROADCAST_ID
    }

    /// Routing error reason carried by this event, if it is a routing reply.
    pub fn routing_reason(&self) -> Option<&str> {
        match (&self.port, &self.payload) {
            (PortKind::Routing, EventPayload::Routing { error_reason }) => error_reason.as_deref(),
            _ => None,
        }
    }
}

/// Upstream name of a routing error code; unknown codes render as `ERROR_<n>`.
pub fn routing_error_name(code: i32) -> String {
    match proto::routing::Error::try_from(code) {
        Ok(e) => e.as_str_name().to_string(),
        Err(_) => format!("ERROR_{}", code),
    }
}

fn decode_payload(port: PortKind, payload: &[u8]) -> EventPayload {
    let raw = || EventPayload::Raw(payload.to_vec());
    match port {
        PortKind::TextMessage => EventPayload::Text(String::from_utf8_lossy(payload).into_owned()),
        PortKind::Position => match proto::Position::decode(payload) {
            Ok(pos) => EventPayload::Position {
                lat: pos.latitude_i.map(|v| v as f64 * 1e-7),
                lon: pos.longitude_i.map(|v| v as f64 * 1e-7),
                alt: pos.altitude,
            },
            Err(_) => raw(),
        },
        PortKind::Routing => match proto::Routing::decode(payload) {
            Ok(routing) => EventPayload::Routing {
                error_reason: match routing.variant {
                    Some(proto::routing::Variant::ErrorReason(code)) => {
                        Some(routing_error_name(code))
                    }
                    _ => None,
                },
            },
            Err(_) => raw(),
        },
        PortKind::NodeInfo => match proto::User::decode(payload) {
            Ok(user) => EventPayload::NodeInfo {
                long_name: user.long_name.trim().to_string(),
                short_name: user.short_name.trim().to_string(),
            },
            Err(_) => raw(),
        },
        PortKind::Telemetry => match proto::Telemetry::decode(payload) {
            Ok(t) => EventPayload::Telemetry(summarize_telemetry(&t)),
            Err(_) => raw(),
        },
        PortKind::Admin => EventPayload::Admin,
        PortKind::Other(_) => raw(),
    }
}

fn fmt_percent(val: f32) -> String {
    if val.is_finite() {
        if val <= 1.0 {
            format!("{:.0}%", val * 100.0)
        } else {
            format!("{:.0}%", val)
        }
    } else {
        "na".to_string()
    }
}

/// One-line summary of a telemetry report.
pub fn summarize_telemetry(t: &proto::Telemetry) -> String {
    use proto::telemetry::Variant;
    match &t.variant {
        Some(Variant::DeviceMetrics(dm)) => {
            let mut parts: Vec<String> = Vec::new();
            if let Some(batt) = dm.battery_level {
                parts.push(format!("batt={}%", batt));
            }
            if let Some(v) = dm.voltage {
                parts.push(format!("v={:.2}V", v));
            }
            if let Some(up) = dm.uptime_seconds {
                parts.push(format!("up={}s", up));
            }
            if let Some(util) = dm.channel_utilization {
                parts.push(format!("util={}", fmt_percent(util)));
            }
            if let Some(tx) = dm.air_util_tx {
                parts.push(format!("tx={}", fmt_percent(tx)));
            }
            if parts.is_empty() {
                "device".to_string()
            } else {
                format!("device {}", parts.join(" "))
            }
        }
        Some(Variant::EnvironmentMetrics(env)) => {
            let mut parts: Vec<String> = Vec::new();
            if let Some(t) = env.temperature {
                parts.push(format!("temp={:.1}C", t));
            }
            if let Some(h) = env.relative_humidity {
                parts.push(format!("hum={:.0}%", h));
            }
            if let Some(p) = env.barometric_pressure {
                parts.push(format!("press={:.0}hPa", p));
            }
            if parts.is_empty() {
                "environment".to_string()
            } else {
                format!("environment {}", parts.join(" "))
            }
        }
        None => "empty".to_string(),
    }
}
