//! Test utilities & fixtures shared by the integration tests.
#![allow(dead_code)] // each test binary uses a different subset

use std::io::Write;
use std::sync::{Arc, Mutex};

use meshconsole::meshtastic::{DeviceAdmin, EventPayload, MeshEvent, PortKind, TextSender};
use meshconsole::protobuf::meshtastic as proto;
use prost::Message;
use tokio::sync::mpsc;

/// Writer whose contents stay readable after it was boxed away.
#[derive(Clone, Default)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn routing_event(from: &str, reason: Option<&str>) -> MeshEvent {
    MeshEvent {
        source_id: from.to_string(),
        destination_id: "!00000001".to_string(),
        channel: 0,
        port: PortKind::Routing,
        payload: EventPayload::Routing {
            error_reason: reason.map(str::to_string),
        },
        packet_id: 77,
        rx_snr: None,
        rx_time: None,
    }
}

pub fn text_event(from: &str, to: &str, text: &str) -> MeshEvent {
    MeshEvent {
        source_id: from.to_string(),
        destination_id: to.to_string(),
        channel: 0,
        port: PortKind::TextMessage,
        payload: EventPayload::Text(text.to_string()),
        packet_id: 78,
        rx_snr: Some(6.5),
        rx_time: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Broadcast { text: String, channel: u32 },
    Direct { text: String, destination: String, want_ack: bool },
    Owner { long_name: String, short_name: String },
    Position { lat: f64, lon: f64 },
    AddChannel(String),
    DeleteChannel(u32),
    Reboot(i32),
}

/// In-memory radio. Records every call; optionally answers direct messages
/// by pushing a routing reply from the destination into the inbound feed.
#[derive(Default)]
pub struct MockRadio {
    pub sent: Mutex<Vec<Sent>>,
    pub fail_sends: Mutex<bool>,
    pub reply: Mutex<Option<String>>,
    pub feed: Mutex<Option<mpsc::UnboundedSender<MeshEvent>>>,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer each direct message with a routing reply carrying `reason`.
    pub fn replying(feed: mpsc::UnboundedSender<MeshEvent>, reason: &str) -> Self {
        let radio = Self::default();
        *radio.feed.lock().unwrap() = Some(feed);
        *radio.reply.lock().unwrap() = Some(reason.to_string());
        radio
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail_sends.lock().unwrap() = fail;
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, call: Sent) -> anyhow::Result<()> {
        if *self.fail_sends.lock().unwrap() {
            anyhow::bail!("serial write failed");
        }
        self.sent.lock().unwrap().push(call);
        Ok(())
    }
}

impl TextSender for MockRadio {
    fn send_broadcast(&self, text: &str, channel: u32) -> anyhow::Result<u32> {
        self.record(Sent::Broadcast {
            text: text.to_string(),
            channel,
        })?;
        Ok(1)
    }

    fn send_direct(&self, text: &str, destination: &str, want_ack: bool) -> anyhow::Result<u32> {
        self.record(Sent::Direct {
            text: text.to_string(),
            destination: destination.to_string(),
            want_ack,
        })?;
        let reply = self.reply.lock().unwrap().clone();
        if let (Some(reason), Some(feed)) = (reply, self.feed.lock().unwrap().as_ref()) {
            let _ = feed.send(routing_event(destination, Some(&reason)));
        }
        Ok(2)
    }
}

impl DeviceAdmin for MockRadio {
    fn set_owner(&self, long_name: &str, short_name: &str) -> anyhow::Result<()> {
        self.record(Sent::Owner {
            long_name: long_name.to_string(),
            short_name: short_name.to_string(),
        })
    }

    fn set_fixed_position(&self, lat: f64, lon: f64, _alt: Option<i32>) -> anyhow::Result<()> {
        self.record(Sent::Position { lat, lon })
    }

    fn add_channel(&self, name: &str) -> anyhow::Result<u32> {
        self.record(Sent::AddChannel(name.to_string()))?;
        Ok(1)
    }

    fn delete_channel(&self, index: u32) -> anyhow::Result<()> {
        self.record(Sent::DeleteChannel(index))
    }

    fn reboot(&self, seconds: i32) -> anyhow::Result<()> {
        self.record(Sent::Reboot(seconds))
    }
}

/// Stream frame around an encoded `FromRadio`.
pub fn from_radio_frame(variant: proto::from_radio::PayloadVariant) -> Vec<u8> {
    let msg = proto::FromRadio {
        id: 1,
        payload_variant: Some(variant),
    };
    meshconsole::meshtastic::framer::encode_frame(&msg.encode_to_vec()).unwrap()
}

/// Received mesh packet with a decoded payload.
pub fn packet(from: u32, to: u32, port: proto::PortNum, payload: Vec<u8>) -> proto::MeshPacket {
    proto::MeshPacket {
        from,
        to,
        id: 4242,
        rx_snr: 7.25,
        payload_variant: Some(proto::mesh_packet::PayloadVariant::Decoded(proto::Data {
            portnum: port as i32,
            payload,
            ..Default::default()
        })),
        ..Default::default()
    }
}

/// Split a written byte stream back into `ToRadio` messages.
pub fn decode_to_radio(bytes: &[u8]) -> Vec<proto::ToRadio> {
    let mut framer = meshconsole::meshtastic::framer::StreamFramer::new();
    framer.push(bytes);
    let mut out = Vec::new();
    while let Some(frame) = framer.next_frame() {
        out.push(proto::ToRadio::decode(frame.as_slice()).unwrap());
    }
    out
}

/// Admin messages among decoded `ToRadio` packets, with the packet they rode in.
pub fn admin_messages(msgs: &[proto::ToRadio]) -> Vec<(proto::MeshPacket, proto::AdminMessage)> {
    msgs.iter()
        .filter_map(|m| match &m.payload_variant {
            Some(proto::to_radio::PayloadVariant::Packet(p)) => Some(p.clone()),
            _ => None,
        })
        .filter_map(|p| match &p.payload_variant {
            Some(proto::mesh_packet::PayloadVariant::Decoded(d))
                if d.portnum == proto::PortNum::AdminApp as i32 =>
            {
                let admin = proto::AdminMessage::decode(d.payload.as_slice()).ok()?;
                Some((p.clone(), admin))
            }
            _ => None,
        })
        .collect()
}
