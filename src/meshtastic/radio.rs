//! Outbound side of the link: encodes `ToRadio` messages and writes them as
//! stream frames through a shared writer.
use anyhow::{anyhow, bail, Result};
use log::{debug, trace};
use prost::Message;
use rand::RngCore;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use super::event::BROADCAST_NUM;
use super::framer::encode_frame;
use super::nodes::{ChannelRecord, ChannelRole, DeviceState, GeoPoint};
use super::{DeviceAdmin, TextSender};
use crate::logutil::{escape_log, hex_snippet, truncate_for_log};
use crate::protobuf::meshtastic as proto;
use crate::validation::{parse_node_id, MAX_TEXT_BYTES};

const DEFAULT_HOP_LIMIT: u32 = 3;
const PSK_LEN: usize = 32;

/// Random id that is never zero; zero means "unset" on the wire.
pub fn random_nonzero_id() -> u32 {
    let id: u32 = rand::random();
    if id == 0 {
        1
    } else {
        id
    }
}

/// Cloneable handle for sending to the radio.
#[derive(Clone)]
pub struct RadioHandle {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    state: Arc<RwLock<DeviceState>>,
    open: Arc<AtomicBool>,
}

impl RadioHandle {
    pub fn new(writer: Box<dyn Write + Send>, state: Arc<RwLock<DeviceState>>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            state,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Refuse further sends.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn send_toradio(&self, msg: proto::ToRadio) -> Result<()> {
        if !self.is_open() {
            bail!("radio link is not connected");
        }
        let payload = msg.encode_to_vec();
        let frame = encode_frame(&payload)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow!("radio writer lock poisoned"))?;
        writer.write_all(&frame)?;
        writer.flush()?;
        trace!("ToRadio {} bytes: {}", payload.len(), hex_snippet(&payload, 48));
        Ok(())
    }

    /// Ask the radio to stream its node database, channels and config.
    pub fn send_want_config(&self, request_id: u32) -> Result<()> {
        self.send_toradio(proto::ToRadio {
            payload_variant: Some(proto::to_radio::PayloadVariant::WantConfigId(request_id)),
        })
    }

    pub fn send_heartbeat(&self) -> Result<()> {
        let nonce = rand::random::<u32>() & 0xffff;
        self.send_toradio(proto::ToRadio {
            payload_variant: Some(proto::to_radio::PayloadVariant::Heartbeat(
                proto::Heartbeat { nonce },
            )),
        })?;
        trace!("Sent heartbeat nonce={}", nonce);
        Ok(())
    }

    /// Tell the radio the client is leaving so it stops queueing for us.
    pub fn send_disconnect(&self) -> Result<()> {
        self.send_toradio(proto::ToRadio {
            payload_variant: Some(proto::to_radio::PayloadVariant::Disconnect(true)),
        })
    }

    fn state(&self) -> std::sync::RwLockReadGuard<'_, DeviceState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn state_mut(&self) -> std::sync::RwLockWriteGuard<'_, DeviceState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn my_node_num(&self) -> Result<u32> {
        self.state()
            .my_node_num
            .ok_or_else(|| anyhow!("own node number not yet known (radio has not sent my_info)"))
    }

    fn send_text_packet(&self, to: u32, channel: u32, text: &str, want_ack: bool) -> Result<u32> {
        if text.len() > MAX_TEXT_BYTES {
            bail!(
                "message of {} bytes exceeds the {} byte payload limit",
                text.len(),
                MAX_TEXT_BYTES
            );
        }
        let id = random_nonzero_id();
        let priority = if want_ack {
            proto::mesh_packet::Priority::Reliable
        } else {
            proto::mesh_packet::Priority::Unset
        };
        let packet = proto::MeshPacket {
            to,
            channel,
            id,
            hop_limit: DEFAULT_HOP_LIMIT,
            want_ack,
            priority: priority as i32,
            payload_variant: Some(proto::mesh_packet::PayloadVariant::Decoded(proto::Data {
                portnum: proto::PortNum::TextMessageApp as i32,
                payload: text.as_bytes().to_vec(),
                ..Default::default()
            })),
            ..Default::default()
        };
        self.send_toradio(proto::ToRadio {
            payload_variant: Some(proto::to_radio::PayloadVariant::Packet(packet)),
        })?;
        debug!(
            "Sent text ({}): to=0x{:08x} channel={} id={} want_ack={} text='{}'",
            if to == BROADCAST_NUM { "broadcast" } else { "direct" },
            to,
            channel,
            id,
            want_ack,
            truncate_for_log(text, 80)
        );
        Ok(id)
    }

    fn send_admin(&self, variant: proto::admin_message::PayloadVariant) -> Result<u32> {
        let me = self.my_node_num()?;
        let admin = proto::AdminMessage {
            payload_variant: Some(variant),
        };
        let id = random_nonzero_id();
        let packet = proto::MeshPacket {
            to: me,
            id,
            hop_limit: DEFAULT_HOP_LIMIT,
            payload_variant: Some(proto::mesh_packet::PayloadVariant::Decoded(proto::Data {
                portnum: proto::PortNum::AdminApp as i32,
                payload: admin.encode_to_vec(),
                want_response: true,
                ..Default::default()
            })),
            ..Default::default()
        };
        self.send_toradio(proto::ToRadio {
            payload_variant: Some(proto::to_radio::PayloadVariant::Packet(packet)),
        })?;
        Ok(id)
    }

    fn write_channel(&self, record: &ChannelRecord) -> Result<()> {
        self.send_admin(proto::admin_message::PayloadVariant::SetChannel(
            record.to_proto(),
        ))?;
        debug!(
            "Wrote channel {} ({} '{}')",
            record.index,
            record.role.label(),
            escape_log(&record.name)
        );
        Ok(())
    }
}

impl TextSender for RadioHandle {
    fn send_broadcast(&self, text: &str, channel: u32) -> Result<u32> {
        self.send_text_packet(BROADCAST_NUM, channel, text, false)
    }

    fn send_direct(&self, text: &str, destination: &str, want_ack: bool) -> Result<u32> {
        let to = parse_node_id(destination)?;
        self.send_text_packet(to, 0, text, want_ack)
    }
}

impl DeviceAdmin for RadioHandle {
    fn set_owner(&self, long_name: &str, short_name: &str) -> Result<()> {
        let user = proto::User {
            long_name: long_name.to_string(),
            short_name: short_name.to_string(),
            ..Default::default()
        };
        self.send_admin(proto::admin_message::PayloadVariant::SetOwner(user.clone()))?;
        let me = self.my_node_num()?;
        self.state_mut().nodes.update_user(me, &user);
        Ok(())
    }

    fn set_fixed_position(&self, lat: f64, lon: f64, alt: Option<i32>) -> Result<()> {
        let pos = proto::Position {
            latitude_i: Some((lat * 1e7).round() as i32),
            longitude_i: Some((lon * 1e7).round() as i32),
            altitude: alt,
            time: 0,
        };
        self.send_admin(proto::admin_message::PayloadVariant::SetFixedPosition(pos))?;
        let me = self.my_node_num()?;
        self.state_mut().nodes.entry(me).position = Some(GeoPoint { lat, lon, alt });
        Ok(())
    }

    fn add_channel(&self, name: &str) -> Result<u32> {
        let slot = {
            let state = self.state();
            state
                .channels
                .iter()
                .find(|c| c.index > 0 && c.role == ChannelRole::Disabled)
                .map(|c| c.index)
        };
        let index = slot.ok_or_else(|| anyhow!("no free channel slot"))?;
        let mut psk = vec![0u8; PSK_LEN];
        rand::thread_rng().fill_bytes(&mut psk);
        let record = ChannelRecord {
            index,
            name: name.to_string(),
            role: ChannelRole::Secondary,
            psk,
        };
        self.write_channel(&record)?;
        self.state_mut().set_channel(record);
        Ok(index)
    }

    fn delete_channel(&self, index: u32) -> Result<()> {
        if index == 0 {
            bail!("channel 0 is the primary channel and cannot be deleted");
        }
        let mut channels = self.state().channels.clone();
        let target = channels
            .get(index as usize)
            .ok_or_else(|| anyhow!("channel index {} out of range", index))?;
        if target.role != ChannelRole::Secondary {
            bail!(
                "only secondary channels can be deleted (channel {} is {})",
                index,
                target.role.label()
            );
        }

        channels.remove(index as usize);
        channels.push(ChannelRecord::disabled(0));
        for (i, ch) in channels.iter_mut().enumerate() {
            ch.index = i as u32;
        }
        for ch in channels.iter().skip(index as usize) {
            self.write_channel(ch)?;
            self.state_mut().set_channel(ch.clone());
        }
        Ok(())
    }

    fn reboot(&self, seconds: i32) -> Result<()> {
        self.send_admin(proto::admin_message::PayloadVariant::RebootSeconds(seconds))?;
        debug!("Requested reboot in {}s", seconds);
        Ok(())
    }
}
