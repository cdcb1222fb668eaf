//! Reader task: frames raw link bytes, decodes `FromRadio` messages, keeps the
//! shared [`DeviceState`] current and publishes one [`MeshEvent`] per received
//! mesh packet, in arrival order.
use anyhow::Result;
use chrono::Utc;
use log::{debug, info, trace, warn};
use prost::Message;
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, watch};

use super::event::{snr_reading, MeshEvent};
use super::framer::StreamFramer;
use super::nodes::{ChannelRecord, DeviceMetadata, DeviceState};
use super::ControlMessage;
use crate::logutil::{escape_log, hex_snippet, truncate_for_log};
use crate::metrics;
use crate::protobuf::meshtastic as proto;

pub struct MeshtasticReader {
    framer: StreamFramer,
    raw_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    control_rx: mpsc::UnboundedReceiver<ControlMessage>,
    event_tx: mpsc::UnboundedSender<MeshEvent>,
    state: Arc<RwLock<DeviceState>>,
    config_id: Option<u32>,
    config_done: watch::Sender<bool>,
}

impl MeshtasticReader {
    /// `config_id` is the want-config request whose completion flips
    /// `config_done`; `None` accepts any completion.
    pub fn new(
        raw_rx: mpsc::UnboundedReceiver<Vec<u8>>,
        control_rx: mpsc::UnboundedReceiver<ControlMessage>,
        event_tx: mpsc::UnboundedSender<MeshEvent>,
        state: Arc<RwLock<DeviceState>>,
        config_id: Option<u32>,
        config_done: watch::Sender<bool>,
    ) -> Self {
        Self {
            framer: StreamFramer::new(),
            raw_rx,
            control_rx,
            event_tx,
            state,
            config_id,
            config_done,
        }
    }

    /// Run until shutdown or until the link closes. Dropping the reader closes
    /// the event feed.
    pub async fn run(mut self) -> Result<()> {
        info!("Starting Meshtastic reader task");
        loop {
            tokio::select! {
                control_msg = self.control_rx.recv() => {
                    match control_msg {
                        Some(ControlMessage::Shutdown) | None => {
                            info!("Reader task received shutdown signal");
                            break;
                        }
                    }
                }
                chunk = self.raw_rx.recv() => {
                    match chunk {
                        Some(bytes) => {
                            self.framer.push(&bytes);
                            while let Some(frame) = self.framer.next_frame() {
                                if let Err(e) = self.process_frame(&frame) {
                                    metrics::inc_frames_undecodable();
                                    warn!(
                                        "Dropping undecodable frame ({} bytes, {}...): {}",
                                        frame.len(),
                                        hex_snippet(&frame, 16),
                                        e
                                    );
                                }
                            }
                        }
                        None => {
                            warn!("Link closed; stopping reader");
                            break;
                        }
                    }
                }
            }
        }
        info!(
            "Meshtastic reader task shutting down ({} bytes of non-frame output skipped)",
            self.framer.skipped()
        );
        Ok(())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, DeviceState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn process_frame(&mut self, data: &[u8]) -> Result<()> {
        use proto::from_radio::PayloadVariant;

        let msg = proto::FromRadio::decode(data)?;
        let Some(variant) = msg.payload_variant else {
            trace!("FromRadio id={} without payload", msg.id);
            return Ok(());
        };
        match variant {
            PayloadVariant::Packet(packet) => self.handle_packet(&packet),
            PayloadVariant::MyInfo(info) => {
                debug!("my_info: node=!{:08x}", info.my_node_num);
                let mut state = self.write_state();
                state.my_node_num = Some(info.my_node_num);
                state.reboot_count = info.reboot_count;
                state.nodes.entry(info.my_node_num);
            }
            PayloadVariant::NodeInfo(info) => {
                trace!("node_info: !{:08x}", info.num);
                self.write_state().nodes.upsert_node_info(&info);
            }
            PayloadVariant::Channel(ch) => {
                let record = ChannelRecord::from_proto(&ch);
                debug!(
                    "channel {}: {} '{}'",
                    record.index,
                    record.role.label(),
                    escape_log(&record.name)
                );
                if !self.write_state().set_channel(record) {
                    warn!("Ignoring channel with out-of-range index {}", ch.index);
                }
            }
            PayloadVariant::Metadata(md) => {
                debug!("firmware {}", escape_log(&md.firmware_version));
                self.write_state().metadata = Some(DeviceMetadata {
                    firmware_version: md.firmware_version,
                    hw_model: md.hw_model,
                    role: md.role,
                    has_wifi: md.has_wifi,
                    has_bluetooth: md.has_bluetooth,
                });
            }
            PayloadVariant::ConfigCompleteId(id) => {
                if self.config_id.map_or(true, |want| want == id) {
                    info!("Radio configuration download complete (id=0x{:08x})", id);
                    self.write_state().config_complete = true;
                    let _ = self.config_done.send(true);
                } else {
                    debug!("Ignoring config_complete_id 0x{:08x} for another request", id);
                }
            }
            PayloadVariant::LogRecord(rec) => {
                debug!(
                    "device log [{}]: {}",
                    escape_log(&rec.source),
                    truncate_for_log(&rec.message, 200)
                );
            }
            PayloadVariant::Rebooted(_) => {
                warn!("Radio reports it rebooted");
                self.write_state().config_complete = false;
            }
            PayloadVariant::QueueStatus(q) => {
                trace!("queue status: free={} of {} (res={})", q.free, q.maxlen, q.res);
            }
        }
        Ok(())
    }

    fn handle_packet(&mut self, packet: &proto::MeshPacket) {
        use proto::mesh_packet::PayloadVariant;

        let heard = if packet.rx_time != 0 {
            chrono::TimeZone::timestamp_opt(&Utc, packet.rx_time as i64, 0)
                .single()
                .unwrap_or_else(Utc::now)
        } else {
            Utc::now()
        };
        let snr = snr_reading(packet.rx_snr);

        {
            let mut state = self.write_state();
            if state.my_node_num != Some(packet.from) {
                state.nodes.touch(packet.from, heard, snr);
            }
            if let Some(PayloadVariant::Decoded(data)) = &packet.payload_variant {
                self.apply_payload(&mut state, packet.from, data);
            }
        }

        match MeshEvent::from_packet(packet) {
            Some(event) => {
                metrics::inc_packets_received();
                trace!(
                    "packet {} from {} port={} ch={}",
                    event.packet_id,
                    event.source_id,
                    event.port.label(),
                    event.channel
                );
                if self.event_tx.send(event).is_err() {
                    debug!("Event feed receiver dropped");
                }
            }
            None => trace!("Skipping encrypted packet from !{:08x}", packet.from),
        }
    }

    fn apply_payload(&self, state: &mut DeviceState, from: u32, data: &proto::Data) {
        match proto::PortNum::try_from(data.portnum) {
            Ok(proto::PortNum::NodeinfoApp) => {
                if let Ok(user) = proto::User::decode(data.payload.as_slice()) {
                    state.nodes.update_user(from, &user);
                }
            }
            Ok(proto::PortNum::PositionApp) => {
                if let Ok(pos) = proto::Position::decode(data.payload.as_slice()) {
                    state.nodes.update_position(from, &pos);
                }
            }
            Ok(proto::PortNum::TelemetryApp) => {
                if let Ok(t) = proto::Telemetry::decode(data.payload.as_slice()) {
                    if let Some(proto::telemetry::Variant::DeviceMetrics(dm)) = t.variant {
                        state.nodes.update_metrics(from, &dm);
                    }
                }
            }
            _ => {}
        }
    }
}
