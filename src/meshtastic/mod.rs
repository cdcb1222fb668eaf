//! # Meshtastic Device Communication Module
//!
//! Talks to a Meshtastic radio over its serial protobuf stream API.
//!
//! ## Features
//!
//! - **Serial link**: opens the port at 8N1, wakes the radio with DTR/RTS and
//!   discards boot output ([`link`])
//! - **Stream framing**: `0x94 0xC3 <len>` frames with resynchronisation ([`framer`])
//! - **Event feed**: every received mesh packet becomes one [`MeshEvent`], in
//!   arrival order, on an unbounded channel ([`reader`], [`event`])
//! - **Device state**: node database, own node number, channels and firmware
//!   metadata, shared read-only with the console ([`nodes`])
//! - **Commands**: text sends and local administration through
//!   [`RadioHandle`] ([`radio`])
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meshconsole::config::MeshtasticConfig;
//! use meshconsole::meshtastic::{Connection, TextSender};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut conn = Connection::connect_serial(&MeshtasticConfig::default()).await?;
//!     conn.wait_for_config(std::time::Duration::from_secs(10)).await;
//!     conn.radio.send_broadcast("hello mesh", 0)?;
//!     let mut events = conn.take_events();
//!     while let Some(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The console core depends only on [`TextSender`] / [`DeviceAdmin`] and the
//! event feed, never on the wire types.

use anyhow::Result;
use log::{debug, info, warn};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub mod event;
pub mod framer;
pub mod link;
pub mod nodes;
pub mod radio;
pub mod reader;

pub use event::{node_id_string, snr_reading, EventPayload, MeshEvent, PortKind};
pub use link::LinkHalves;
pub use nodes::{ChannelRecord, ChannelRole, DeviceState, NodeRecord, NodeTable, Resolution};
pub use radio::RadioHandle;
pub use reader::MeshtasticReader;

use crate::config::MeshtasticConfig;

/// Control messages for coordinating between tasks
#[derive(Debug)]
pub enum ControlMessage {
    Shutdown,
}

/// Text transmission primitives. Both return the packet id assigned to the
/// outbound packet.
pub trait TextSender: Send + Sync {
    /// Fire-and-forget broadcast on `channel`.
    fn send_broadcast(&self, text: &str, channel: u32) -> Result<u32>;

    /// Send to one node (`!xxxxxxxx`). With `want_ack` the mesh answers with a
    /// routing reply from the destination.
    fn send_direct(&self, text: &str, destination: &str, want_ack: bool) -> Result<u32>;
}

/// Local device configuration primitives.
pub trait DeviceAdmin: Send + Sync {
    fn set_owner(&self, long_name: &str, short_name: &str) -> Result<()>;
    fn set_fixed_position(&self, lat: f64, lon: f64, alt: Option<i32>) -> Result<()>;
    /// Enable the first free slot as a secondary channel; returns its index.
    fn add_channel(&self, name: &str) -> Result<u32>;
    fn delete_channel(&self, index: u32) -> Result<()>;
    fn reboot(&self, seconds: i32) -> Result<()>;
}

/// A running link: radio handle, event feed and the background tasks feeding it.
pub struct Connection {
    pub radio: RadioHandle,
    pub state: Arc<RwLock<DeviceState>>,
    events: Option<mpsc::UnboundedReceiver<MeshEvent>>,
    control_tx: mpsc::UnboundedSender<ControlMessage>,
    config_done: watch::Receiver<bool>,
    reader_task: Option<JoinHandle<Result<()>>>,
    heartbeat_task: Option<JoinHandle<()>>,
}

impl Connection {
    /// Open the configured serial port and start the link.
    pub async fn connect_serial(cfg: &MeshtasticConfig) -> Result<Self> {
        let halves = link::open_serial(&cfg.port, cfg.baud_rate).await?;
        info!("Connected to {} at {} baud", cfg.port, cfg.baud_rate);
        Self::start(halves, Duration::from_secs(cfg.heartbeat_interval_secs))
    }

    /// Start reader, read pump and heartbeat over an already-open link, then
    /// request the radio's configuration. A zero `heartbeat_interval` disables
    /// heartbeats.
    pub fn start(halves: LinkHalves, heartbeat_interval: Duration) -> Result<Self> {
        let state = Arc::new(RwLock::new(DeviceState::default()));
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = watch::channel(false);

        let radio = RadioHandle::new(halves.writer, state.clone());
        let config_id = radio::random_nonzero_id();

        let reader = MeshtasticReader::new(
            raw_rx,
            control_rx,
            event_tx,
            state.clone(),
            Some(config_id),
            done_tx,
        );
        let reader_task = tokio::spawn(reader.run());
        link::spawn_read_pump(halves.reader, raw_tx)?;

        debug!("Requesting radio configuration (want_config_id=0x{:08x})", config_id);
        radio.send_want_config(config_id)?;

        let heartbeat_task = if heartbeat_interval.is_zero() {
            None
        } else {
            let hb_radio = radio.clone();
            Some(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(heartbeat_interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if !hb_radio.is_open() {
                        break;
                    }
                    if let Err(e) = hb_radio.send_heartbeat() {
                        warn!("Heartbeat failed: {}", e);
                    }
                }
            }))
        };

        Ok(Self {
            radio,
            state,
            events: Some(event_rx),
            control_tx,
            config_done: done_rx,
            reader_task: Some(reader_task),
            heartbeat_task,
        })
    }

    /// Take the event feed. It can be taken once; later calls get a closed receiver.
    pub fn take_events(&mut self) -> mpsc::UnboundedReceiver<MeshEvent> {
        self.events.take().unwrap_or_else(|| mpsc::unbounded_channel().1)
    }

    /// Wait until the radio finished streaming its configuration. Returns
    /// `false` on timeout or if the link closed first.
    pub async fn wait_for_config(&mut self, limit: Duration) -> bool {
        let result = tokio::time::timeout(limit, self.config_done.wait_for(|done| *done)).await;
        matches!(result, Ok(Ok(_)))
    }

    /// Stop the background tasks and tell the radio we are going away.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.radio.send_disconnect() {
            debug!("Disconnect notice not sent: {}", e);
        }
        self.radio.close();
        let _ = self.control_tx.send(ControlMessage::Shutdown);
        if let Some(task) = self.heartbeat_task.take() {
            task.abort();
        }
        if let Some(task) = self.reader_task.take() {
            match tokio::time::timeout(Duration::from_secs(2), task).await {
                Ok(Ok(Err(e))) => warn!("Reader task ended with error: {}", e),
                Ok(Err(e)) => warn!("Reader task panicked: {}", e),
                Err(_) => warn!("Reader task did not stop in time"),
                Ok(Ok(Ok(()))) => {}
            }
        }
        info!("Meshtastic link closed");
    }
}
