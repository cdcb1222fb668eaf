//! # Operator console
//!
//! Everything between the radio link and the operator:
//!
//! - [`correlator`] pairs an outstanding direct message with its routing reply
//! - [`sender`] runs send-and-wait and broadcasts
//! - [`commands`] parses typed lines, [`render`] formats output
//! - [`Console`] ties them together in an interactive loop
//!
//! The inbound feed has exactly one consumer, the event pump started by
//! [`spawn_event_pump`]. It offers every event to the correlator first and
//! forwards the rest to the display channel, so an acknowledgment that was
//! consumed never shows up as traffic.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use meshconsole::config::Config;
//! use meshconsole::console::{self, AckCorrelator, Console};
//! use meshconsole::meshtastic::Connection;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_or_default("meshconsole.toml").await?;
//!     let mut conn = Connection::connect_serial(&config.meshtastic).await?;
//!     let correlator = Arc::new(AckCorrelator::new());
//!     let (display, _pump) = console::spawn_event_pump(conn.take_events(), correlator.clone());
//!     let console = Console::new(
//!         Arc::new(conn.radio.clone()),
//!         conn.state.clone(),
//!         correlator,
//!         config.console.clone(),
//!         console::stdout_output(),
//!     );
//!     console.run(display, console::spawn_stdin_reader()).await;
//!     conn.shutdown().await;
//!     Ok(())
//! }
//! ```
pub mod commands;
pub mod correlator;
pub mod errors;
pub mod render;
pub mod sender;

pub use commands::{parse, Command, FilterAction, NodeScope};
pub use correlator::{AckCorrelator, AckStatus};
pub use errors::ConsoleError;
pub use render::Renderer;
pub use sender::{DeliveryOutcome, DirectMessenger};

use chrono::Utc;
use log::{debug, info, trace, warn};
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::config::ConsoleConfig;
use crate::logutil::escape_log;
use crate::meshtastic::{DeviceAdmin, DeviceState, MeshEvent, PortKind, Resolution, TextSender};
use crate::metrics;
use crate::validation::{
    default_short_name, validate_channel_name, validate_coordinates, validate_long_name,
    validate_message_text, validate_short_name,
};

/// Seconds the radio waits before rebooting after `config reboot`.
pub const REBOOT_DELAY_SECS: i32 = 5;

/// Where console output goes. Shared with the spawned direct-message tasks.
pub type SharedOutput = Arc<Mutex<Box<dyn Write + Send>>>;

pub fn stdout_output() -> SharedOutput {
    Arc::new(Mutex::new(Box::new(std::io::stdout())))
}

fn emit(out: &SharedOutput, text: &str) {
    let mut w = out.lock().unwrap_or_else(|e| e.into_inner());
    let _ = w.write_all(text.as_bytes());
    let _ = w.flush();
}

/// Start the single consumer of the inbound feed. Events the correlator
/// consumes are dropped; everything else goes to the returned display
/// channel in arrival order. When the feed closes, the correlator is closed
/// so a pending send-and-wait returns at once.
pub fn spawn_event_pump(
    mut feed: mpsc::UnboundedReceiver<MeshEvent>,
    correlator: Arc<AckCorrelator>,
) -> (mpsc::UnboundedReceiver<MeshEvent>, JoinHandle<()>) {
    let (display_tx, display_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        while let Some(event) = feed.recv().await {
            if correlator.observe(&event) {
                trace!("Consumed acknowledgment from {}", event.source_id);
                continue;
            }
            if display_tx.send(event).is_err() {
                debug!("Display channel closed; event pump continues for acknowledgments");
            }
        }
        info!("Inbound event feed closed");
        correlator.close();
    });
    (display_rx, handle)
}

/// Read operator lines from stdin on a blocking thread. End of input closes
/// the returned channel.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("stdin read error: {}", e);
                    break;
                }
            }
        }
        debug!("stdin closed");
    });
    rx
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Interactive console over a radio that can send text and administer the
/// local device.
pub struct Console<R: TextSender + DeviceAdmin + 'static> {
    radio: Arc<R>,
    state: Arc<RwLock<DeviceState>>,
    messenger: Arc<DirectMessenger<R>>,
    renderer: Renderer,
    out: SharedOutput,
    hidden: HashSet<PortKind>,
    active_channel: u32,
    config: ConsoleConfig,
    dm_tasks: JoinSet<()>,
}

impl<R: TextSender + DeviceAdmin + 'static> Console<R> {
    pub fn new(
        radio: Arc<R>,
        state: Arc<RwLock<DeviceState>>,
        correlator: Arc<AckCorrelator>,
        config: ConsoleConfig,
        out: SharedOutput,
    ) -> Self {
        let messenger = Arc::new(DirectMessenger::new(
            radio.clone(),
            correlator,
            config.ack_timeout(),
        ));
        let mut hidden = HashSet::new();
        for label in &config.hidden_ports {
            match PortKind::parse_label(label) {
                Some(port) => {
                    hidden.insert(port);
                }
                None => warn!("Ignoring unknown packet type '{}' in hidden_ports", label),
            }
        }
        Self {
            radio,
            state,
            messenger,
            renderer: Renderer::new(config.color),
            out,
            hidden,
            active_channel: config.default_channel,
            config,
            dm_tasks: JoinSet::new(),
        }
    }

    pub fn active_channel(&self) -> u32 {
        self.active_channel
    }

    pub fn hidden_ports(&self) -> &HashSet<PortKind> {
        &self.hidden
    }

    pub fn messenger(&self) -> &Arc<DirectMessenger<R>> {
        &self.messenger
    }

    fn state(&self) -> RwLockReadGuard<'_, DeviceState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn print(&self, text: &str) {
        emit(&self.out, text);
    }

    /// Render an inbound event unless its packet type is filtered out.
    pub fn show_event(&self, event: &MeshEvent) {
        if self.hidden.contains(&event.port) {
            trace!("Hidden {} packet from {}", event.port.label(), event.source_id);
            return;
        }
        let text = self.renderer.packet(event, &self.state());
        self.print(&text);
    }

    /// Print the nodes heard within the online threshold.
    pub fn online_report(&self) {
        let text = {
            let state = self.state();
            let nodes = state
                .nodes
                .online(self.config.online_threshold(), Utc::now());
            let title = format!(
                " Online Nodes (last {} min) ",
                self.config.online_threshold_secs / 60
            );
            self.renderer
                .node_list(&title, &nodes, state.my_node_num, "No nodes heard recently.")
        };
        self.print(&text);
    }

    /// Execute one operator line. Errors are printed, never returned.
    pub fn handle_line(&mut self, line: &str) -> Flow {
        let Some(cmd) = commands::parse(line) else {
            return Flow::Continue;
        };
        match self.execute(cmd) {
            Ok(flow) => flow,
            Err(e) => {
                debug!("Command '{}' failed: {}", escape_log(line), e);
                let text = self.renderer.error(&format!("Error: {}", e));
                self.print(&text);
                Flow::Continue
            }
        }
    }

    fn require_own_node(&self) -> Result<(), ConsoleError> {
        if self.state().my_node_num.is_none() {
            return Err(ConsoleError::NotReady(
                "own node information has not been received from the radio".into(),
            ));
        }
        Ok(())
    }

    fn resolve_target(&self, target: &str) -> Result<String, ConsoleError> {
        let state = self.state();
        match state.nodes.resolve(target) {
            Resolution::Found(id) => {
                if let Some(node) = state.nodes.get_by_id(&id) {
                    debug!("Resolved '{}' to {} ({})", escape_log(target), id, node.display_name());
                }
                Ok(id)
            }
            Resolution::Unknown => Err(ConsoleError::UnknownNode(target.to_string())),
            Resolution::Ambiguous(ids) => Err(ConsoleError::AmbiguousNode {
                name: target.to_string(),
                ids,
            }),
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<Flow, ConsoleError> {
        match cmd {
            Command::Exit => return Ok(Flow::Exit),
            Command::Invalid(usage) => return Err(ConsoleError::InvalidArgument(usage)),
            Command::Broadcast(text) => {
                validate_message_text(&text)?;
                let id = self.messenger.broadcast(&text, self.active_channel)?;
                debug!("Broadcast id={} on channel {}", id, self.active_channel);
            }
            Command::Direct { target, text } => {
                validate_message_text(&text)?;
                let destination = self.resolve_target(&target)?;
                self.spawn_direct(target, destination, text);
            }
            Command::Nodes(scope) => {
                if scope == NodeScope::Online {
                    self.online_report();
                } else {
                    let text = {
                        let state = self.state();
                        let nodes = state.nodes.sorted_by_last_heard();
                        self.renderer.node_list(
                            " All Known Nodes ",
                            &nodes,
                            state.my_node_num,
                            "No nodes in the node database yet.",
                        )
                    };
                    self.print(&text);
                }
            }
            Command::NodeDetail(target) => {
                let id = self.resolve_target(&target)?;
                let text = {
                    let state = self.state();
                    let node = state
                        .nodes
                        .get_by_id(&id)
                        .ok_or_else(|| ConsoleError::UnknownNode(target.clone()))?;
                    self.renderer.node_detail(node, state.my_node_num)
                };
                self.print(&text);
            }
            Command::Info => {
                let text = self.renderer.device_info(&self.state());
                self.print(&text);
            }
            Command::ChannelList => {
                let text = self.renderer.channel_list(&self.state(), self.active_channel);
                self.print(&text);
            }
            Command::ChannelSet(key) => {
                let found = self
                    .state()
                    .find_channel(&key)
                    .map(|ch| (ch.index, ch.name.clone()));
                let (index, name) = found.ok_or_else(|| {
                    ConsoleError::InvalidArgument(format!(
                        "Channel '{}' not found or not enabled",
                        key
                    ))
                })?;
                self.active_channel = index;
                let label = if name.is_empty() { "(default)".to_string() } else { name };
                self.print(&self.renderer.notice(&format!(
                    "Broadcasts now go to channel [{}] {}",
                    index, label
                )));
            }
            Command::ChannelAdd(name) => {
                let name = validate_channel_name(&name)?;
                self.require_own_node()?;
                let index = self.radio.add_channel(&name)?;
                self.print(&self.renderer.notice(&format!(
                    "Channel '{}' added at index {}.",
                    name, index
                )));
            }
            Command::ChannelDelete(index) => {
                self.require_own_node()?;
                self.radio.delete_channel(index)?;
                // Later slots shifted down by one.
                if self.active_channel == index {
                    self.active_channel = 0;
                } else if self.active_channel > index {
                    self.active_channel -= 1;
                }
                self.print(&self.renderer.notice(&format!("Channel {} deleted.", index)));
            }
            Command::SetOwner {
                long_name,
                short_name,
            } => {
                let long_name = validate_long_name(&long_name)?;
                let short_name = match short_name {
                    Some(s) => validate_short_name(&s)?,
                    None => default_short_name(&long_name),
                };
                self.require_own_node()?;
                self.radio.set_owner(&long_name, &short_name)?;
                self.print(&self.renderer.notice(&format!(
                    "Owner set to '{}' ({}).",
                    long_name, short_name
                )));
            }
            Command::SetPosition { lat, lon } => {
                validate_coordinates(lat, lon)?;
                self.require_own_node()?;
                self.radio.set_fixed_position(lat, lon, None)?;
                self.print(&self.renderer.notice(&format!(
                    "Fixed position set to {:.5}, {:.5}.",
                    lat, lon
                )));
            }
            Command::Reboot => {
                self.require_own_node()?;
                self.radio.reboot(REBOOT_DELAY_SECS)?;
                self.print(&self.renderer.notice(&format!(
                    "Reboot requested; the device restarts in {} seconds.",
                    REBOOT_DELAY_SECS
                )));
            }
            Command::Filter(action) => {
                match action {
                    FilterAction::List => {}
                    FilterAction::Show(port) => {
                        self.hidden.remove(&port);
                    }
                    FilterAction::Hide(port) => {
                        self.hidden.insert(port);
                    }
                }
                self.print(&self.renderer.filter_list(&self.hidden));
            }
            Command::Stats => {
                self.print(&self.renderer.stats(&metrics::snapshot()));
            }
            Command::Help => {
                self.print(&self.renderer.help());
            }
        }
        Ok(Flow::Continue)
    }

    fn spawn_direct(&mut self, target: String, destination: String, text: String) {
        self.print(&self.renderer.notice(&format!(
            "Sending direct message to {} and waiting for acknowledgment...",
            target
        )));
        let messenger = self.messenger.clone();
        let renderer = self.renderer;
        let out = self.out.clone();
        self.dm_tasks.spawn(async move {
            let line = match messenger.send_and_wait(&destination, &text).await {
                Ok(outcome) => renderer.outcome(&target, &outcome),
                Err(e) => renderer.error(&format!("Error: {}", e)),
            };
            emit(&out, &line);
        });
    }

    /// Wait for every spawned direct message to finish.
    pub async fn drain_direct_messages(&mut self) {
        while let Some(res) = self.dm_tasks.join_next().await {
            if let Err(e) = res {
                warn!("Direct message task failed: {}", e);
            }
        }
    }

    /// Run until `exit`, end of input, ctrl-c or the display feed closing.
    /// Pending direct messages are released and awaited before returning.
    pub async fn run(
        mut self,
        mut display: mpsc::UnboundedReceiver<MeshEvent>,
        mut input: mpsc::UnboundedReceiver<String>,
    ) {
        let mut report = self.config.online_report_interval().map(|every| {
            let mut iv = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            iv.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            iv
        });

        self.print(&self.renderer.help());
        self.print(&self.renderer.prompt());
        loop {
            tokio::select! {
                event = display.recv() => {
                    match event {
                        Some(event) => self.show_event(&event),
                        None => {
                            warn!("Radio link closed");
                            self.print(&self.renderer.error("Connection to the radio was lost."));
                            break;
                        }
                    }
                }
                line = input.recv() => {
                    match line {
                        Some(line) => {
                            if self.handle_line(&line) == Flow::Exit {
                                break;
                            }
                            self.print(&self.renderer.prompt());
                        }
                        None => {
                            debug!("Input closed");
                            break;
                        }
                    }
                }
                _ = async {
                    match report.as_mut() {
                        Some(iv) => { iv.tick().await; }
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    self.online_report();
                }
                Some(res) = self.dm_tasks.join_next() => {
                    if let Err(e) = res {
                        warn!("Direct message task failed: {}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.messenger.correlator().close();
        self.drain_direct_messages().await;
        self.print(&self.renderer.notice("Exiting."));
    }
}
