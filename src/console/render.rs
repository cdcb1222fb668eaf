//! Text rendering for the console: packet boxes, node lists, device info,
//! delivery outcomes. Colour goes through crossterm and can be switched off.
use chrono::{DateTime, Local, Utc};
use crossterm::style::Stylize;
use std::collections::HashSet;
use std::fmt::Write;

use super::sender::DeliveryOutcome;
use crate::logutil::{hex_snippet, sanitize_display};
use crate::meshtastic::nodes::hw_model_name;
use crate::meshtastic::{DeviceState, EventPayload, MeshEvent, NodeRecord, PortKind};
use crate::metrics::Snapshot;

#[derive(Debug, Clone, Copy)]
enum Tone {
    Title,
    Label,
    Name,
    Short,
    Message,
    Good,
    Warn,
    Bad,
    Dim,
    Strong,
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

const RULE: &str = "--------------------------------------------------";

fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, tone: Tone, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        let styled = match tone {
            Tone::Title => text.blue().bold(),
            Tone::Label => text.cyan(),
            Tone::Name => text.magenta(),
            Tone::Short => text.yellow(),
            Tone::Message => text.green(),
            Tone::Good => text.green(),
            Tone::Warn => text.yellow(),
            Tone::Bad => text.red(),
            Tone::Dim => text.dim(),
            Tone::Strong => text.bold(),
        };
        styled.to_string()
    }

    fn banner(&self, title: &str) -> String {
        let width = title.chars().count();
        let bar = "═".repeat(width);
        format!(
            "{}\n{}\n{}\n",
            self.paint(Tone::Title, &format!("╔{}╗", bar)),
            self.paint(Tone::Title, &format!("║{}║", title)),
            self.paint(Tone::Title, &format!("╚{}╝", bar)),
        )
    }

    fn field(&self, out: &mut String, label: &str, value: &str, width: usize) {
        let _ = writeln!(
            out,
            "  {}{}",
            self.paint(Tone::Label, &format!("{:<width$}", label, width = width)),
            value
        );
    }

    /// Names come from remote nodes and are scrubbed before styling.
    fn names(&self, long: &str, short: &str) -> Option<String> {
        let long = sanitize_display(long);
        let short = sanitize_display(short);
        match (long.is_empty(), short.is_empty()) {
            (false, false) => Some(format!(
                "{} [{}]",
                self.paint(Tone::Name, &long),
                self.paint(Tone::Short, &short)
            )),
            (false, true) => Some(self.paint(Tone::Name, &long)),
            (true, false) => Some(self.paint(Tone::Short, &short)),
            (true, true) => None,
        }
    }

    pub fn prompt(&self) -> String {
        self.paint(Tone::Strong, "> ")
    }

    pub fn error(&self, message: &str) -> String {
        format!("{}\n", self.paint(Tone::Bad, message))
    }

    pub fn notice(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    /// Box for one inbound packet.
    pub fn packet(&self, event: &MeshEvent, state: &DeviceState) -> String {
        let direct = state.my_id().as_deref() == Some(event.destination_id.as_str());
        let title = format!(
            "    {}New Packet Received    ",
            if direct { "[DIRECT] " } else { "" }
        );
        let mut out = String::from("\n");
        out.push_str(&self.banner(&title));

        let from = match state.nodes.get_by_id(&event.source_id) {
            Some(node) => match self.names(&node.long_name, &node.short_name) {
                Some(names) => format!("{} ({})", names, event.source_id),
                None => event.source_id.clone(),
            },
            None => event.source_id.clone(),
        };
        self.field(&mut out, "From:", &from, 12);
        self.field(&mut out, "Type:", &event.port.label(), 12);
        if event.channel != 0 {
            self.field(&mut out, "Channel:", &event.channel.to_string(), 12);
        }

        match &event.payload {
            EventPayload::Text(text) => {
                let text = sanitize_display(text);
                let quoted = self.paint(Tone::Message, &format!("\"{}\"", text));
                self.field(&mut out, "Message:", &quoted, 12);
            }
            EventPayload::Position { lat, lon, alt } => {
                let fmt = |v: &Option<f64>| {
                    v.map(|x| format!("{:.5}", x))
                        .unwrap_or_else(|| "N/A".to_string())
                };
                let mut pos = format!("Lat={}, Lon={}", fmt(lat), fmt(lon));
                if let Some(a) = alt {
                    let _ = write!(pos, ", Alt={}m", a);
                }
                self.field(&mut out, "Position:", &pos, 12);
            }
            EventPayload::NodeInfo { long_name, short_name } => {
                let user = self
                    .names(long_name, short_name)
                    .unwrap_or_else(|| "N/A".to_string());
                self.field(&mut out, "User:", &user, 12);
            }
            EventPayload::Telemetry(summary) => {
                self.field(&mut out, "Telemetry:", &sanitize_display(summary), 12)
            }
            EventPayload::Routing { error_reason } => self.field(
                &mut out,
                "Routing:",
                error_reason.as_deref().unwrap_or("route discovery"),
                12,
            ),
            EventPayload::Admin => self.field(&mut out, "Data:", "admin message", 12),
            EventPayload::Raw(bytes) => {
                let mut data = format!("{} bytes", bytes.len());
                if !bytes.is_empty() {
                    let _ = write!(data, " ({})", hex_snippet(bytes, 24));
                }
                self.field(&mut out, "Data:", &data, 12);
            }
        }

        let snr = event
            .rx_snr
            .map(|s| format!("{} dB", s))
            .unwrap_or_else(|| "N/A".to_string());
        self.field(&mut out, "SNR:", &snr, 12);
        let _ = writeln!(out, "{}", self.paint(Tone::Dim, "-----------------------------------"));
        out
    }

    fn node_entry(&self, out: &mut String, node: &NodeRecord, my_num: Option<u32>) {
        let Some(names) = self.names(&node.long_name, &node.short_name) else {
            return;
        };
        let me = if my_num == Some(node.num) {
            format!(" {}", self.paint(Tone::Label, "(Me)"))
        } else {
            String::new()
        };
        let _ = writeln!(out, "\n{}", self.paint(Tone::Strong, &format!("» {}{}", names, me)));
        self.field(out, "ID:", &node.id, 12);
        if let Some(t) = node.last_heard {
            self.field(out, "Last Heard:", &local_time(t), 12);
        }
        if let Some(snr) = node.snr {
            self.field(out, "SNR:", &format!("{:.2} dB", snr), 12);
        }
        if let Some(hops) = node.hops_away {
            self.field(out, "Hops:", &hops.to_string(), 12);
        }
    }

    /// Node list under a banner. Nodes whose user info has not arrived are
    /// left out; `empty` is shown when nothing remains.
    pub fn node_list(
        &self,
        title: &str,
        nodes: &[&NodeRecord],
        my_num: Option<u32>,
        empty: &str,
    ) -> String {
        let mut out = String::from("\n");
        out.push_str(&self.banner(title));
        let named: Vec<&NodeRecord> = nodes.iter().copied().filter(|n| n.has_user()).collect();
        if named.is_empty() {
            let _ = writeln!(out, "{}", empty);
        }
        for node in named {
            self.node_entry(&mut out, node, my_num);
        }
        let _ = writeln!(out, "{}\n", self.paint(Tone::Dim, RULE));
        out
    }

    /// Everything known about one node.
    pub fn node_detail(&self, node: &NodeRecord, my_num: Option<u32>) -> String {
        let mut out = String::from("\n");
        out.push_str(&self.banner(" Node Information "));
        let or_na = |s: &str| {
            if s.is_empty() {
                "N/A".to_string()
            } else {
                sanitize_display(s)
            }
        };
        let long = or_na(&node.long_name);
        let mut long = self.paint(Tone::Strong, &long);
        if my_num == Some(node.num) {
            let _ = write!(long, " {}", self.paint(Tone::Label, "(Me)"));
        }
        self.field(&mut out, "Long Name:", &long, 13);
        self.field(&mut out, "Short Name:", &or_na(&node.short_name), 13);
        self.field(&mut out, "Node ID:", &node.id, 13);
        let hw = if node.hw_model != 0 {
            hw_model_name(node.hw_model)
        } else {
            "N/A".to_string()
        };
        self.field(&mut out, "Hardware:", &hw, 13);
        match node.position {
            Some(pos) => {
                self.field(&mut out, "Latitude:", &format!("{:.5}", pos.lat), 13);
                self.field(&mut out, "Longitude:", &format!("{:.5}", pos.lon), 13);
                if let Some(alt) = pos.alt {
                    self.field(&mut out, "Altitude:", &format!("{}m", alt), 13);
                }
            }
            None => {
                self.field(&mut out, "Latitude:", "N/A", 13);
                self.field(&mut out, "Longitude:", "N/A", 13);
            }
        }
        let battery = match node.device_metrics.and_then(|dm| dm.battery_level) {
            Some(b) if b <= 100 => format!("{}%", b),
            Some(_) => "Powered".to_string(),
            None => "Unknown".to_string(),
        };
        self.field(&mut out, "Battery:", &battery, 13);
        let snr = node
            .snr
            .map(|s| format!("{:.2} dB", s))
            .unwrap_or_else(|| "N/A".to_string());
        self.field(&mut out, "Last SNR:", &snr, 13);
        if let Some(t) = node.last_heard {
            self.field(&mut out, "Last Heard:", &local_time(t), 13);
        }
        if let Some(hops) = node.hops_away {
            self.field(&mut out, "Hops:", &hops.to_string(), 13);
        }
        let _ = writeln!(out, "{}\n", self.paint(Tone::Dim, RULE));
        out
    }

    pub fn device_info(&self, state: &DeviceState) -> String {
        let mut out = String::from("\n");
        out.push_str(&self.banner(" Device Information "));
        let Some(num) = state.my_node_num else {
            out.push_str(&self.error("Could not retrieve device info."));
            return out;
        };
        let me = state.my_node();
        let owner = me
            .and_then(|n| self.names(&n.long_name, &n.short_name))
            .unwrap_or_else(|| "N/A".to_string());
        self.field(&mut out, "Owner:", &owner, 15);
        self.field(&mut out, "Node ID:", &format!("!{:08x}", num), 15);
        let hw = me
            .map(|n| n.hw_model)
            .filter(|m| *m != 0)
            .or(state.metadata.as_ref().map(|m| m.hw_model));
        if let Some(hw) = hw {
            self.field(&mut out, "Model:", &hw_model_name(hw), 15);
        }
        if let Some(md) = &state.metadata {
            self.field(&mut out, "Firmware:", &sanitize_display(&md.firmware_version), 15);
        }
        if let Some(pos) = me.and_then(|n| n.position) {
            self.field(
                &mut out,
                "Position:",
                &format!("Lat={:.5}, Lon={:.5}", pos.lat, pos.lon),
                15,
            );
        }
        if let Some(dm) = me.and_then(|n| n.device_metrics) {
            let battery = match dm.battery_level {
                Some(b) if b <= 100 => format!("{}%", b),
                Some(_) => "Powered".to_string(),
                None => "Unknown".to_string(),
            };
            let volts = dm.voltage.map(|v| format!(" ({:.2}V)", v)).unwrap_or_default();
            self.field(&mut out, "Battery:", &format!("{}{}", battery, volts), 15);
            if let Some(util) = dm.channel_utilization {
                self.field(&mut out, "Channel Util:", &format!("{:.1}%", util), 15);
            }
        }
        self.field(&mut out, "Known Nodes:", &state.nodes.len().to_string(), 15);
        let _ = writeln!(out, "{}\n", self.paint(Tone::Dim, "-----------------------------"));
        out
    }

    pub fn channel_list(&self, state: &DeviceState, active: u32) -> String {
        let mut out = String::from("\n");
        out.push_str(&self.banner(" Device Channels "));
        let enabled: Vec<_> = state.channels.iter().filter(|c| c.is_enabled()).collect();
        if enabled.is_empty() {
            let _ = writeln!(out, "No channels found.");
        }
        for ch in enabled {
            let name = if ch.name.is_empty() {
                "(default)".to_string()
            } else {
                sanitize_display(&ch.name)
            };
            let mut line = format!("  [{}] {} ({})", ch.index, name, ch.role.label());
            if ch.index == active {
                line.push_str(&format!(" {}", self.paint(Tone::Good, "<- active")));
            }
            let _ = writeln!(out, "{}", line);
        }
        out
    }

    pub fn outcome(&self, target: &str, outcome: &DeliveryOutcome) -> String {
        let line = match outcome {
            DeliveryOutcome::Delivered => self.paint(
                Tone::Good,
                &format!("Message delivered successfully to {}!", target),
            ),
            DeliveryOutcome::Unconfirmed => self.paint(
                Tone::Warn,
                "Message sent, but no acknowledgment was received (timeout).",
            ),
            DeliveryOutcome::Failed { reason } => self.paint(
                Tone::Bad,
                &format!("Message failed to deliver to {}. Reason: {}", target, reason),
            ),
        };
        format!("{}\n", line)
    }

    pub fn filter_list(&self, hidden: &HashSet<PortKind>) -> String {
        if hidden.is_empty() {
            return "All packet types are shown.\n".to_string();
        }
        let mut labels: Vec<String> = hidden.iter().map(|p| p.label()).collect();
        labels.sort();
        format!("Hidden packet types: {}\n", labels.join(", "))
    }

    pub fn stats(&self, s: &Snapshot) -> String {
        let mut out = String::from("\n");
        out.push_str(&self.banner(" Session Statistics "));
        self.field(&mut out, "Received:", &s.packets_received.to_string(), 15);
        self.field(&mut out, "Broadcasts:", &s.broadcasts_sent.to_string(), 15);
        self.field(&mut out, "Direct sent:", &s.direct_sent.to_string(), 15);
        self.field(&mut out, "Delivered:", &s.direct_delivered.to_string(), 15);
        self.field(&mut out, "Unconfirmed:", &s.direct_unconfirmed.to_string(), 15);
        self.field(&mut out, "Failed:", &s.direct_failed.to_string(), 15);
        self.field(&mut out, "Send errors:", &s.send_errors.to_string(), 15);
        if let Some(avg) = s.ack_latency_avg_ms {
            self.field(&mut out, "Avg ack:", &format!("{} ms", avg), 15);
        }
        if s.frames_undecodable > 0 {
            self.field(&mut out, "Bad frames:", &s.frames_undecodable.to_string(), 15);
        }
        out
    }

    pub fn help(&self) -> String {
        let rows = [
            ("Broadcast:", "<message> (no ack)"),
            ("Direct Message:", "dm <name> <msg> (waits for ack)"),
            ("Node Lists:", "'nodes all' or 'nodes online'"),
            ("Node Details:", "node <name_or_id>"),
            ("Device Info:", "'info'"),
            ("Channels:", "'channel list|set <name_or_idx>|add|del'"),
            ("Set Owner:", "config set owner <long> [short]"),
            ("Set Position:", "config set pos <lat> <lon>"),
            ("Reboot Device:", "config reboot"),
            ("Packet Filter:", "'filter' or 'filter show|hide <TYPE>'"),
            ("Statistics:", "'stats'"),
            ("Exit:", "'exit' or Ctrl+C"),
        ];
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.paint(Tone::Title, &format!("╔{}╗", "═".repeat(70))));
        let _ = writeln!(
            out,
            "{}",
            self.paint(Tone::Title, &format!("║ {:^68} ║", "Commands"))
        );
        let _ = writeln!(out, "{}", self.paint(Tone::Title, &format!("╠{}╣", "═".repeat(70))));
        for (cmd, desc) in rows {
            let _ = writeln!(
                out,
                "{} {} {:<52}{}",
                self.paint(Tone::Title, "║"),
                self.paint(Tone::Label, &format!("{:<15}", cmd)),
                desc,
                self.paint(Tone::Title, " ║")
            );
        }
        let _ = writeln!(out, "{}", self.paint(Tone::Title, &format!("╚{}╝", "═".repeat(70))));
        out
    }
}
