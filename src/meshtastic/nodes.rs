//! Node database and device state as reported by the radio.
//!
//! The reader task is the only writer; the console reads through the shared
//! `Arc<RwLock<DeviceState>>` handed out at connect time.
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

use super::event::{node_id_string, snr_reading};
use crate::protobuf::meshtastic as proto;
use crate::validation::parse_node_id;

/// Channel slots exposed by the firmware.
pub const CHANNEL_SLOTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub alt: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeMetrics {
    pub battery_level: Option<u32>,
    pub voltage: Option<f32>,
    pub channel_utilization: Option<f32>,
    pub air_util_tx: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub num: u32,
    pub id: String,
    pub long_name: String,
    pub short_name: String,
    pub hw_model: i32,
    pub last_heard: Option<DateTime<Utc>>,
    pub snr: Option<f32>,
    pub position: Option<GeoPoint>,
    pub device_metrics: Option<NodeMetrics>,
    pub hops_away: Option<u32>,
}

impl NodeRecord {
    pub fn new(num: u32) -> Self {
        Self {
            num,
            id: node_id_string(num),
            long_name: String::new(),
            short_name: String::new(),
            hw_model: 0,
            last_heard: None,
            snr: None,
            position: None,
            device_metrics: None,
            hops_away: None,
        }
    }

    /// Long name, falling back to the short name and then the node id.
    pub fn display_name(&self) -> &str {
        if !self.long_name.is_empty() {
            &self.long_name
        } else if !self.short_name.is_empty() {
            &self.short_name
        } else {
            &self.id
        }
    }

    /// Whether a user record (long or short name) has been seen.
    pub fn has_user(&self) -> bool {
        !self.long_name.is_empty() || !self.short_name.is_empty()
    }

    pub fn heard_within(&self, window: Duration, now: DateTime<Utc>) -> bool {
        let window = ChronoDuration::from_std(window).unwrap_or_else(|_| ChronoDuration::days(36500));
        match self.last_heard {
            Some(t) => now.signed_duration_since(t) <= window,
            None => false,
        }
    }

    fn apply_user(&mut self, user: &proto::User) {
        if !user.long_name.trim().is_empty() {
            self.long_name = user.long_name.trim().to_string();
        }
        if !user.short_name.trim().is_empty() {
            self.short_name = user.short_name.trim().to_string();
        }
        if user.hw_model != 0 {
            self.hw_model = user.hw_model;
        }
    }
}

/// Outcome of looking a node up by id or name.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(String),
    Unknown,
    /// Several nodes share the name; carries their ids.
    Ambiguous(Vec<String>),
}

/// Known nodes keyed by node number.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: BTreeMap<u32, NodeRecord>,
}

fn timestamp(secs: u32) -> Option<DateTime<Utc>> {
    if secs == 0 {
        None
    } else {
        Utc.timestamp_opt(secs as i64, 0).single()
    }
}

fn geo_point(pos: &proto::Position) -> Option<GeoPoint> {
    match (pos.latitude_i, pos.longitude_i) {
        (Some(lat), Some(lon)) if lat != 0 || lon != 0 => Some(GeoPoint {
            lat: lat as f64 * 1e-7,
            lon: lon as f64 * 1e-7,
            alt: pos.altitude,
        }),
        _ => None,
    }
}

fn metrics(dm: &proto::DeviceMetrics) -> NodeMetrics {
    NodeMetrics {
        battery_level: dm.battery_level,
        voltage: dm.voltage,
        channel_utilization: dm.channel_utilization,
        air_util_tx: dm.air_util_tx,
    }
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, num: u32) -> Option<&NodeRecord> {
        self.nodes.get(&num)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&NodeRecord> {
        parse_node_id(id).ok().and_then(|num| self.nodes.get(&num))
    }

    pub fn entry(&mut self, num: u32) -> &mut NodeRecord {
        self.nodes.entry(num).or_insert_with(|| NodeRecord::new(num))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Merge a `NodeInfo` from the radio's node database.
    pub fn upsert_node_info(&mut self, info: &proto::NodeInfo) {
        let rec = self.entry(info.num);
        if let Some(user) = &info.user {
            rec.apply_user(user);
        }
        if let Some(pos) = info.position.as_ref().and_then(geo_point) {
            rec.position = Some(pos);
        }
        if let Some(heard) = timestamp(info.last_heard) {
            rec.last_heard = Some(heard);
        }
        if let Some(snr) = snr_reading(info.snr) {
            rec.snr = Some(snr);
        }
        if let Some(dm) = &info.device_metrics {
            rec.device_metrics = Some(metrics(dm));
        }
        if info.hops_away.is_some() {
            rec.hops_away = info.hops_away;
        }
    }

    /// Record that a packet from `num` was heard.
    pub fn touch(&mut self, num: u32, heard: DateTime<Utc>, snr: Option<f32>) {
        let rec = self.entry(num);
        rec.last_heard = Some(heard);
        if snr.is_some() {
            rec.snr = snr;
        }
    }

    pub fn update_user(&mut self, num: u32, user: &proto::User) {
        self.entry(num).apply_user(user);
    }

    pub fn update_position(&mut self, num: u32, pos: &proto::Position) {
        if let Some(p) = geo_point(pos) {
            self.entry(num).position = Some(p);
        }
    }

    pub fn update_metrics(&mut self, num: u32, dm: &proto::DeviceMetrics) {
        self.entry(num).device_metrics = Some(metrics(dm));
    }

    /// All nodes, most recently heard first; never-heard nodes last.
    pub fn sorted_by_last_heard(&self) -> Vec<&NodeRecord> {
        let mut out: Vec<&NodeRecord> = self.nodes.values().collect();
        out.sort_by(|a, b| b.last_heard.cmp(&a.last_heard).then(a.num.cmp(&b.num)));
        out
    }

    /// Nodes heard within `window` of `now`, most recent first.
    pub fn online(&self, window: Duration, now: DateTime<Utc>) -> Vec<&NodeRecord> {
        self.sorted_by_last_heard()
            .into_iter()
            .filter(|n| n.heard_within(window, now))
            .collect()
    }

    /// Resolve a `!xxxxxxxx` id or a case-insensitive long/short name.
    ///
    /// Well-formed ids resolve even for nodes not in the table; names must match
    /// exactly one node.
    pub fn resolve(&self, target: &str) -> Resolution {
        let target = target.trim();
        if target.starts_with('!') {
            return match parse_node_id(target) {
                Ok(num) => Resolution::Found(node_id_string(num)),
                Err(_) => Resolution::Unknown,
            };
        }
        let wanted = target.to_lowercase();
        let matches: Vec<&NodeRecord> = self
            .nodes
            .values()
            .filter(|n| {
                n.long_name.to_lowercase() == wanted || n.short_name.to_lowercase() == wanted
            })
            .collect();
        match matches.len() {
            0 => Resolution::Unknown,
            1 => Resolution::Found(matches[0].id.clone()),
            _ => Resolution::Ambiguous(matches.iter().map(|n| n.id.clone()).collect()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Disabled,
    Primary,
    Secondary,
}

impl From<i32> for ChannelRole {
    fn from(value: i32) -> Self {
        match proto::channel::Role::try_from(value) {
            Ok(proto::channel::Role::Primary) => ChannelRole::Primary,
            Ok(proto::channel::Role::Secondary) => ChannelRole::Secondary,
            _ => ChannelRole::Disabled,
        }
    }
}

impl ChannelRole {
    pub fn as_proto(&self) -> proto::channel::Role {
        match self {
            ChannelRole::Disabled => proto::channel::Role::Disabled,
            ChannelRole::Primary => proto::channel::Role::Primary,
            ChannelRole::Secondary => proto::channel::Role::Secondary,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChannelRole::Disabled => "DISABLED",
            ChannelRole::Primary => "PRIMARY",
            ChannelRole::Secondary => "SECONDARY",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    pub index: u32,
    pub name: String,
    pub role: ChannelRole,
    pub psk: Vec<u8>,
}

impl ChannelRecord {
    pub fn disabled(index: u32) -> Self {
        Self {
            index,
            name: String::new(),
            role: ChannelRole::Disabled,
            psk: Vec::new(),
        }
    }

    pub fn from_proto(ch: &proto::Channel) -> Self {
        let settings = ch.settings.clone().unwrap_or_default();
        Self {
            index: ch.index.max(0) as u32,
            name: settings.name,
            role: ChannelRole::from(ch.role),
            psk: settings.psk,
        }
    }

    pub fn to_proto(&self) -> proto::Channel {
        proto::Channel {
            index: self.index as i32,
            settings: Some(proto::ChannelSettings {
                psk: self.psk.clone(),
                name: self.name.clone(),
                ..Default::default()
            }),
            role: self.role.as_proto() as i32,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.role != ChannelRole::Disabled
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceMetadata {
    pub firmware_version: String,
    pub hw_model: i32,
    pub role: i32,
    pub has_wifi: bool,
    pub has_bluetooth: bool,
}

/// Everything the radio told us about itself and the mesh.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub my_node_num: Option<u32>,
    pub reboot_count: u32,
    pub nodes: NodeTable,
    pub channels: Vec<ChannelRecord>,
    pub metadata: Option<DeviceMetadata>,
    pub config_complete: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            my_node_num: None,
            reboot_count: 0,
            nodes: NodeTable::new(),
            channels: (0..CHANNEL_SLOTS as u32).map(ChannelRecord::disabled).collect(),
            metadata: None,
            config_complete: false,
        }
    }
}

impl DeviceState {
    pub fn my_id(&self) -> Option<String> {
        self.my_node_num.map(node_id_string)
    }

    pub fn my_node(&self) -> Option<&NodeRecord> {
        self.my_node_num.and_then(|n| self.nodes.get(n))
    }

    /// Store a channel slot report; out-of-range indexes are ignored.
    pub fn set_channel(&mut self, record: ChannelRecord) -> bool {
        match self.channels.get_mut(record.index as usize) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    pub fn channel(&self, index: u32) -> Option<&ChannelRecord> {
        self.channels.get(index as usize)
    }

    /// Resolve a channel by index or case-insensitive name; disabled slots never match.
    pub fn find_channel(&self, key: &str) -> Option<&ChannelRecord> {
        let key = key.trim();
        if let Ok(idx) = key.parse::<u32>() {
            return self.channel(idx).filter(|c| c.is_enabled());
        }
        self.channels
            .iter()
            .filter(|c| c.is_enabled())
            .find(|c| c.name.eq_ignore_ascii_case(key))
    }
}

/// Name of a `HardwareModel` value for the models commonly seen on the mesh.
pub fn hw_model_name(model: i32) -> String {
    let name = match model {
        0 => "UNSET",
        1 => "TLORA_V2",
        2 => "TLORA_V1",
        3 => "TLORA_V2_1_1P6",
        4 => "TBEAM",
        5 => "HELTEC_V2_0",
        6 => "TBEAM_V0P7",
        7 => "T_ECHO",
        8 => "TLORA_V1_1P3",
        9 => "RAK4631",
        10 => "HELTEC_V2_1",
        11 => "HELTEC_V1",
        12 => "LILYGO_TBEAM_S3_CORE",
        13 => "RAK11200",
        14 => "NANO_G1",
        25 => "STATION_G1",
        26 => "RAK11310",
        31 => "STATION_G2",
        39 => "DIY_V1",
        43 => "HELTEC_V3",
        44 => "HELTEC_WSL_V3",
        47 => "RPI_PICO",
        48 => "HELTEC_WIRELESS_TRACKER",
        49 => "HELTEC_WIRELESS_PAPER",
        50 => "T_DECK",
        51 => "T_WATCH_S3",
        52 => "PICOMPUTER_S3",
        53 => "HELTEC_HT62",
        64 => "TRACKER_T1000_E",
        71 => "SEEED_XIAO_S3",
        255 => "PRIVATE_HW",
        _ => return format!("HW#{}", model),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(long: &str, short: &str) -> proto::User {
        proto::User {
            long_name: long.into(),
            short_name: short.into(),
            ..Default::default()
        }
    }

    #[test]
    fn resolve_by_id_and_name() {
        let mut t = NodeTable::new();
        t.update_user(0x10, &user("Base Camp", "BASE"));
        t.update_user(0x20, &user("Ridge", "RDG"));
        assert_eq!(t.resolve("!00000010"), Resolution::Found("!00000010".into()));
        assert_eq!(t.resolve("!0000abcd"), Resolution::Found("!0000abcd".into()));
        assert_eq!(t.resolve("base camp"), Resolution::Found("!00000010".into()));
        assert_eq!(t.resolve("rdg"), Resolution::Found("!00000020".into()));
        assert_eq!(t.resolve("nobody"), Resolution::Unknown);
        assert_eq!(t.resolve("!zz"), Resolution::Unknown);
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let mut t = NodeTable::new();
        t.update_user(1, &user("Rover", "RV1"));
        t.update_user(2, &user("rover", "RV2"));
        assert_eq!(
            t.resolve("ROVER"),
            Resolution::Ambiguous(vec!["!00000001".into(), "!00000002".into()])
        );
    }

    #[test]
    fn online_filters_and_sorts() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut t = NodeTable::new();
        t.touch(1, now - ChronoDuration::minutes(5), None);
        t.touch(2, now - ChronoDuration::minutes(45), None);
        t.touch(3, now - ChronoDuration::minutes(1), Some(6.5));
        t.entry(4);
        let online: Vec<u32> = t
            .online(Duration::from_secs(1800), now)
            .iter()
            .map(|n| n.num)
            .collect();
        assert_eq!(online, vec![3, 1]);
        let all: Vec<u32> = t.sorted_by_last_heard().iter().map(|n| n.num).collect();
        assert_eq!(all, vec![3, 1, 2, 4]);
    }

    #[test]
    fn channel_lookup_skips_disabled() {
        let mut s = DeviceState::default();
        s.set_channel(ChannelRecord {
            index: 0,
            name: String::new(),
            role: ChannelRole::Primary,
            psk: vec![1],
        });
        s.set_channel(ChannelRecord {
            index: 1,
            name: "Ops".into(),
            role: ChannelRole::Secondary,
            psk: vec![2; 32],
        });
        assert_eq!(s.find_channel("ops").map(|c| c.index), Some(1));
        assert_eq!(s.find_channel("0").map(|c| c.index), Some(0));
        assert!(s.find_channel("2").is_none());
        assert!(!s.set_channel(ChannelRecord::disabled(9)));
    }

    #[test]
    fn hw_model_fallback() {
        assert_eq!(hw_model_name(9), "RAK4631");
        assert_eq!(hw_model_name(999), "HW#999");
    }
}
