//! Meshtastic wire schema
//!
//! The subset of the Meshtastic protobuf definitions (`mesh.proto`,
//! `portnums.proto`, `telemetry.proto`, `channel.proto`, `admin.proto`) that the
//! console reads or writes, declared directly with `prost` derives. Tag numbers
//! follow the upstream schema so frames interoperate with stock firmware; fields
//! the console never touches are left out and are skipped as unknown fields on
//! decode.

#![allow(clippy::derive_partial_eq_without_eq)]

pub mod meshtastic {
    /// Packet sent from the client to the radio.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ToRadio {
        #[prost(oneof = "to_radio::PayloadVariant", tags = "1, 3, 4, 7")]
        pub payload_variant: Option<to_radio::PayloadVariant>,
    }

    pub mod to_radio {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum PayloadVariant {
            #[prost(message, tag = "1")]
            Packet(super::MeshPacket),
            #[prost(uint32, tag = "3")]
            WantConfigId(u32),
            #[prost(bool, tag = "4")]
            Disconnect(bool),
            #[prost(message, tag = "7")]
            Heartbeat(super::Heartbeat),
        }
    }

    /// Keeps the serial API session alive.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Heartbeat {
        #[prost(uint32, tag = "1")]
        pub nonce: u32,
    }

    /// Packet sent from the radio to the client.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FromRadio {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(
            oneof = "from_radio::PayloadVariant",
            tags = "2, 3, 4, 6, 7, 8, 10, 11, 13"
        )]
        pub payload_variant: Option<from_radio::PayloadVariant>,
    }

    pub mod from_radio {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum PayloadVariant {
            #[prost(message, tag = "2")]
            Packet(super::MeshPacket),
            #[prost(message, tag = "3")]
            MyInfo(super::MyNodeInfo),
            #[prost(message, tag = "4")]
            NodeInfo(super::NodeInfo),
            #[prost(message, tag = "6")]
            LogRecord(super::LogRecord),
            #[prost(uint32, tag = "7")]
            ConfigCompleteId(u32),
            #[prost(bool, tag = "8")]
            Rebooted(bool),
            #[prost(message, tag = "10")]
            Channel(super::Channel),
            #[prost(message, tag = "11")]
            QueueStatus(super::QueueStatus),
            #[prost(message, tag = "13")]
            Metadata(super::DeviceMetadata),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct MeshPacket {
        #[prost(fixed32, tag = "1")]
        pub from: u32,
        #[prost(fixed32, tag = "2")]
        pub to: u32,
        #[prost(uint32, tag = "3")]
        pub channel: u32,
        #[prost(oneof = "mesh_packet::PayloadVariant", tags = "4, 5")]
        pub payload_variant: Option<mesh_packet::PayloadVariant>,
        #[prost(fixed32, tag = "6")]
        pub id: u32,
        #[prost(fixed32, tag = "7")]
        pub rx_time: u32,
        #[prost(float, tag = "8")]
        pub rx_snr: f32,
        #[prost(uint32, tag = "9")]
        pub hop_limit: u32,
        #[prost(bool, tag = "10")]
        pub want_ack: bool,
        #[prost(enumeration = "mesh_packet::Priority", tag = "11")]
        pub priority: i32,
        #[prost(int32, tag = "12")]
        pub rx_rssi: i32,
        #[prost(uint32, tag = "15")]
        pub hop_start: u32,
    }

    pub mod mesh_packet {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum PayloadVariant {
            #[prost(message, tag = "4")]
            Decoded(super::Data),
            #[prost(bytes, tag = "5")]
            Encrypted(Vec<u8>),
        }

        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Priority {
            Unset = 0,
            Min = 1,
            Background = 10,
            Default = 64,
            Reliable = 70,
            Response = 80,
            High = 100,
            Ack = 120,
            Max = 127,
        }
    }

    /// Decoded application payload of a mesh packet.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Data {
        #[prost(enumeration = "PortNum", tag = "1")]
        pub portnum: i32,
        #[prost(bytes = "vec", tag = "2")]
        pub payload: Vec<u8>,
        #[prost(bool, tag = "3")]
        pub want_response: bool,
        #[prost(fixed32, tag = "4")]
        pub dest: u32,
        #[prost(fixed32, tag = "5")]
        pub source: u32,
        #[prost(fixed32, tag = "6")]
        pub request_id: u32,
        #[prost(fixed32, tag = "7")]
        pub reply_id: u32,
        #[prost(fixed32, tag = "8")]
        pub emoji: u32,
        #[prost(uint32, optional, tag = "9")]
        pub bitfield: Option<u32>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum PortNum {
        UnknownApp = 0,
        TextMessageApp = 1,
        RemoteHardwareApp = 2,
        PositionApp = 3,
        NodeinfoApp = 4,
        RoutingApp = 5,
        AdminApp = 6,
        TextMessageCompressedApp = 7,
        WaypointApp = 8,
        AudioApp = 9,
        DetectionSensorApp = 10,
        ReplyApp = 32,
        IpTunnelApp = 33,
        PaxcounterApp = 34,
        SerialApp = 64,
        StoreForwardApp = 65,
        RangeTestApp = 66,
        TelemetryApp = 67,
        ZpsApp = 68,
        SimulatorApp = 69,
        TracerouteApp = 70,
        NeighborinfoApp = 71,
        AtakPlugin = 72,
        MapReportApp = 73,
        PrivateApp = 256,
        AtakForwarder = 257,
        Max = 511,
    }

    impl PortNum {
        /// Upstream enum value name, e.g. `TEXT_MESSAGE_APP`.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                PortNum::UnknownApp => "UNKNOWN_APP",
                PortNum::TextMessageApp => "TEXT_MESSAGE_APP",
                PortNum::RemoteHardwareApp => "REMOTE_HARDWARE_APP",
                PortNum::PositionApp => "POSITION_APP",
                PortNum::NodeinfoApp => "NODEINFO_APP",
                PortNum::RoutingApp => "ROUTING_APP",
                PortNum::AdminApp => "ADMIN_APP",
                PortNum::TextMessageCompressedApp => "TEXT_MESSAGE_COMPRESSED_APP",
                PortNum::WaypointApp => "WAYPOINT_APP",
                PortNum::AudioApp => "AUDIO_APP",
                PortNum::DetectionSensorApp => "DETECTION_SENSOR_APP",
                PortNum::ReplyApp => "REPLY_APP",
                PortNum::IpTunnelApp => "IP_TUNNEL_APP",
                PortNum::PaxcounterApp => "PAXCOUNTER_APP",
                PortNum::SerialApp => "SERIAL_APP",
                PortNum::StoreForwardApp => "STORE_FORWARD_APP",
                PortNum::RangeTestApp => "RANGE_TEST_APP",
                PortNum::TelemetryApp => "TELEMETRY_APP",
                PortNum::ZpsApp => "ZPS_APP",
                PortNum::SimulatorApp => "SIMULATOR_APP",
                PortNum::TracerouteApp => "TRACEROUTE_APP",
                PortNum::NeighborinfoApp => "NEIGHBORINFO_APP",
                PortNum::AtakPlugin => "ATAK_PLUGIN",
                PortNum::MapReportApp => "MAP_REPORT_APP",
                PortNum::PrivateApp => "PRIVATE_APP",
                PortNum::AtakForwarder => "ATAK_FORWARDER",
                PortNum::Max => "MAX",
            }
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Position {
        #[prost(sfixed32, optional, tag = "1")]
        pub latitude_i: Option<i32>,
        #[prost(sfixed32, optional, tag = "2")]
        pub longitude_i: Option<i32>,
        #[prost(int32, optional, tag = "3")]
        pub altitude: Option<i32>,
        #[prost(fixed32, tag = "4")]
        pub time: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct User {
        #[prost(string, tag = "1")]
        pub id: String,
        #[prost(string, tag = "2")]
        pub long_name: String,
        #[prost(string, tag = "3")]
        pub short_name: String,
        /// `HardwareModel` enum value; kept numeric.
        #[prost(int32, tag = "5")]
        pub hw_model: i32,
        #[prost(bool, tag = "6")]
        pub is_licensed: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NodeInfo {
        #[prost(uint32, tag = "1")]
        pub num: u32,
        #[prost(message, optional, tag = "2")]
        pub user: Option<User>,
        #[prost(message, optional, tag = "3")]
        pub position: Option<Position>,
        #[prost(float, tag = "4")]
        pub snr: f32,
        #[prost(fixed32, tag = "5")]
        pub last_heard: u32,
        #[prost(message, optional, tag = "6")]
        pub device_metrics: Option<DeviceMetrics>,
        #[prost(uint32, tag = "7")]
        pub channel: u32,
        #[prost(bool, tag = "8")]
        pub via_mqtt: bool,
        #[prost(uint32, optional, tag = "9")]
        pub hops_away: Option<u32>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct MyNodeInfo {
        #[prost(uint32, tag = "1")]
        pub my_node_num: u32,
        #[prost(uint32, tag = "8")]
        pub reboot_count: u32,
        #[prost(uint32, tag = "11")]
        pub min_app_version: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct DeviceMetadata {
        #[prost(string, tag = "1")]
        pub firmware_version: String,
        #[prost(uint32, tag = "2")]
        pub device_state_version: u32,
        #[prost(bool, tag = "3")]
        pub can_shutdown: bool,
        #[prost(bool, tag = "4")]
        pub has_wifi: bool,
        #[prost(bool, tag = "5")]
        pub has_bluetooth: bool,
        #[prost(bool, tag = "6")]
        pub has_ethernet: bool,
        #[prost(int32, tag = "7")]
        pub role: i32,
        #[prost(uint32, tag = "8")]
        pub position_flags: u32,
        #[prost(int32, tag = "9")]
        pub hw_model: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct LogRecord {
        #[prost(string, tag = "1")]
        pub message: String,
        #[prost(fixed32, tag = "2")]
        pub time: u32,
        #[prost(string, tag = "3")]
        pub source: String,
        #[prost(int32, tag = "4")]
        pub level: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct QueueStatus {
        #[prost(int32, tag = "1")]
        pub res: i32,
        #[prost(uint32, tag = "2")]
        pub free: u32,
        #[prost(uint32, tag = "3")]
        pub maxlen: u32,
        #[prost(uint32, tag = "4")]
        pub mesh_packet_id: u32,
    }

    /// Delivery/route control payload carried on `ROUTING_APP`.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Routing {
        #[prost(oneof = "routing::Variant", tags = "1, 2, 3")]
        pub variant: Option<routing::Variant>,
    }

    pub mod routing {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Variant {
            #[prost(message, tag = "1")]
            RouteRequest(super::RouteDiscovery),
            #[prost(message, tag = "2")]
            RouteReply(super::RouteDiscovery),
            #[prost(enumeration = "Error", tag = "3")]
            ErrorReason(i32),
        }

        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Error {
            None = 0,
            NoRoute = 1,
            GotNak = 2,
            Timeout = 3,
            NoInterface = 4,
            MaxRetransmit = 5,
            NoChannel = 6,
            TooLarge = 7,
            NoResponse = 8,
            DutyCycleLimit = 9,
            BadRequest = 32,
            NotAuthorized = 33,
            PkiFailed = 34,
            PkiUnknownPubkey = 35,
            AdminBadSessionKey = 36,
            AdminPublicKeyUnauthorized = 37,
        }

        impl Error {
            pub fn as_str_name(&self) -> &'static str {
                match self {
                    Error::None => "NONE",
                    Error::NoRoute => "NO_ROUTE",
                    Error::GotNak => "GOT_NAK",
                    Error::Timeout => "TIMEOUT",
                    Error::NoInterface => "NO_INTERFACE",
                    Error::MaxRetransmit => "MAX_RETRANSMIT",
                    Error::NoChannel => "NO_CHANNEL",
                    Error::TooLarge => "TOO_LARGE",
                    Error::NoResponse => "NO_RESPONSE",
                    Error::DutyCycleLimit => "DUTY_CYCLE_LIMIT",
                    Error::BadRequest => "BAD_REQUEST",
                    Error::NotAuthorized => "NOT_AUTHORIZED",
                    Error::PkiFailed => "PKI_FAILED",
                    Error::PkiUnknownPubkey => "PKI_UNKNOWN_PUBKEY",
                    Error::AdminBadSessionKey => "ADMIN_BAD_SESSION_KEY",
                    Error::AdminPublicKeyUnauthorized => "ADMIN_PUBLIC_KEY_UNAUTHORIZED",
                }
            }
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct RouteDiscovery {
        #[prost(fixed32, repeated, tag = "1")]
        pub route: Vec<u32>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Telemetry {
        #[prost(fixed32, tag = "1")]
        pub time: u32,
        #[prost(oneof = "telemetry::Variant", tags = "2, 3")]
        pub variant: Option<telemetry::Variant>,
    }

    pub mod telemetry {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Variant {
            #[prost(message, tag = "2")]
            DeviceMetrics(super::DeviceMetrics),
            #[prost(message, tag = "3")]
            EnvironmentMetrics(super::EnvironmentMetrics),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct DeviceMetrics {
        #[prost(uint32, optional, tag = "1")]
        pub battery_level: Option<u32>,
        #[prost(float, optional, tag = "2")]
        pub voltage: Option<f32>,
        #[prost(float, optional, tag = "3")]
        pub channel_utilization: Option<f32>,
        #[prost(float, optional, tag = "4")]
        pub air_util_tx: Option<f32>,
        #[prost(uint32, optional, tag = "5")]
        pub uptime_seconds: Option<u32>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct EnvironmentMetrics {
        #[prost(float, optional, tag = "1")]
        pub temperature: Option<f32>,
        #[prost(float, optional, tag = "2")]
        pub relative_humidity: Option<f32>,
        #[prost(float, optional, tag = "3")]
        pub barometric_pressure: Option<f32>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ChannelSettings {
        #[prost(uint32, tag = "1")]
        pub channel_num: u32,
        #[prost(bytes = "vec", tag = "2")]
        pub psk: Vec<u8>,
        #[prost(string, tag = "3")]
        pub name: String,
        #[prost(fixed32, tag = "4")]
        pub id: u32,
        #[prost(bool, tag = "5")]
        pub uplink_enabled: bool,
        #[prost(bool, tag = "6")]
        pub downlink_enabled: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Channel {
        #[prost(int32, tag = "1")]
        pub index: i32,
        #[prost(message, optional, tag = "2")]
        pub settings: Option<ChannelSettings>,
        #[prost(enumeration = "channel::Role", tag = "3")]
        pub role: i32,
    }

    pub mod channel {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Role {
            Disabled = 0,
            Primary = 1,
            Secondary = 2,
        }
    }

    /// Local/remote node administration request.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AdminMessage {
        #[prost(
            oneof = "admin_message::PayloadVariant",
            tags = "1, 3, 32, 33, 41, 42, 64, 65, 97"
        )]
        pub payload_variant: Option<admin_message::PayloadVariant>,
    }

    pub mod admin_message {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum PayloadVariant {
            #[prost(uint32, tag = "1")]
            GetChannelRequest(u32),
            #[prost(bool, tag = "3")]
            GetOwnerRequest(bool),
            #[prost(message, tag = "32")]
            SetOwner(super::User),
            #[prost(message, tag = "33")]
            SetChannel(super::Channel),
            #[prost(message, tag = "41")]
            SetFixedPosition(super::Position),
            #[prost(bool, tag = "42")]
            RemoveFixedPosition(bool),
            #[prost(bool, tag = "64")]
            BeginEditSettings(bool),
            #[prost(bool, tag = "65")]
            CommitEditSettings(bool),
            #[prost(int32, tag = "97")]
            RebootSeconds(i32),
        }
    }
}
