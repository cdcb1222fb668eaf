//! # Meshconsole - Operator Console for Meshtastic Devices
//!
//! Meshconsole drives a Meshtastic radio attached over USB/UART from a
//! terminal: it shows mesh traffic and the node database, sends broadcast and
//! direct text messages, and reports whether direct messages were delivered.
//!
//! ## Features
//!
//! - **Delivery confirmation**: direct messages request an acknowledgment and
//!   the console waits, bounded by a timeout, for the routing reply from the
//!   destination before reporting delivered, failed (with the mesh's reason)
//!   or unconfirmed.
//! - **Node database**: all known nodes or those heard recently, sorted by
//!   last contact, with a periodic online report.
//! - **Device configuration**: owner names, fixed position, channel
//!   add/delete/select, reboot.
//! - **Packet display filter**: hide packet types (routing chatter by default).
//! - **Async design**: Tokio tasks for the link reader, event pump and
//!   outstanding direct messages.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meshconsole::config::Config;
//! use meshconsole::meshtastic::Connection;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("meshconsole.toml").await?;
//!     let mut conn = Connection::connect_serial(&config.meshtastic).await?;
//!     if conn.wait_for_config(Duration::from_secs(10)).await {
//!         println!("{} nodes known", conn.state.read().unwrap().nodes.len());
//!     }
//!     conn.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`console`] - acknowledgment correlator, send-and-wait, commands, rendering
//! - [`meshtastic`] - serial link, stream framing, decoding, node and channel state
//! - [`protobuf`] - the Meshtastic wire messages the console uses
//! - [`config`] - TOML configuration
//! - [`validation`] - checks for names, coordinates, node ids and message text
//! - [`metrics`] - in-process counters shown by `stats`
//! - [`logutil`] - helpers for logging untrusted mesh text
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Console      │ ← commands, rendering, direct-message tasks
//! └─────────────────┘
//!     │         ▲
//!     │   ┌─────────────────┐
//!     │   │   Event pump    │ ← acknowledgment correlator sees every event first
//!     │   └─────────────────┘
//!     ▼         ▲
//! ┌─────────────────┐
//! │   Meshtastic    │ ← radio handle (out), reader (in)
//! │   link          │
//! └─────────────────┘
//! ```

pub mod config;
pub mod console;
pub mod logutil;
pub mod meshtastic;
pub mod metrics;
pub mod protobuf;
pub mod validation;
