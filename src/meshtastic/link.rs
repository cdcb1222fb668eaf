//! Byte transport to the radio.
//!
//! The reader and writer own separate handles to the same device so a blocking
//! read never holds up an outbound frame. Reads happen on a dedicated thread
//! that forwards raw chunks to the async reader task.
use anyhow::Result;
use log::{debug, trace, warn};
use serde::Serialize;
use std::io::{ErrorKind, Read, Write};
use tokio::sync::mpsc;

#[cfg(feature = "serial")]
use anyhow::anyhow;
#[cfg(feature = "serial")]
use tokio::time::{sleep, Duration};

use crate::logutil::hex_snippet;

/// Read and write halves of an open link.
pub struct LinkHalves {
    pub reader: Box<dyn Read + Send>,
    pub writer: Box<dyn Write + Send>,
}

impl LinkHalves {
    pub fn new(reader: Box<dyn Read + Send>, writer: Box<dyn Write + Send>) -> Self {
        Self { reader, writer }
    }
}

/// Open a serial device, wake it via DTR/RTS and drop any boot chatter.
#[cfg(feature = "serial")]
pub async fn open_serial(port_name: &str, baud_rate: u32) -> Result<LinkHalves> {
    debug!("Opening serial port {} at {} baud", port_name, baud_rate);

    let mut port = serialport::new(port_name, baud_rate)
        .timeout(Duration::from_millis(500))
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None)
        .open()
        .map_err(|e| anyhow!("Failed to open serial port {}: {}", port_name, e))?;

    let _ = port.write_data_terminal_ready(true);
    let _ = port.write_request_to_send(true);
    sleep(Duration::from_millis(150)).await;

    if let Ok(available) = port.bytes_to_read() {
        if available > 0 {
            let _ = port.clear(serialport::ClearBuffer::Input);
            debug!("Purged {} bytes of startup output", available);
        }
    }

    let reader = port
        .try_clone()
        .map_err(|e| anyhow!("Failed to clone serial port {}: {}", port_name, e))?;
    Ok(LinkHalves::new(Box::new(reader), Box::new(port)))
}

#[cfg(not(feature = "serial"))]
pub async fn open_serial(port_name: &str, _baud_rate: u32) -> Result<LinkHalves> {
    anyhow::bail!(
        "cannot open {}: built without the `serial` feature",
        port_name
    )
}

/// A serial port the OS reports, for `meshconsole ports`.
#[derive(Debug, Clone, Serialize)]
pub struct PortSummary {
    pub name: String,
    pub kind: String,
    pub description: Option<String>,
}

#[cfg(feature = "serial")]
pub fn list_ports() -> Result<Vec<PortSummary>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let (kind, description) = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => {
                    let label = [usb.manufacturer, usb.product]
                        .into_iter()
                        .flatten()
                        .collect::<Vec<_>>()
                        .join(" ");
                    let desc = format!("{:04x}:{:04x} {}", usb.vid, usb.pid, label);
                    ("usb".to_string(), Some(desc.trim().to_string()))
                }
                serialport::SerialPortType::BluetoothPort => ("bluetooth".to_string(), None),
                serialport::SerialPortType::PciPort => ("pci".to_string(), None),
                serialport::SerialPortType::Unknown => ("unknown".to_string(), None),
            };
            PortSummary {
                name: p.port_name,
                kind,
                description,
            }
        })
        .collect())
}

#[cfg(not(feature = "serial"))]
pub fn list_ports() -> Result<Vec<PortSummary>> {
    Ok(Vec::new())
}

/// Pump raw chunks from a blocking reader into `tx` on a dedicated thread.
///
/// The thread ends on end-of-stream, on a fatal read error, or once the
/// receiving side has gone away; dropping `tx` then closes the reader task's
/// input.
pub fn spawn_read_pump(
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("meshconsole-link-rx".into())
        .spawn(move || {
            let mut buffer = [0u8; 1024];
            loop {
                if tx.is_closed() {
                    break;
                }
                match reader.read(&mut buffer) {
                    Ok(0) => {
                        debug!("Link reached end of stream");
                        break;
                    }
                    Ok(n) => {
                        trace!("RAW {} bytes: {}", n, hex_snippet(&buffer[..n], 64));
                        if tx.send(buffer[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(ref e)
                        if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {}
                    Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => {
                        warn!("Link read failed, closing: {}", e);
                        break;
                    }
                }
            }
        })
}
