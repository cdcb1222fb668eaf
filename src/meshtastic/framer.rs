//! Meshtastic serial stream framer.
//!
//! Protobuf messages on the serial link are emitted as:
//!
//!   `0x94 0xC3 <len_hi> <len_lo> <protobuf bytes>`
//!
//! The radio also prints plain debug text on the same port, so the decoder
//! realigns on the two magic bytes and discards anything in between. Frames
//! declaring an empty or oversize payload are treated as noise and skipped one
//! byte at a time.
use anyhow::{anyhow, Result};
use bytes::{Buf, BytesMut};

pub const START1: u8 = 0x94;
pub const START2: u8 = 0xC3;
pub const HEADER_LEN: usize = 4;
/// Largest payload the firmware will emit or accept.
pub const MAX_PAYLOAD: usize = 512;

/// Incremental decoder for the `0x94 0xC3` stream framing.
pub struct StreamFramer {
    buf: BytesMut,
    skipped: usize,
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamFramer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(1024),
            skipped: 0,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes discarded while hunting for a frame header (console text, line noise).
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Bytes buffered but not yet framed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Extract the next complete payload, if one is buffered.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            // Realign to the first magic byte
            match self.buf.iter().position(|&b| b == START1) {
                Some(0) => {}
                Some(pos) => {
                    self.skipped += pos;
                    self.buf.advance(pos);
                }
                None => {
                    self.skipped += self.buf.len();
                    self.buf.clear();
                    return None;
                }
            }
            if self.buf.len() < 2 {
                return None;
            }
            if self.buf[1] != START2 {
                self.skipped += 1;
                self.buf.advance(1);
                continue;
            }
            if self.buf.len() < HEADER_LEN {
                return None;
            }
            let declared = ((self.buf[2] as usize) << 8) | self.buf[3] as usize;
            if declared == 0 || declared > MAX_PAYLOAD {
                self.skipped += 1;
                self.buf.advance(1);
                continue;
            }
            if self.buf.len() < HEADER_LEN + declared {
                return None;
            }
            self.buf.advance(HEADER_LEN);
            return Some(self.buf.split_to(declared).to_vec());
        }
    }
}

/// Prefix `payload` with the stream header.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(anyhow!(
            "payload of {} bytes exceeds {} byte frame limit",
            payload.len(),
            MAX_PAYLOAD
        ));
    }
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(START1);
    out.push(START2);
    out.push(((payload.len() >> 8) & 0xFF) as u8);
    out.push((payload.len() & 0xFF) as u8);
    out.extend_from_slice(payload);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_frame_split_across_pushes() {
        let frame = encode_frame(b"hello").unwrap();
        let mut f = StreamFramer::new();
        f.push(&frame[..3]);
        assert!(f.next_frame().is_none());
        f.push(&frame[3..]);
        assert_eq!(f.next_frame().as_deref(), Some(&b"hello"[..]));
        assert!(f.next_frame().is_none());
    }

    #[test]
    fn resyncs_after_console_text() {
        let mut data = b"INFO | boot ok\r\n".to_vec();
        data.extend(encode_frame(&[1, 2, 3]).unwrap());
        let mut f = StreamFramer::new();
        f.push(&data);
        assert_eq!(f.next_frame(), Some(vec![1, 2, 3]));
        assert_eq!(f.skipped(), 16);
    }

    #[test]
    fn skips_oversize_header() {
        let mut data = vec![START1, START2, 0x7F, 0xFF];
        data.extend(encode_frame(&[9]).unwrap());
        let mut f = StreamFramer::new();
        f.push(&data);
        assert_eq!(f.next_frame(), Some(vec![9]));
        assert_eq!(f.pending(), 0);
    }

    #[test]
    fn lone_start_byte_waits_for_more() {
        let mut f = StreamFramer::new();
        f.push(&[START1]);
        assert!(f.next_frame().is_none());
        assert_eq!(f.pending(), 1);
    }

    #[test]
    fn encode_rejects_oversize() {
        assert!(encode_frame(&[0u8; MAX_PAYLOAD + 1]).is_err());
    }
}
