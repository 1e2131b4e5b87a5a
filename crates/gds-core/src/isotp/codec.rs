//! Frame-level encoding for the four ISO-TP frame kinds

use std::time::Duration;

/// Largest payload a 12-bit first-frame length can describe
pub const MAX_PAYLOAD_LEN: usize = 0x0FFF;

/// Payload bytes that fit in a single frame
pub const SINGLE_FRAME_MAX: usize = 7;

/// Payload bytes carried by a first frame
pub const FIRST_FRAME_DATA: usize = 6;

/// Payload bytes carried by each consecutive frame
pub const CONSECUTIVE_FRAME_DATA: usize = 7;

const PCI_SINGLE: u8 = 0x00;
const PCI_FIRST: u8 = 0x10;
const PCI_CONSECUTIVE: u8 = 0x20;
const PCI_FLOW_CONTINUE: u8 = 0x30;

/// Frame kind, taken from the high nibble of byte 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Single,
    First,
    Consecutive,
    FlowControl,
}

impl FrameKind {
    pub fn from_pci(byte0: u8) -> Option<Self> {
        match byte0 >> 4 {
            0x0 => Some(Self::Single),
            0x1 => Some(Self::First),
            0x2 => Some(Self::Consecutive),
            0x3 => Some(Self::FlowControl),
            _ => None,
        }
    }
}

/// Parameters granted by a continue-to-send flow-control frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowControl {
    /// Consecutive frames allowed before the next flow control (0 = unlimited)
    pub block_size: u8,
    /// Minimum delay between consecutive frames
    pub separation_time: Duration,
}

impl FlowControl {
    /// Parse a continue-to-send flow-control frame
    ///
    /// Wait and overflow frames, or anything shorter than three bytes, are
    /// not accepted.
    pub fn parse(data: &[u8]) -> Option<Self> {
        match data {
            [PCI_FLOW_CONTINUE, block_size, st_min, ..] => Some(Self {
                block_size: *block_size,
                separation_time: decode_st_min(*st_min),
            }),
            _ => None,
        }
    }
}

/// Decode an STmin byte
///
/// `0x00..=0x7F` are milliseconds, `0xF1..=0xF9` are 100 µs steps. Reserved
/// values decode to zero so they never stall the sender.
pub fn decode_st_min(raw: u8) -> Duration {
    match raw {
        0x00..=0x7F => Duration::from_millis(raw as u64),
        0xF1..=0xF9 => Duration::from_micros((raw - 0xF0) as u64 * 100),
        _ => Duration::ZERO,
    }
}

/// Encode a payload of at most 7 bytes as a single frame (unpadded)
pub fn single_frame(payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= SINGLE_FRAME_MAX);
    let mut frame = Vec::with_capacity(1 + payload.len());
    frame.push(PCI_SINGLE | payload.len() as u8);
    frame.extend_from_slice(payload);
    frame
}

/// Encode the first frame of a multi-frame payload
///
/// Carries the 12-bit total length and the first 6 payload bytes.
pub fn first_frame(payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() > SINGLE_FRAME_MAX && payload.len() <= MAX_PAYLOAD_LEN);
    let total = payload.len();
    let mut frame = Vec::with_capacity(8);
    frame.push(PCI_FIRST | ((total >> 8) & 0x0F) as u8);
    frame.push((total & 0xFF) as u8);
    frame.extend_from_slice(&payload[..FIRST_FRAME_DATA]);
    frame
}

/// Encode a consecutive frame with a 4-bit sequence number (unpadded)
pub fn consecutive_frame(sequence: u8, chunk: &[u8]) -> Vec<u8> {
    debug_assert!(chunk.len() <= CONSECUTIVE_FRAME_DATA);
    let mut frame = Vec::with_capacity(1 + chunk.len());
    frame.push(PCI_CONSECUTIVE | (sequence & 0x0F));
    frame.extend_from_slice(chunk);
    frame
}

/// Encode a continue-to-send flow-control frame (unpadded)
pub fn flow_control_frame(block_size: u8, st_min: u8) -> [u8; 3] {
    [PCI_FLOW_CONTINUE, block_size, st_min]
}
