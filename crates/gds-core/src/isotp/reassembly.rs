//! Receive-side reassembly state machine

use super::codec::FrameKind;

/// What the receiver should do after feeding a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxEvent {
    /// A complete payload is available
    Complete(Vec<u8>),
    /// A first frame started a transfer; reply with flow control
    FlowControlRequired,
    /// More consecutive frames are needed
    Pending,
    /// A consecutive frame broke the sequence; the transfer is abandoned
    SequenceError { expected: u8, got: u8 },
    /// Not a frame this receiver acts on
    Ignored,
}

/// Reassembly state for a single receive operation
#[derive(Debug, Default)]
pub struct Reassembler {
    expected_len: Option<usize>,
    accumulated: Vec<u8>,
    next_seq: u8,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes collected so far in the current transfer
    pub fn accumulated(&self) -> &[u8] {
        &self.accumulated
    }

    /// Feed the data bytes of one received frame
    pub fn on_frame(&mut self, data: &[u8]) -> RxEvent {
        let Some(&pci) = data.first() else {
            return RxEvent::Ignored;
        };

        match FrameKind::from_pci(pci) {
            Some(FrameKind::Single) => {
                let len = (pci & 0x0F) as usize;
                let end = (1 + len).min(data.len());
                self.reset();
                RxEvent::Complete(data[1..end].to_vec())
            }
            Some(FrameKind::First) => {
                if data.len() < 2 {
                    return RxEvent::Ignored;
                }
                let total = (((pci & 0x0F) as usize) << 8) | data[1] as usize;
                self.expected_len = Some(total);
                self.accumulated = data[2..].to_vec();
                self.next_seq = 1;
                RxEvent::FlowControlRequired
            }
            Some(FrameKind::Consecutive) => {
                let Some(expected_len) = self.expected_len else {
                    // No first frame seen in this receive
                    return RxEvent::Ignored;
                };

                let seq = pci & 0x0F;
                if seq != self.next_seq {
                    let expected = self.next_seq;
                    self.reset();
                    return RxEvent::SequenceError { expected, got: seq };
                }

                self.next_seq = (self.next_seq + 1) & 0x0F;
                self.accumulated.extend_from_slice(&data[1..]);

                if self.accumulated.len() >= expected_len {
                    let mut payload = std::mem::take(&mut self.accumulated);
                    payload.truncate(expected_len);
                    self.reset();
                    RxEvent::Complete(payload)
                } else {
                    RxEvent::Pending
                }
            }
            Some(FrameKind::FlowControl) | None => RxEvent::Ignored,
        }
    }

    fn reset(&mut self) {
        self.expected_len = None;
        self.accumulated.clear();
        self.next_seq = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isotp::{consecutive_frame, first_frame, single_frame, FIRST_FRAME_DATA};
    use pretty_assertions::assert_eq;

    fn padded(mut frame: Vec<u8>) -> Vec<u8> {
        frame.resize(8, 0x00);
        frame
    }

    #[test]
    fn test_single_frame_strips_padding() {
        let mut rx = Reassembler::new();
        let frame = padded(single_frame(&[0x50, 0x81]));
        assert_eq!(rx.on_frame(&frame), RxEvent::Complete(vec![0x50, 0x81]));
    }

    #[test]
    fn test_single_frame_length_clamped_to_frame() {
        let mut rx = Reassembler::new();
        assert_eq!(rx.on_frame(&[0x05, 0x50]), RxEvent::Complete(vec![0x50]));
    }

    #[test]
    fn test_multi_frame_reassembly() {
        let payload: Vec<u8> = (0..20).collect();
        let mut rx = Reassembler::new();

        assert_eq!(
            rx.on_frame(&first_frame(&payload)),
            RxEvent::FlowControlRequired
        );
        assert_eq!(
            rx.on_frame(&padded(consecutive_frame(1, &payload[6..13]))),
            RxEvent::Pending
        );
        assert_eq!(
            rx.on_frame(&padded(consecutive_frame(2, &payload[13..20]))),
            RxEvent::Complete(payload)
        );
    }

    #[test]
    fn test_last_frame_padding_truncated() {
        let payload: Vec<u8> = (0..8).collect();
        let mut rx = Reassembler::new();
        rx.on_frame(&first_frame(&payload));
        assert_eq!(
            rx.on_frame(&padded(consecutive_frame(1, &payload[6..]))),
            RxEvent::Complete(payload)
        );
    }

    #[test]
    fn test_sequence_wraps_after_fifteen() {
        // 6 + 17 * 7 bytes needs sequence numbers 1..=15, 0, 1
        let payload: Vec<u8> = (0..(FIRST_FRAME_DATA + 17 * 7)).map(|i| i as u8).collect();
        let mut rx = Reassembler::new();
        rx.on_frame(&first_frame(&payload));

        let mut seq = 1u8;
        let mut result = None;
        for chunk in payload[FIRST_FRAME_DATA..].chunks(7) {
            match rx.on_frame(&consecutive_frame(seq, chunk)) {
                RxEvent::Pending => {}
                RxEvent::Complete(data) => result = Some(data),
                other => panic!("unexpected event {:?}", other),
            }
            seq = (seq + 1) & 0x0F;
        }
        assert_eq!(result, Some(payload));
    }

    #[test]
    fn test_sequence_gap_aborts() {
        let payload: Vec<u8> = (0..30).collect();
        let mut rx = Reassembler::new();
        rx.on_frame(&first_frame(&payload));
        rx.on_frame(&consecutive_frame(1, &payload[6..13]));

        assert_eq!(
            rx.on_frame(&consecutive_frame(3, &payload[13..20])),
            RxEvent::SequenceError {
                expected: 2,
                got: 3
            }
        );
        // State was dropped: later frames are not taken as valid
        assert_eq!(
            rx.on_frame(&consecutive_frame(2, &payload[13..20])),
            RxEvent::Ignored
        );
        assert!(rx.accumulated().is_empty());
    }

    #[test]
    fn test_stray_consecutive_frame_ignored() {
        let mut rx = Reassembler::new();
        assert_eq!(rx.on_frame(&[0x21, 1, 2, 3]), RxEvent::Ignored);
    }

    #[test]
    fn test_flow_control_and_empty_ignored() {
        let mut rx = Reassembler::new();
        assert_eq!(rx.on_frame(&[0x30, 0, 0]), RxEvent::Ignored);
        assert_eq!(rx.on_frame(&[]), RxEvent::Ignored);
    }
}
