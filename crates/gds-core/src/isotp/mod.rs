//! ISO 15765-2 (ISO-TP) segmentation and reassembly
//!
//! Payloads of up to 7 bytes travel in a single frame. Longer payloads (up
//! to 4095 bytes) are split into a first frame plus consecutive frames, paced
//! by the receiver's flow-control frames.
//!
//! ```text
//!  byte 0 high nibble   frame
//!  ──────────────────   ─────────────────────────────────────────────
//!  0x0                  single       [0L] [payload ≤ 7]
//!  0x1                  first        [1L] [LL] [payload 6]
//!  0x2                  consecutive  [2N] [payload ≤ 7]
//!  0x3                  flow control [30] [block size] [STmin]
//! ```

mod codec;
mod error;
mod reassembly;
mod transport;

pub use codec::{
    consecutive_frame, decode_st_min, first_frame, flow_control_frame, single_frame, FlowControl,
    FrameKind, CONSECUTIVE_FRAME_DATA, FIRST_FRAME_DATA, MAX_PAYLOAD_LEN, SINGLE_FRAME_MAX,
};
pub use error::TransportError;
pub use reassembly::{Reassembler, RxEvent};
pub use transport::IsoTpTransport;
