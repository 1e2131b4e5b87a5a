//! Transport errors

use thiserror::Error;

use crate::bus::BusError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Nothing matching arrived before the deadline (response or flow control)
    #[error("No response before deadline")]
    NoResponse,

    /// A consecutive frame arrived out of order; the receive was abandoned
    #[error("Sequence error: expected {expected}, got {got}")]
    SequenceError { expected: u8, got: u8 },

    #[error("Payload of {0} bytes exceeds ISO-TP limit")]
    PayloadTooLong(usize),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}
