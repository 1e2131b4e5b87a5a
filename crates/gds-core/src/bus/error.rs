//! Bus layer errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("Failed to open bus: {0}")]
    Open(String),

    #[error("Bus closed")]
    Closed,

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Bus not supported: {0}")]
    Unsupported(String),
}
