//! Bus adapter trait

use std::time::Duration;

use async_trait::async_trait;

use super::{BusError, Frame};

/// Raw frame access to a CAN bus
///
/// Implementations never filter traffic; matching a frame's id against the
/// addressed module is the transport's job.
#[async_trait]
pub trait CanBus: Send + Sync {
    /// Transmit a single frame
    async fn send(&self, frame: &Frame) -> Result<(), BusError>;

    /// Wait up to `timeout` for the next frame
    ///
    /// Returns `Ok(None)` when nothing arrived in time. Must not block past
    /// the given duration.
    async fn recv(&self, timeout: Duration) -> Result<Option<Frame>, BusError>;

    /// Release the underlying interface
    async fn shutdown(&self) -> Result<(), BusError> {
        Ok(())
    }
}
