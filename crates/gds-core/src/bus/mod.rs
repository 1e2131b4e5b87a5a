//! Bus collaborator for raw CAN frame access
//!
//! This module provides adapters the diagnostic core sends and receives
//! frames through:
//! - SocketCAN adapter for classic CAN (Linux only)
//! - Mock adapter with a simulated ECU for testing
//!
//! # Example
//!
//! ```ignore
//! use gds_core::bus::{create_bus, CanBus};
//! use gds_core::config::BusConfig;
//!
//! let bus = create_bus(&BusConfig::SocketCan(Default::default())).await?;
//! let frame = bus.recv(Duration::from_millis(50)).await?;
//! ```

mod adapter;
pub mod error;
mod frame;
pub mod mock;

#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub mod socketcan;

pub use adapter::CanBus;
pub use error::BusError;
pub use frame::{Frame, FRAME_LEN, MAX_STANDARD_ID};

use std::sync::Arc;

use crate::config::BusConfig;

/// Create a bus adapter based on configuration
pub async fn create_bus(config: &BusConfig) -> Result<Arc<dyn CanBus>, BusError> {
    match config {
        #[cfg(all(target_os = "linux", feature = "socketcan"))]
        BusConfig::SocketCan(cfg) => {
            let bus = socketcan::SocketCanBus::open(cfg).await?;
            Ok(Arc::new(bus))
        }
        #[cfg(not(all(target_os = "linux", feature = "socketcan")))]
        BusConfig::SocketCan(_) => Err(BusError::Unsupported(
            "SocketCAN requires Linux and the 'socketcan' feature".to_string(),
        )),
        BusConfig::Mock(cfg) => Ok(Arc::new(mock::MockBus::new(cfg))),
    }
}
