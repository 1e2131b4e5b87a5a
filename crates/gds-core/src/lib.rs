//! gds-core - Ford GDS style diagnostics over CAN
//!
//! This crate talks KWP2000 to vehicle modules over ISO-TP on a raw CAN
//! bus: it segments and reassembles payloads, encodes service requests and
//! classifies the replies into typed outcomes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        GdsClient                            │
//! │  service calls (kwp), security handshake, session state     │
//! │                                                             │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │ModuleRegistry│  │ SessionState │  │   FrameLogger    │   │
//! │  │ (addressing) │  │ (bookkeeping)│  │ (observational)  │   │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘   │
//! │                          │                                  │
//! │                   ┌──────┴───────┐                          │
//! │                   │IsoTpTransport│                          │
//! │                   │ (segmenting) │                          │
//! │                   └──────┬───────┘                          │
//! │                          │                                  │
//! │                  ┌───────┴────────┐                         │
//! │                  │     CanBus     │                         │
//! │                  │(SocketCAN/Mock)│                         │
//! │                  └────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gds_core::{GdsClient, GdsConfig, SessionKind};
//!
//! let mut client = GdsClient::connect(&GdsConfig::default()).await?;
//! client.select_module("PCM")?;
//! let outcome = client.start_session(SessionKind::Diagnostic).await?;
//! println!("{}", outcome);
//! ```

pub mod bus;
mod client;
pub mod config;
pub mod error;
pub mod isotp;
pub mod kwp;
pub mod logging;
pub mod registry;
mod security;
pub mod session;

pub use bus::{create_bus, BusError, CanBus, Frame};
pub use client::GdsClient;
pub use config::{BusConfig, GdsConfig};
pub use error::GdsError;
pub use kwp::{ControlData, DiagnosticOutcome, NrcCode};
pub use logging::{Direction, FrameLogger, NullFrameLogger, TracingFrameLogger};
pub use registry::{ModuleAddress, ModuleRegistry, RegistryError};
pub use security::{KeyDerivation, NoKeyDerivation};
pub use session::{SessionKind, SessionState, TransferDirection, TransferState};
