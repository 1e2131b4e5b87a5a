//! Frame logging collaborator
//!
//! The transport hands every transmitted and received frame to a
//! [`FrameLogger`]. Logging is observational only and never changes a
//! protocol outcome.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::bus::Frame;
use crate::isotp::{FlowControl, FrameKind};
use crate::kwp::{service_id, service_name, NrcCode};
use crate::registry::ModuleRegistry;
use crate::session::SessionKind;

/// Frame direction relative to the tester
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Tx,
    Rx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tx => f.write_str("TX"),
            Self::Rx => f.write_str("RX"),
        }
    }
}

pub trait FrameLogger: Send + Sync {
    fn log_frame(&self, frame: &Frame, direction: Direction);

    fn log_text(&self, line: &str);
}

/// Emits one `tracing` event per frame with a decoded description
pub struct TracingFrameLogger {
    registry: Arc<ModuleRegistry>,
}

impl TracingFrameLogger {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }
}

impl FrameLogger for TracingFrameLogger {
    fn log_frame(&self, frame: &Frame, direction: Direction) {
        let description = describe_frame(&self.registry, frame);
        let id = format!("0x{:03X}", frame.id());
        let data = hex::encode_upper(frame.data());

        // Background traffic is only interesting when tracing everything
        if self.registry.is_diagnostic_id(frame.id()) {
            debug!(direction = %direction, id = %id, data = %data, "{}", description);
        } else {
            trace!(direction = %direction, id = %id, data = %data, "{}", description);
        }
    }

    fn log_text(&self, line: &str) {
        info!("{}", line);
    }
}

/// Discards everything
pub struct NullFrameLogger;

impl FrameLogger for NullFrameLogger {
    fn log_frame(&self, _frame: &Frame, _direction: Direction) {}

    fn log_text(&self, _line: &str) {}
}

/// Human description of a frame
///
/// Broadcast ids get their label; diagnostic ids are decoded down to the
/// service, NRC, session, identifier or address they carry. Anything else
/// is described as unknown traffic.
pub fn describe_frame(registry: &ModuleRegistry, frame: &Frame) -> String {
    let id = frame.id();
    if let Some(label) = registry.classify_broadcast(id) {
        return format!("{} broadcast", label);
    }

    let Some(module) = registry.module_for_id(id) else {
        return "Unknown".to_string();
    };
    let arrow = if module.request_id == id { "->" } else { "<-" };

    let data = frame.data();
    let Some(&pci) = data.first() else {
        return format!("{} {} empty frame", arrow, module.name);
    };

    let body = match FrameKind::from_pci(pci) {
        Some(FrameKind::Single) => {
            let len = usize::from(pci & 0x0F).min(data.len().saturating_sub(1));
            describe_payload(&data[1..1 + len])
        }
        Some(FrameKind::First) if data.len() >= 2 => {
            let total = (usize::from(pci & 0x0F) << 8) | usize::from(data[1]);
            format!(
                "First Frame ({} bytes) {}",
                total,
                describe_payload(&data[2..])
            )
        }
        Some(FrameKind::Consecutive) => format!("Consecutive Frame #{}", pci & 0x0F),
        Some(FrameKind::FlowControl) => match FlowControl::parse(data) {
            Some(fc) => format!(
                "Flow Control BS={} STmin=0x{:02X}",
                fc.block_size, data[2]
            ),
            None => "Flow Control (wait/overflow)".to_string(),
        },
        _ => "Malformed".to_string(),
    };

    format!("{} {} {}", arrow, module.name, body)
}

/// Describe a (possibly truncated) service payload `[SID, ...]`
fn describe_payload(payload: &[u8]) -> String {
    let Some(&sid) = payload.first() else {
        return "Empty".to_string();
    };

    if sid == service_id::NEGATIVE_RESPONSE {
        let service = payload
            .get(1)
            .and_then(|s| service_name(*s))
            .unwrap_or("Unknown Service");
        return match payload.get(2) {
            Some(nrc) => format!("Negative Response: {} - {}", service, NrcCode::from(*nrc)),
            None => format!("Negative Response: {}", service),
        };
    }

    let name = match service_name(sid) {
        Some(name) => name.to_string(),
        None => format!("Service 0x{:02X}", sid),
    };
    let positive = (0x50..0x7F).contains(&sid);
    let name = if positive {
        format!("{} (positive)", name)
    } else {
        name
    };

    let request_sid = if positive { sid - 0x40 } else { sid };
    let params = &payload[1..];
    let detail = match request_sid {
        service_id::START_DIAGNOSTIC_SESSION => params
            .first()
            .and_then(|s| SessionKind::try_from(*s).ok())
            .map(|kind| kind.to_string()),
        service_id::READ_DATA_BY_ID | service_id::WRITE_DATA_BY_ID | service_id::IO_CONTROL_BY_ID => {
            match params {
                [hi, lo, ..] => Some(format!("DID 0x{:02X}{:02X}", hi, lo)),
                _ => None,
            }
        }
        service_id::READ_DATA_BY_LOCAL_ID | service_id::WRITE_DATA_BY_LOCAL_ID => {
            params.first().map(|id| format!("Local ID 0x{:02X}", id))
        }
        service_id::READ_MEMORY_BY_ADDRESS if !positive => describe_address(params),
        service_id::WRITE_MEMORY_BY_ADDRESS => describe_address(params),
        service_id::TRANSFER_DATA => params.first().map(|n| format!("Block {}", n)),
        _ => None,
    };

    match detail {
        Some(detail) => format!("{} {}", name, detail),
        None => name,
    }
}

fn describe_address(params: &[u8]) -> Option<String> {
    match params {
        [a, b, c, d, ..] => Some(format!(
            "Address 0x{:08X}",
            u32::from_be_bytes([*a, *b, *c, *d])
        )),
        _ => None,
    }
}
