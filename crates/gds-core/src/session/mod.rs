//! Diagnostic session and firmware transfer bookkeeping
//!
//! The client keeps one [`SessionState`] for the selected module. It is a
//! mirror of what the ECU was last told, updated only by positive responses.

use std::fmt;

use thiserror::Error;

/// Diagnostic session requested with StartDiagnosticSession (0x10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// Standard diagnostic session (0x81)
    Diagnostic,
    /// ECU programming session (0x85)
    Programming,
    /// ECU adjustment session (0x87)
    Adjustment,
}

impl SessionKind {
    pub fn id(self) -> u8 {
        match self {
            Self::Diagnostic => 0x81,
            Self::Programming => 0x85,
            Self::Adjustment => 0x87,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unknown session id 0x{0:02X}")]
pub struct UnknownSession(pub u8);

impl TryFrom<u8> for SessionKind {
    type Error = UnknownSession;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x81 => Ok(Self::Diagnostic),
            0x85 => Ok(Self::Programming),
            0x87 => Ok(Self::Adjustment),
            other => Err(UnknownSession(other)),
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Diagnostic => "Standard Diagnostic",
            Self::Programming => "ECU Programming",
            Self::Adjustment => "ECU Adjustment",
        };
        f.write_str(name)
    }
}

/// Direction of a negotiated transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Tester to ECU (RequestDownload)
    Download,
    /// ECU to tester (RequestUpload)
    Upload,
}

/// Transfer negotiated by a successful download or upload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferState {
    pub direction: TransferDirection,
    pub address: u32,
    /// 24-bit size
    pub size: u32,
    /// Block number of the next TransferData request
    pub block_number: u8,
}

impl TransferState {
    /// Fresh transfer; the first TransferData block is 0x01
    pub fn new(direction: TransferDirection, address: u32, size: u32) -> Self {
        Self {
            direction,
            address,
            size,
            block_number: 0x01,
        }
    }

    /// Record an acknowledged block, wrapping 0xFF to 0x00
    pub fn advance(&mut self) {
        self.block_number = self.block_number.wrapping_add(1);
    }
}

/// Session state of the selected module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub active: Option<SessionKind>,
    pub security_unlocked: bool,
    pub transfer: Option<TransferState>,
}

impl SessionState {
    /// Forget everything, as after a reset or a module change
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
