//! KWP2000/UDS diagnostic service layer
//!
//! Request building and response classification live in `codec`; the
//! async service methods on [`GdsClient`](crate::GdsClient) are in
//! `services`.

mod codec;
mod control;
mod nrc;
mod outcome;
mod services;

pub use codec::{classify, ServiceRequest};
pub use control::{ControlData, MAX_CONTROL_BYTES, MAX_CONTROL_INTEGER};
pub use nrc::NrcCode;
pub use outcome::{DiagnosticOutcome, RequestError};

/// Service identifiers used by the GDS service set
pub mod service_id {
    pub const START_DIAGNOSTIC_SESSION: u8 = 0x10;
    pub const ECU_RESET: u8 = 0x11;
    pub const CLEAR_DIAGNOSTIC_INFO: u8 = 0x14;
    pub const READ_DTC_BY_STATUS: u8 = 0x18;
    pub const READ_DATA_BY_LOCAL_ID: u8 = 0x21;
    pub const READ_DATA_BY_ID: u8 = 0x22;
    pub const READ_MEMORY_BY_ADDRESS: u8 = 0x23;
    pub const SECURITY_ACCESS: u8 = 0x27;
    pub const WRITE_DATA_BY_ID: u8 = 0x2E;
    pub const IO_CONTROL_BY_ID: u8 = 0x2F;
    pub const REQUEST_DOWNLOAD: u8 = 0x34;
    pub const REQUEST_UPLOAD: u8 = 0x35;
    pub const TRANSFER_DATA: u8 = 0x36;
    pub const REQUEST_TRANSFER_EXIT: u8 = 0x37;
    pub const WRITE_DATA_BY_LOCAL_ID: u8 = 0x3B;
    pub const WRITE_MEMORY_BY_ADDRESS: u8 = 0x3D;
    pub const TESTER_PRESENT: u8 = 0x3E;
    pub const NEGATIVE_RESPONSE: u8 = 0x7F;
}

/// TesterPresent (0x3E) sub-functions
pub mod tester_present_mode {
    pub const RESPONSE_REQUIRED: u8 = 0x01;
    pub const NO_RESPONSE: u8 = 0x02;
}

/// SecurityAccess (0x27) sub-functions
pub mod security_level {
    pub const REQUEST_SEED: u8 = 0x01;
    pub const SEND_KEY: u8 = 0x02;
}

/// InputOutputControlByCommonIdentifier (0x2F) control types
pub mod io_control_type {
    pub const RETURN_CONTROL_TO_ECU: u8 = 0x00;
    pub const FREEZE_CURRENT_STATE: u8 = 0x05;
    pub const SHORT_TERM_ADJUSTMENT: u8 = 0x07;
}

/// Group parameter of ClearDiagnosticInformation meaning "all DTCs"
pub const ALL_DTC_GROUPS: u16 = 0xFF00;

/// Reset mode sent with ECUReset
pub const POWER_ON_RESET: u8 = 0x01;

/// Positive response SID for a request SID
pub const fn positive_response_sid(sid: u8) -> u8 {
    sid.wrapping_add(0x40)
}

/// Human name of a service identifier, request or positive response
///
/// OBD-II modes 0x01-0x09 are included since they share the bus with the
/// diagnostic modules.
pub fn service_name(sid: u8) -> Option<&'static str> {
    let name = match sid {
        0x01 => "OBD Show Current Data",
        0x02 => "OBD Show Freeze Frame Data",
        0x03 => "OBD Show Stored DTCs",
        0x04 => "OBD Clear DTCs",
        0x05 => "OBD O2 Sensor Monitoring",
        0x06 => "OBD On-Board Monitoring",
        0x07 => "OBD Show Pending DTCs",
        0x08 => "OBD Control On-Board System",
        0x09 => "OBD Request Vehicle Information",
        0x10 => "Start Diagnostic Session",
        0x11 => "ECU Reset",
        0x14 => "Clear Diagnostic Information",
        0x18 => "Read DTC By Status",
        0x21 => "Read Data By Local Identifier",
        0x22 => "Read Data By Common Identifier",
        0x23 => "Read Memory By Address",
        0x27 => "Security Access",
        0x2E => "Write Data By Common Identifier",
        0x2F => "Input Output Control By Common Identifier",
        0x31 => "Start Routine By Local Identifier",
        0x34 => "Request Download",
        0x35 => "Request Upload",
        0x36 => "Transfer Data",
        0x37 => "Request Transfer Exit",
        0x3B => "Write Data By Local Identifier",
        0x3D => "Write Memory By Address",
        0x3E => "Tester Present",
        0x7F => "Negative Response",
        0x50..=0x7E => return service_name(sid - 0x40),
        _ => return None,
    };
    Some(name)
}
