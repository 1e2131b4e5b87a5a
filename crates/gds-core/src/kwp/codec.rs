//! Request layouts and response classification
//!
//! A request payload is `[SID, params...]`; the ISO-TP layer adds the PCI
//! length byte. A positive response starts with `SID + 0x40` followed by the
//! echoed parameters (session id, DID, local id, address or block number,
//! depending on the service). Everything after the echo is the output.

use super::{
    io_control_type, positive_response_sid, security_level, service_id, tester_present_mode,
    DiagnosticOutcome, NrcCode, RequestError, ALL_DTC_GROUPS, POWER_ON_RESET,
};
use crate::isotp::MAX_PAYLOAD_LEN;

/// Largest length accepted by ReadMemoryByAddress
pub const MAX_READ_MEMORY_LEN: u16 = 0x4094;

/// Largest data block for WriteMemoryByAddress (fills a 4095 byte payload)
pub const MAX_WRITE_MEMORY_LEN: usize = 4088;

/// Largest value for WriteDataByCommonIdentifier in a single frame
pub const MAX_WRITE_DID_LEN: usize = 4;

/// Largest value for WriteDataByLocalIdentifier in a single frame
pub const MAX_WRITE_LOCAL_LEN: usize = 5;

/// Largest transfer size, sent as three bytes
pub const MAX_TRANSFER_SIZE: u32 = 0xFF_FFFF;

/// Data format identifier sent with download/upload (uncompressed, unencrypted)
const TRANSFER_FORMAT_PLAIN: u8 = 0x00;

/// An encoded request plus how many of its parameter bytes the ECU echoes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    sid: u8,
    params: Vec<u8>,
    echo_len: usize,
}

impl ServiceRequest {
    fn new(sid: u8, params: Vec<u8>, echo_len: usize) -> Self {
        debug_assert!(echo_len <= params.len());
        Self {
            sid,
            params,
            echo_len,
        }
    }

    /// Request with a caller-chosen SID and no echo check
    pub fn raw(sid: u8, params: &[u8]) -> Result<Self, RequestError> {
        if params.len() + 1 > MAX_PAYLOAD_LEN {
            return Err(RequestError::OutOfRange);
        }
        Ok(Self::new(sid, params.to_vec(), 0))
    }

    pub fn sid(&self) -> u8 {
        self.sid
    }

    pub fn params(&self) -> &[u8] {
        &self.params
    }

    /// Parameter bytes that a positive response must repeat
    pub fn echo(&self) -> &[u8] {
        &self.params[..self.echo_len]
    }

    /// Bytes handed to the transport
    pub fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(1 + self.params.len());
        payload.push(self.sid);
        payload.extend_from_slice(&self.params);
        payload
    }

    /// StartDiagnosticSession (0x10)
    pub fn start_session(session_id: u8) -> Self {
        Self::new(service_id::START_DIAGNOSTIC_SESSION, vec![session_id], 1)
    }

    /// ECUReset (0x11), power-on reset
    pub fn ecu_reset() -> Self {
        Self::new(service_id::ECU_RESET, vec![POWER_ON_RESET], 0)
    }

    /// ClearDiagnosticInformation (0x14) for all groups
    pub fn clear_dtc() -> Self {
        Self::new(
            service_id::CLEAR_DIAGNOSTIC_INFO,
            ALL_DTC_GROUPS.to_be_bytes().to_vec(),
            2,
        )
    }

    /// ReadDiagnosticTroubleCodesByStatus (0x18)
    pub fn read_dtc_by_status(status: u8, group: u16) -> Self {
        let [hi, lo] = group.to_be_bytes();
        Self::new(service_id::READ_DTC_BY_STATUS, vec![status, hi, lo], 0)
    }

    /// ReadDataByLocalIdentifier (0x21)
    pub fn read_local(local_id: u8) -> Self {
        Self::new(service_id::READ_DATA_BY_LOCAL_ID, vec![local_id], 1)
    }

    /// ReadDataByCommonIdentifier (0x22)
    pub fn read_did(did: u16) -> Self {
        Self::new(service_id::READ_DATA_BY_ID, did.to_be_bytes().to_vec(), 2)
    }

    /// ReadMemoryByAddress (0x23)
    pub fn read_memory(address: u32, length: u16) -> Result<Self, RequestError> {
        if length == 0 || length > MAX_READ_MEMORY_LEN {
            return Err(RequestError::OutOfRange);
        }
        let mut params = address.to_be_bytes().to_vec();
        params.extend_from_slice(&length.to_be_bytes());
        Ok(Self::new(service_id::READ_MEMORY_BY_ADDRESS, params, 0))
    }

    /// SecurityAccess (0x27) seed request
    pub fn request_seed() -> Self {
        Self::new(
            service_id::SECURITY_ACCESS,
            vec![security_level::REQUEST_SEED],
            1,
        )
    }

    /// SecurityAccess (0x27) key
    pub fn send_key(key: &[u8]) -> Result<Self, RequestError> {
        if key.len() + 2 > MAX_PAYLOAD_LEN {
            return Err(RequestError::OutOfRange);
        }
        let mut params = vec![security_level::SEND_KEY];
        params.extend_from_slice(key);
        Ok(Self::new(service_id::SECURITY_ACCESS, params, 1))
    }

    /// WriteDataByCommonIdentifier (0x2E)
    pub fn write_did(did: u16, value: &[u8]) -> Result<Self, RequestError> {
        if value.len() > MAX_WRITE_DID_LEN {
            return Err(RequestError::OutOfRange);
        }
        let mut params = did.to_be_bytes().to_vec();
        params.extend_from_slice(value);
        Ok(Self::new(service_id::WRITE_DATA_BY_ID, params, 2))
    }

    /// InputOutputControlByCommonIdentifier (0x2F)
    ///
    /// `control` is the already resolved control data.
    pub fn io_control(did: u16, control_type: u8, control: &[u8]) -> Result<Self, RequestError> {
        if control.len() > super::MAX_CONTROL_BYTES {
            return Err(RequestError::OutOfRange);
        }
        let mut params = did.to_be_bytes().to_vec();
        params.push(control_type);
        params.extend_from_slice(control);
        Ok(Self::new(service_id::IO_CONTROL_BY_ID, params, 2))
    }

    /// Return an output to ECU control
    pub fn io_return_control(did: u16) -> Self {
        let mut params = did.to_be_bytes().to_vec();
        params.push(io_control_type::RETURN_CONTROL_TO_ECU);
        Self::new(service_id::IO_CONTROL_BY_ID, params, 2)
    }

    /// WriteDataByLocalIdentifier (0x3B)
    pub fn write_local(local_id: u8, value: &[u8]) -> Result<Self, RequestError> {
        if value.len() > MAX_WRITE_LOCAL_LEN {
            return Err(RequestError::OutOfRange);
        }
        let mut params = vec![local_id];
        params.extend_from_slice(value);
        Ok(Self::new(service_id::WRITE_DATA_BY_LOCAL_ID, params, 1))
    }

    /// WriteMemoryByAddress (0x3D)
    pub fn write_memory(address: u32, data: &[u8]) -> Result<Self, RequestError> {
        if data.is_empty() || data.len() > MAX_WRITE_MEMORY_LEN {
            return Err(RequestError::OutOfRange);
        }
        let length = data.len() as u16;
        let mut params = address.to_be_bytes().to_vec();
        params.extend_from_slice(&length.to_be_bytes());
        params.extend_from_slice(data);
        Ok(Self::new(service_id::WRITE_MEMORY_BY_ADDRESS, params, 4))
    }

    /// TesterPresent (0x3E)
    pub fn tester_present(response_required: bool) -> Self {
        let mode = if response_required {
            tester_present_mode::RESPONSE_REQUIRED
        } else {
            tester_present_mode::NO_RESPONSE
        };
        Self::new(service_id::TESTER_PRESENT, vec![mode], 0)
    }

    /// RequestDownload (0x34)
    pub fn request_download(address: u32, size: u32) -> Result<Self, RequestError> {
        Self::transfer_request(service_id::REQUEST_DOWNLOAD, address, size)
    }

    /// RequestUpload (0x35)
    pub fn request_upload(address: u32, size: u32) -> Result<Self, RequestError> {
        Self::transfer_request(service_id::REQUEST_UPLOAD, address, size)
    }

    fn transfer_request(sid: u8, address: u32, size: u32) -> Result<Self, RequestError> {
        if size == 0 || size > MAX_TRANSFER_SIZE {
            return Err(RequestError::OutOfRange);
        }
        let mut params = address.to_be_bytes().to_vec();
        params.push(TRANSFER_FORMAT_PLAIN);
        params.extend_from_slice(&size.to_be_bytes()[1..]);
        Ok(Self::new(sid, params, 0))
    }

    /// TransferData (0x36)
    pub fn transfer_data(block_number: u8) -> Self {
        Self::new(service_id::TRANSFER_DATA, vec![block_number], 1)
    }

    /// RequestTransferExit (0x37)
    pub fn transfer_exit() -> Self {
        Self::new(service_id::REQUEST_TRANSFER_EXIT, Vec::new(), 0)
    }
}

/// Classify a reassembled response payload against its request
///
/// `response` excludes the PCI/length byte.
pub fn classify(request: &ServiceRequest, response: &[u8]) -> DiagnosticOutcome {
    match response {
        [] => DiagnosticOutcome::NoResponse,
        [service_id::NEGATIVE_RESPONSE, sid, nrc, ..] if *sid == request.sid => {
            DiagnosticOutcome::NegativeResponse(NrcCode::from(*nrc))
        }
        [sid, rest @ ..]
            if *sid == positive_response_sid(request.sid) && rest.starts_with(request.echo()) =>
        {
            DiagnosticOutcome::Success(rest[request.echo_len..].to_vec())
        }
        _ => DiagnosticOutcome::UnexpectedResponse,
    }
}
