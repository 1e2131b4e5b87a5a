//! KWP2000 service calls on the diagnostic client
//!
//! Each method builds its request, validates it before anything reaches the
//! bus, runs one exchange and updates the session bookkeeping on success.

use tokio::time::sleep;
use tracing::info;

use super::control::resolve as resolve_control;
use super::{ControlData, DiagnosticOutcome, RequestError, ServiceRequest};
use crate::client::GdsClient;
use crate::error::GdsError;
use crate::session::{SessionKind, TransferDirection, TransferState};

type ServiceResult = Result<DiagnosticOutcome, GdsError>;

impl GdsClient {
    async fn checked(&self, request: Result<ServiceRequest, RequestError>) -> ServiceResult {
        match request {
            Ok(request) => self.exchange(&request).await,
            Err(err) => Ok(err.into()),
        }
    }

    /// Start Diagnostic Session (0x10)
    pub async fn start_session(&mut self, kind: SessionKind) -> ServiceResult {
        let outcome = self
            .exchange(&ServiceRequest::start_session(kind.id()))
            .await?;
        if outcome.is_success() {
            info!(session = %kind, "Diagnostic session started");
            self.session.active = Some(kind);
            self.session.security_unlocked = false;
        }
        Ok(outcome)
    }

    /// ECU Reset (0x11)
    ///
    /// On success waits out the ECU's re-initialisation before returning.
    /// The ECU falls back to its default session, so session and transfer
    /// bookkeeping are cleared.
    pub async fn ecu_reset(&mut self) -> ServiceResult {
        let outcome = self.exchange(&ServiceRequest::ecu_reset()).await?;
        if outcome.is_success() {
            info!("ECU reset accepted, waiting for re-initialisation");
            sleep(self.services.reset_grace()).await;
            self.session.clear();
        }
        Ok(outcome)
    }

    /// Clear Diagnostic Information (0x14), all groups
    pub async fn clear_dtc(&mut self) -> ServiceResult {
        self.exchange(&ServiceRequest::clear_dtc()).await
    }

    /// Read Diagnostic Trouble Codes By Status (0x18)
    ///
    /// Output is every byte after the response SID (count plus DTC records).
    pub async fn read_dtc_by_status(&mut self, status: u8, group: u16) -> ServiceResult {
        self.exchange(&ServiceRequest::read_dtc_by_status(status, group))
            .await
    }

    /// Read Data By Local Identifier (0x21)
    pub async fn read_data_by_local_identifier(&mut self, local_id: u8) -> ServiceResult {
        self.exchange(&ServiceRequest::read_local(local_id)).await
    }

    /// Read Data By Common Identifier (0x22)
    pub async fn read_data_by_identifier(&mut self, did: u16) -> ServiceResult {
        self.exchange(&ServiceRequest::read_did(did)).await
    }

    /// Read Memory By Address (0x23); `length` must be in `1..=0x4094`
    pub async fn read_memory_by_address(&mut self, address: u32, length: u16) -> ServiceResult {
        self.checked(ServiceRequest::read_memory(address, length))
            .await
    }

    /// Write Data By Common Identifier (0x2E); at most 4 value bytes
    pub async fn write_data_by_identifier(&mut self, did: u16, value: &[u8]) -> ServiceResult {
        self.checked(ServiceRequest::write_did(did, value)).await
    }

    /// Input Output Control By Common Identifier (0x2F)
    ///
    /// `control` is anything convertible to [`ControlData`]: raw bytes, an
    /// integer sent big-endian in the fewest bytes, or text. At most three
    /// control bytes fit.
    pub async fn io_control_by_identifier<C, E>(
        &mut self,
        did: u16,
        control_type: u8,
        control: C,
    ) -> ServiceResult
    where
        C: TryInto<ControlData, Error = E>,
        E: Into<RequestError>,
    {
        let request = resolve_control(control)
            .and_then(|data| data.to_bytes())
            .and_then(|bytes| ServiceRequest::io_control(did, control_type, &bytes));
        self.checked(request).await
    }

    /// Write Data By Local Identifier (0x3B); at most 5 value bytes
    pub async fn write_data_by_local_identifier(
        &mut self,
        local_id: u8,
        value: &[u8],
    ) -> ServiceResult {
        self.checked(ServiceRequest::write_local(local_id, value))
            .await
    }

    /// Write Memory By Address (0x3D); 1 to 4088 data bytes
    pub async fn write_memory_by_address(&mut self, address: u32, data: &[u8]) -> ServiceResult {
        self.checked(ServiceRequest::write_memory(address, data))
            .await
    }

    /// Tester Present (0x3E)
    ///
    /// With `response_required == false` the request goes out and the call
    /// returns without waiting for anything.
    pub async fn tester_present(&mut self, response_required: bool) -> ServiceResult {
        let request = ServiceRequest::tester_present(response_required);
        if response_required {
            self.exchange(&request).await
        } else {
            self.send_only(&request).await
        }
    }

    /// Request Download (0x34); starts a tester to ECU transfer
    pub async fn request_download(&mut self, address: u32, size: u32) -> ServiceResult {
        self.request_transfer(TransferDirection::Download, address, size)
            .await
    }

    /// Request Upload (0x35); starts an ECU to tester transfer
    pub async fn request_upload(&mut self, address: u32, size: u32) -> ServiceResult {
        self.request_transfer(TransferDirection::Upload, address, size)
            .await
    }

    async fn request_transfer(
        &mut self,
        direction: TransferDirection,
        address: u32,
        size: u32,
    ) -> ServiceResult {
        let request = match direction {
            TransferDirection::Download => ServiceRequest::request_download(address, size),
            TransferDirection::Upload => ServiceRequest::request_upload(address, size),
        };
        let outcome = self.checked(request).await?;
        if outcome.is_success() {
            info!(
                ?direction,
                address = format_args!("0x{:08X}", address),
                size,
                "Transfer negotiated"
            );
            self.session.transfer = Some(TransferState::new(direction, address, size));
        }
        Ok(outcome)
    }

    /// Transfer Data (0x36) for an explicit block number
    ///
    /// If a transfer is tracked and `block_number` is its next block, a
    /// positive response advances the counter.
    pub async fn transfer_data(&mut self, block_number: u8) -> ServiceResult {
        let outcome = self
            .exchange(&ServiceRequest::transfer_data(block_number))
            .await?;
        if outcome.is_success() {
            if let Some(transfer) = self.session.transfer.as_mut() {
                if transfer.block_number == block_number {
                    transfer.advance();
                }
            }
        }
        Ok(outcome)
    }

    /// Transfer Data (0x36) for the tracked next block
    ///
    /// `InvalidArgument` when no download or upload is in progress.
    pub async fn transfer_next(&mut self) -> ServiceResult {
        match self.session.transfer.as_ref() {
            Some(transfer) => {
                let block_number = transfer.block_number;
                self.transfer_data(block_number).await
            }
            None => Ok(DiagnosticOutcome::InvalidArgument),
        }
    }

    /// Request Transfer Exit (0x37)
    pub async fn request_transfer_exit(&mut self) -> ServiceResult {
        let outcome = self.exchange(&ServiceRequest::transfer_exit()).await?;
        if outcome.is_success() {
            if let Some(transfer) = self.session.transfer.take() {
                info!(
                    direction = ?transfer.direction,
                    blocks = transfer.block_number.wrapping_sub(1),
                    "Transfer finished"
                );
            }
        }
        Ok(outcome)
    }

    /// Drop the tracked transfer without telling the ECU
    pub fn abort_transfer(&mut self) -> Option<TransferState> {
        self.session.transfer.take()
    }
}
