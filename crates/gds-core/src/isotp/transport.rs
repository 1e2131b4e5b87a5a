//! ISO-TP send and receive over a raw [`CanBus`]

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::codec::{
    consecutive_frame, first_frame, flow_control_frame, single_frame, FlowControl,
    CONSECUTIVE_FRAME_DATA, FIRST_FRAME_DATA, MAX_PAYLOAD_LEN, SINGLE_FRAME_MAX,
};
use super::reassembly::{Reassembler, RxEvent};
use super::TransportError;
use crate::bus::{CanBus, Frame};
use crate::config::TransportConfig;
use crate::logging::{Direction, FrameLogger};
use crate::registry::ModuleAddress;

/// Flow control sent in reply to a first frame: unlimited block, no delay
const RX_BLOCK_SIZE: u8 = 0x00;
const RX_ST_MIN: u8 = 0x00;

/// Segmenting/reassembling transport bound to one bus
///
/// Holds no per-exchange state; reassembly and flow-control parameters live
/// on the stack of a single `send` or `receive` call.
pub struct IsoTpTransport {
    bus: Arc<dyn CanBus>,
    config: TransportConfig,
    logger: Arc<dyn FrameLogger>,
}

impl IsoTpTransport {
    pub fn new(bus: Arc<dyn CanBus>, config: TransportConfig, logger: Arc<dyn FrameLogger>) -> Self {
        Self {
            bus,
            config,
            logger,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<dyn CanBus> {
        &self.bus
    }

    /// Send a payload to `addr.request_id`
    ///
    /// Returns once the last frame is on the bus. Multi-frame payloads wait
    /// for flow control on `addr.response_id` after the first frame and after
    /// every completed block.
    pub async fn send(&self, addr: &ModuleAddress, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(TransportError::PayloadTooLong(payload.len()));
        }

        if payload.len() <= SINGLE_FRAME_MAX {
            return self.send_frame(addr.request_id, &single_frame(payload)).await;
        }

        self.send_frame(addr.request_id, &first_frame(payload))
            .await?;
        let mut flow = self.wait_flow_control(addr).await?;

        let mut remaining = &payload[FIRST_FRAME_DATA..];
        let mut sequence: u8 = 1;
        let mut sent_in_block: u8 = 0;

        while !remaining.is_empty() {
            if !flow.separation_time.is_zero() {
                sleep(flow.separation_time).await;
            }

            let take = remaining.len().min(CONSECUTIVE_FRAME_DATA);
            let (chunk, rest) = remaining.split_at(take);
            self.send_frame(addr.request_id, &consecutive_frame(sequence, chunk))
                .await?;
            remaining = rest;
            sequence = (sequence + 1) & 0x0F;
            sent_in_block = sent_in_block.wrapping_add(1);

            if flow.block_size != 0 && sent_in_block == flow.block_size && !remaining.is_empty() {
                flow = self.wait_flow_control(addr).await?;
                sent_in_block = 0;
            }
        }

        Ok(())
    }

    /// Receive one complete payload from `addr.response_id`
    ///
    /// First frames are answered with `[30 00 00]`. A consecutive frame out of
    /// sequence abandons this receive with [`TransportError::SequenceError`].
    pub async fn receive(
        &self,
        addr: &ModuleAddress,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut reassembler = Reassembler::new();

        while let Some(frame) = self.next_frame(addr, deadline).await? {
            match reassembler.on_frame(frame.data()) {
                RxEvent::Complete(payload) => return Ok(payload),
                RxEvent::FlowControlRequired => {
                    self.send_frame(addr.request_id, &flow_control_frame(RX_BLOCK_SIZE, RX_ST_MIN))
                        .await?;
                }
                RxEvent::SequenceError { expected, got } => {
                    warn!(
                        module = %addr.name,
                        expected,
                        got,
                        "Consecutive frame out of sequence, abandoning receive"
                    );
                    return Err(TransportError::SequenceError { expected, got });
                }
                RxEvent::Pending | RxEvent::Ignored => {}
            }
        }

        debug!(module = %addr.name, ?timeout, "No response before deadline");
        Err(TransportError::NoResponse)
    }

    /// Pad, log and transmit one frame
    pub(crate) async fn send_frame(&self, id: u16, data: &[u8]) -> Result<(), TransportError> {
        let frame = Frame::padded(id, data, self.config.padding)?;
        self.logger.log_frame(&frame, Direction::Tx);
        self.bus.send(&frame).await?;
        Ok(())
    }

    /// Wait for a continue-to-send flow-control frame
    async fn wait_flow_control(&self, addr: &ModuleAddress) -> Result<FlowControl, TransportError> {
        let deadline = Instant::now() + self.config.flow_control_timeout();

        while let Some(frame) = self.next_frame(addr, deadline).await? {
            if let Some(flow) = FlowControl::parse(frame.data()) {
                debug!(
                    module = %addr.name,
                    block_size = flow.block_size,
                    st_min = ?flow.separation_time,
                    "Flow control received"
                );
                return Ok(flow);
            }
        }

        warn!(module = %addr.name, "Timed out waiting for flow control");
        Err(TransportError::NoResponse)
    }

    /// Next frame from `addr.response_id`, or `None` at the deadline
    ///
    /// Every received frame is logged, including traffic for other ids.
    async fn next_frame(
        &self,
        addr: &ModuleAddress,
        deadline: Instant,
    ) -> Result<Option<Frame>, TransportError> {
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let slice = (deadline - now).min(self.config.poll_interval());
            if let Some(frame) = self.bus.recv(slice).await? {
                self.logger.log_frame(&frame, Direction::Rx);
                if frame.id() == addr.response_id {
                    return Ok(Some(frame));
                }
            }
        }
    }
}
