//! Mock bus with a simulated ECU for testing
//!
//! The simulated ECU speaks ISO-TP on every request id it knows: it
//! reassembles segmented requests (granting the configured block size and
//! STmin), looks the request payload up in a response table and segments the
//! reply, releasing consecutive frames only after the tester's flow control.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::time::{sleep, Instant};

use super::{BusError, CanBus, Frame};
use crate::config::MockConfig;
use crate::isotp::{
    consecutive_frame, first_frame, flow_control_frame, single_frame, FlowControl, FrameKind,
    Reassembler, RxEvent, CONSECUTIVE_FRAME_DATA, FIRST_FRAME_DATA, SINGLE_FRAME_MAX,
};
use crate::registry::ModuleRegistry;

struct Pending {
    frame: Frame,
    ready_at: Instant,
}

#[derive(Default)]
struct EcuState {
    /// Frames the tester can receive, in order
    outbox: VecDeque<Pending>,
    /// Response consecutive frames waiting for the tester's flow control
    held: VecDeque<Frame>,
    /// Request reassembly
    rx: Reassembler,
    /// Consecutive frames received since the last flow control we granted
    rx_block_count: u8,
}

/// Mock bus adapter for testing
pub struct MockBus {
    config: MockConfig,
    /// Request id -> response id of the simulated ECUs
    ecus: RwLock<BTreeMap<u16, u16>>,
    /// Predefined responses (request payload -> response payload)
    responses: RwLock<Vec<(Vec<u8>, Vec<u8>)>>,
    state: Mutex<EcuState>,
    sent: Mutex<Vec<Frame>>,
    recv_calls: AtomicUsize,
    open: AtomicBool,
}

impl MockBus {
    /// Simulate every module of the default registry
    pub fn new(config: &MockConfig) -> Self {
        let ecus = ModuleRegistry::default()
            .modules()
            .iter()
            .map(|m| (m.request_id, m.response_id))
            .collect();

        Self {
            config: config.clone(),
            ecus: RwLock::new(ecus),
            responses: RwLock::new(Self::default_responses()),
            state: Mutex::new(EcuState::default()),
            sent: Mutex::new(Vec::new()),
            recv_calls: AtomicUsize::new(0),
            open: AtomicBool::new(true),
        }
    }

    /// Also answer on `request_id`, replying from `response_id`
    pub fn add_module(&self, request_id: u16, response_id: u16) {
        self.ecus.write().insert(request_id, response_id);
    }

    /// Add a mock response for a request payload (`[SID, params...]`)
    ///
    /// An empty response means the ECU stays silent.
    pub fn add_response(&self, request: &[u8], response: &[u8]) {
        self.responses
            .write()
            .insert(0, (request.to_vec(), response.to_vec()));
    }

    /// Queue a raw frame for the tester (e.g. broadcast traffic)
    pub fn inject(&self, frame: Frame) {
        self.state.lock().outbox.push_back(Pending {
            frame,
            ready_at: Instant::now(),
        });
    }

    /// Every frame the tester transmitted
    pub fn sent_frames(&self) -> Vec<Frame> {
        self.sent.lock().clone()
    }

    /// Number of `recv` calls made so far
    pub fn recv_calls(&self) -> usize {
        self.recv_calls.load(Ordering::SeqCst)
    }

    fn default_responses() -> Vec<(Vec<u8>, Vec<u8>)> {
        vec![
            // Start Diagnostic Session (0x10 81/85/87 -> 0x50 ..)
            (vec![0x10, 0x81], vec![0x50, 0x81]),
            (vec![0x10, 0x85], vec![0x50, 0x85]),
            (vec![0x10, 0x87], vec![0x50, 0x87]),
            // ECU Reset
            (vec![0x11, 0x01], vec![0x51]),
            // Tester Present, response required
            (vec![0x3E, 0x01], vec![0x7E]),
            // Clear DTCs, all groups
            (vec![0x14, 0xFF, 0x00], vec![0x54, 0xFF, 0x00]),
            // Read DTCs by status: one stored P0123
            (vec![0x18], vec![0x58, 0x01, 0x01, 0x23, 0xE0]),
            // VIN, multi-frame
            (vec![0x22, 0xF1, 0x90], {
                let mut resp = vec![0x62, 0xF1, 0x90];
                resp.extend_from_slice(b"1FMCU0GD5HUA12345");
                resp
            }),
            // Security Access: zero seed, module already unlocked
            (vec![0x27, 0x01], vec![0x67, 0x01, 0x00, 0x00, 0x00]),
        ]
    }

    fn find_response(&self, request: &[u8]) -> Option<Vec<u8>> {
        let responses = self.responses.read();

        // First try exact match
        if let Some((_, resp)) = responses.iter().find(|(req, _)| req == request) {
            return Some(resp.clone());
        }

        // Then try prefix match for variable-length requests
        responses
            .iter()
            .find(|(req, _)| request.starts_with(req))
            .map(|(_, resp)| resp.clone())
    }

    fn reply_frame(&self, state: &mut EcuState, id: u16, data: &[u8]) -> Result<(), BusError> {
        let frame = Frame::padded(id, data, 0x00)?;
        state.outbox.push_back(Pending {
            frame,
            ready_at: Instant::now() + Duration::from_millis(self.config.latency_ms),
        });
        Ok(())
    }

    /// Segment `response` into the outbox and the held queue
    fn respond(&self, state: &mut EcuState, id: u16, response: &[u8]) -> Result<(), BusError> {
        if response.is_empty() {
            return Ok(());
        }

        if response.len() <= SINGLE_FRAME_MAX {
            return self.reply_frame(state, id, &single_frame(response));
        }

        self.reply_frame(state, id, &first_frame(response))?;
        state.held.clear();
        for (index, chunk) in response[FIRST_FRAME_DATA..]
            .chunks(CONSECUTIVE_FRAME_DATA)
            .enumerate()
        {
            let sequence = ((index + 1) & 0x0F) as u8;
            state
                .held
                .push_back(Frame::padded(id, &consecutive_frame(sequence, chunk), 0x00)?);
        }
        Ok(())
    }

    /// Act on one frame sent by the tester to a simulated ECU
    fn on_request_frame(&self, response_id: u16, data: &[u8]) -> Result<(), BusError> {
        let mut state = self.state.lock();

        if let Some(FrameKind::FlowControl) = data.first().and_then(|pci| FrameKind::from_pci(*pci))
        {
            if let Some(flow) = FlowControl::parse(data) {
                let release = match flow.block_size {
                    0 => state.held.len(),
                    bs => state.held.len().min(bs as usize),
                };
                for _ in 0..release {
                    if let Some(frame) = state.held.pop_front() {
                        let frame_data = frame.data().to_vec();
                        self.reply_frame(&mut state, response_id, &frame_data)?;
                    }
                }
            }
            return Ok(());
        }

        match state.rx.on_frame(data) {
            RxEvent::Complete(request) => {
                state.rx_block_count = 0;
                if let Some(response) = self.find_response(&request) {
                    self.respond(&mut state, response_id, &response)?;
                }
            }
            RxEvent::FlowControlRequired => {
                state.rx_block_count = 0;
                self.reply_frame(
                    &mut state,
                    response_id,
                    &flow_control_frame(self.config.block_size, self.config.st_min),
                )?;
            }
            RxEvent::Pending => {
                state.rx_block_count = state.rx_block_count.wrapping_add(1);
                if self.config.block_size != 0 && state.rx_block_count == self.config.block_size {
                    state.rx_block_count = 0;
                    self.reply_frame(
                        &mut state,
                        response_id,
                        &flow_control_frame(self.config.block_size, self.config.st_min),
                    )?;
                }
            }
            RxEvent::SequenceError { .. } | RxEvent::Ignored => {}
        }
        Ok(())
    }
}

#[async_trait]
impl CanBus for MockBus {
    async fn send(&self, frame: &Frame) -> Result<(), BusError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }

        self.sent.lock().push(*frame);
        tracing::trace!(?frame, "Mock bus: frame sent");

        let response_id = self.ecus.read().get(&frame.id()).copied();
        match response_id {
            Some(response_id) => self.on_request_frame(response_id, frame.data()),
            None => Ok(()),
        }
    }

    async fn recv(&self, timeout: Duration) -> Result<Option<Frame>, BusError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        self.recv_calls.fetch_add(1, Ordering::SeqCst);

        let deadline = Instant::now() + timeout;
        let ready_at = self.state.lock().outbox.front().map(|p| p.ready_at);

        match ready_at {
            Some(ready_at) if ready_at <= deadline => {
                sleep(ready_at.saturating_duration_since(Instant::now())).await;
                Ok(self.state.lock().outbox.pop_front().map(|p| p.frame))
            }
            _ => {
                sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn shutdown(&self) -> Result<(), BusError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}
