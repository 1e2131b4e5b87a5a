//! SocketCAN adapter on a raw classic-CAN socket

use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use socketcan::{CanFrame, CanSocket, EmbeddedFrame, Id, Socket, StandardId};

use crate::bus::{BusError, CanBus, Frame};
use crate::config::SocketCanConfig;

/// Raw CAN socket bound to one interface
///
/// Blocking socket calls run on the blocking thread pool; the socket read
/// timeout bounds each receive.
pub struct SocketCanBus {
    interface: String,
    socket: Arc<Mutex<CanSocket>>,
    open: AtomicBool,
}

impl SocketCanBus {
    pub async fn open(config: &SocketCanConfig) -> Result<Self, BusError> {
        let interface = config.interface.clone();
        let socket = {
            let iface = interface.clone();
            tokio::task::spawn_blocking(move || CanSocket::open(&iface))
                .await
                .map_err(|e| BusError::Open(format!("Task join error: {}", e)))?
                .map_err(|e| {
                    BusError::Open(format!("Failed to open CAN socket on {}: {}", interface, e))
                })?
        };

        tracing::info!(interface = %interface, "SocketCAN bus opened");

        Ok(Self {
            interface,
            socket: Arc::new(Mutex::new(socket)),
            open: AtomicBool::new(true),
        })
    }

    fn ensure_open(&self) -> Result<(), BusError> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BusError::Closed)
        }
    }
}

#[async_trait]
impl CanBus for SocketCanBus {
    async fn send(&self, frame: &Frame) -> Result<(), BusError> {
        self.ensure_open()?;

        let id = StandardId::new(frame.id())
            .ok_or_else(|| BusError::InvalidFrame(format!("Invalid CAN ID: 0x{:X}", frame.id())))?;
        let can_frame = CanFrame::new(id, frame.data())
            .ok_or_else(|| BusError::InvalidFrame(format!("Invalid frame: {:?}", frame)))?;

        let socket = self.socket.clone();
        tokio::task::spawn_blocking(move || {
            let socket_guard = socket.lock();
            socket_guard
                .write_frame(&can_frame)
                .map_err(|e| BusError::Send(e.to_string()))
        })
        .await
        .map_err(|e| BusError::Send(format!("Task join error: {}", e)))?
    }

    async fn recv(&self, timeout: Duration) -> Result<Option<Frame>, BusError> {
        self.ensure_open()?;

        // A zero read timeout would mean "block forever" to the kernel
        let timeout = timeout.max(Duration::from_millis(1));
        let socket = self.socket.clone();

        tokio::task::spawn_blocking(move || {
            let socket_guard = socket.lock();
            socket_guard
                .set_read_timeout(timeout)
                .map_err(|e| BusError::Receive(format!("Failed to set read timeout: {}", e)))?;

            match socket_guard.read_frame() {
                Ok(CanFrame::Data(data_frame)) => match data_frame.id() {
                    Id::Standard(id) => Frame::new(id.as_raw(), data_frame.data()).map(Some),
                    // Extended ids are never diagnostic traffic here
                    Id::Extended(_) => Ok(None),
                },
                Ok(_) => Ok(None),
                Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    Ok(None)
                }
                Err(e) => Err(BusError::Receive(e.to_string())),
            }
        })
        .await
        .map_err(|e| BusError::Receive(format!("Task join error: {}", e)))?
    }

    async fn shutdown(&self) -> Result<(), BusError> {
        self.open.store(false, Ordering::SeqCst);
        tracing::info!(interface = %self.interface, "SocketCAN bus closed");
        Ok(())
    }
}
