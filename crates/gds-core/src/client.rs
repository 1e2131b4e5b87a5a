//! Diagnostic client: module selection plus the request/response exchange
//! every service call is built on

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::bus::{create_bus, CanBus};
use crate::config::{GdsConfig, ServiceConfig};
use crate::error::GdsError;
use crate::isotp::{IsoTpTransport, TransportError};
use crate::kwp::{classify, DiagnosticOutcome, NrcCode, ServiceRequest};
use crate::logging::{FrameLogger, TracingFrameLogger};
use crate::registry::{ModuleAddress, ModuleRegistry};
use crate::session::SessionState;

/// Client for one diagnostic bus
///
/// Every call takes `&mut self`, so a client has at most one exchange in
/// flight. Use one client per bus and share it behind a mutex if several
/// tasks need it.
pub struct GdsClient {
    pub(crate) bus: Arc<dyn CanBus>,
    pub(crate) registry: Arc<ModuleRegistry>,
    pub(crate) transport: IsoTpTransport,
    pub(crate) services: ServiceConfig,
    pub(crate) logger: Arc<dyn FrameLogger>,
    pub(crate) module: Option<ModuleAddress>,
    pub(crate) session: SessionState,
}

impl GdsClient {
    /// Create a client on an existing bus, logging frames through `tracing`
    pub fn new(bus: Arc<dyn CanBus>, config: &GdsConfig) -> Result<Self, GdsError> {
        let registry = Arc::new(ModuleRegistry::from_config(
            &config.modules,
            &config.broadcast,
        )?);
        let logger = Arc::new(TracingFrameLogger::new(registry.clone()));
        Ok(Self::with_parts(bus, registry, logger, config))
    }

    /// Create a client with an explicit registry and frame logger
    pub fn with_parts(
        bus: Arc<dyn CanBus>,
        registry: Arc<ModuleRegistry>,
        logger: Arc<dyn FrameLogger>,
        config: &GdsConfig,
    ) -> Self {
        let transport = IsoTpTransport::new(bus.clone(), config.transport.clone(), logger.clone());
        Self {
            bus,
            registry,
            transport,
            services: config.services.clone(),
            logger,
            module: None,
            session: SessionState::default(),
        }
    }

    /// Open the configured bus and create a client on it
    pub async fn connect(config: &GdsConfig) -> Result<Self, GdsError> {
        let bus = create_bus(&config.bus).await?;
        Self::new(bus, config)
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Address subsequent requests to `name`
    ///
    /// Session and transfer bookkeeping belong to the previous module and are
    /// cleared.
    pub fn select_module(&mut self, name: &str) -> Result<(), GdsError> {
        let module = self.registry.resolve(name)?.clone();
        info!(
            module = %module.name,
            request_id = format_args!("0x{:03X}", module.request_id),
            response_id = format_args!("0x{:03X}", module.response_id),
            "Module selected"
        );
        self.module = Some(module);
        self.session.clear();
        Ok(())
    }

    pub fn current_module(&self) -> Option<&ModuleAddress> {
        self.module.as_ref()
    }

    /// Bookkeeping for the selected module
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Write a free-text line to the frame log
    pub fn log_text(&self, line: &str) {
        self.logger.log_text(line);
    }

    /// Send an arbitrary payload (`[SID, params...]`) to the selected module
    ///
    /// Returns `Success` with no payload once the frames are on the bus.
    pub async fn send_raw(&mut self, payload: &[u8]) -> Result<DiagnosticOutcome, GdsError> {
        let module = self.selected()?;
        match self.transport.send(module, payload).await {
            Ok(()) => Ok(DiagnosticOutcome::Success(Vec::new())),
            Err(err) => transport_outcome(err),
        }
    }

    /// Receive one payload from the selected module
    ///
    /// `None` uses the configured response timeout. Returns `Ok(None)` when
    /// nothing complete arrived.
    pub async fn receive_raw(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Option<Vec<u8>>, GdsError> {
        let module = self.selected()?;
        let timeout = timeout.unwrap_or_else(|| self.transport.config().response_timeout());
        match self.transport.receive(module, timeout).await {
            Ok(payload) => Ok(Some(payload)),
            Err(TransportError::Bus(err)) => Err(err.into()),
            Err(_) => Ok(None),
        }
    }

    /// Shut the bus down
    pub async fn close(&mut self) -> Result<(), GdsError> {
        self.bus.shutdown().await?;
        self.module = None;
        self.session.clear();
        Ok(())
    }

    fn selected(&self) -> Result<&ModuleAddress, GdsError> {
        self.module.as_ref().ok_or(GdsError::ModuleNotSelected)
    }

    /// Send a request and classify the reply
    pub(crate) async fn exchange(
        &self,
        request: &ServiceRequest,
    ) -> Result<DiagnosticOutcome, GdsError> {
        let module = self.selected()?;
        debug!(
            module = %module.name,
            sid = format_args!("0x{:02X}", request.sid()),
            "Sending request"
        );

        if let Err(err) = self.transport.send(module, &request.payload()).await {
            return transport_outcome(err);
        }

        let timeout = self.transport.config().response_timeout();
        match self.transport.receive(module, timeout).await {
            Ok(response) => Ok(classify(request, &response)),
            Err(err) => transport_outcome(err),
        }
    }

    /// Send a request that gets no reply
    pub(crate) async fn send_only(
        &self,
        request: &ServiceRequest,
    ) -> Result<DiagnosticOutcome, GdsError> {
        let module = self.selected()?;
        match self.transport.send(module, &request.payload()).await {
            Ok(()) => Ok(DiagnosticOutcome::Success(Vec::new())),
            Err(err) => transport_outcome(err),
        }
    }
}

/// Fold transport failures into outcomes; only bus I/O stays an error
fn transport_outcome(err: TransportError) -> Result<DiagnosticOutcome, GdsError> {
    match err {
        TransportError::NoResponse | TransportError::SequenceError { .. } => {
            Ok(DiagnosticOutcome::NoResponse)
        }
        TransportError::PayloadTooLong(_) => Ok(DiagnosticOutcome::NegativeResponse(
            NrcCode::RequestOutOfRange,
        )),
        TransportError::Bus(err) => Err(err.into()),
    }
}
