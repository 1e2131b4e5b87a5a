//! Infrastructure errors of the diagnostic client
//!
//! Protocol outcomes (negative responses, timeouts, malformed replies) are
//! not errors; they come back as [`DiagnosticOutcome`](crate::DiagnosticOutcome)
//! values. `GdsError` is reserved for failures the caller cannot retry
//! through the protocol.

use thiserror::Error;

use crate::bus::BusError;
use crate::config::ConfigError;
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum GdsError {
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("No module selected")]
    ModuleNotSelected,

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Registry error: {0}")]
    Registry(RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<RegistryError> for GdsError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownModule(name) => Self::UnknownModule(name),
            other => Self::Registry(other),
        }
    }
}
