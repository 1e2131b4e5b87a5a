//! Security access (0x27) seed/key handshake
//!
//! The key algorithm is vehicle specific and not part of this crate. Callers
//! either compute the key themselves and use [`GdsClient::send_key`], or plug
//! an algorithm in through [`KeyDerivation`] and call [`GdsClient::unlock`].

use tracing::{info, warn};

use crate::client::GdsClient;
use crate::error::GdsError;
use crate::kwp::{DiagnosticOutcome, ServiceRequest};

/// Seed to key algorithm for one module family
pub trait KeyDerivation: Send + Sync {
    /// Compute the key for `seed`, or `None` if this module is unsupported
    fn derive_key(&self, seed: &[u8]) -> Option<Vec<u8>>;
}

/// Placeholder that knows no algorithm
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeyDerivation;

impl KeyDerivation for NoKeyDerivation {
    fn derive_key(&self, _seed: &[u8]) -> Option<Vec<u8>> {
        None
    }
}

impl<F> KeyDerivation for F
where
    F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync,
{
    fn derive_key(&self, seed: &[u8]) -> Option<Vec<u8>> {
        self(seed)
    }
}

impl GdsClient {
    /// Security Access, request seed (0x27 01)
    ///
    /// Output is the seed bytes.
    pub async fn request_seed(&mut self) -> Result<DiagnosticOutcome, GdsError> {
        self.exchange(&ServiceRequest::request_seed()).await
    }

    /// Security Access, send key (0x27 02)
    ///
    /// The key is not checked here; the ECU answers `InvalidKey` if wrong.
    pub async fn send_key(&mut self, key: &[u8]) -> Result<DiagnosticOutcome, GdsError> {
        let request = match ServiceRequest::send_key(key) {
            Ok(request) => request,
            Err(err) => return Ok(err.into()),
        };
        let outcome = self.exchange(&request).await?;
        if outcome.is_success() {
            info!("Security access granted");
            self.session.security_unlocked = true;
        }
        Ok(outcome)
    }

    /// Full handshake: seed, derive, key
    ///
    /// An empty or all-zero seed means the module is already unlocked and no
    /// key is sent. `NotYetImplemented` if `derivation` has no key for the seed.
    pub async fn unlock(
        &mut self,
        derivation: &dyn KeyDerivation,
    ) -> Result<DiagnosticOutcome, GdsError> {
        let seed = match self.request_seed().await? {
            DiagnosticOutcome::Success(seed) => seed,
            other => return Ok(other),
        };

        if seed.iter().all(|b| *b == 0) {
            info!("Zero seed, module already unlocked");
            self.session.security_unlocked = true;
            return Ok(DiagnosticOutcome::Success(Vec::new()));
        }

        match derivation.derive_key(&seed) {
            Some(key) => self.send_key(&key).await,
            None => {
                warn!(seed = %hex::encode_upper(&seed), "No key derivation for seed");
                Ok(DiagnosticOutcome::NotYetImplemented)
            }
        }
    }
}
