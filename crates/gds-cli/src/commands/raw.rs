//! Raw command - manual request/response exchange

use anyhow::Result;
use gds_core::{DiagnosticOutcome, GdsClient};

use crate::output::OutputContext;

/// Send `payload` as-is and return whatever comes back
///
/// The reply is not classified; any complete payload counts as success.
pub async fn raw(
    client: &mut GdsClient,
    payload: &[u8],
    ctx: &OutputContext,
) -> Result<DiagnosticOutcome> {
    ctx.info(&format!("Sending {}", hex::encode_upper(payload)));

    let sent = client.send_raw(payload).await?;
    if !sent.is_success() {
        return Ok(sent);
    }

    Ok(match client.receive_raw(None).await? {
        Some(reply) => DiagnosticOutcome::Success(reply),
        None => DiagnosticOutcome::NoResponse,
    })
}
