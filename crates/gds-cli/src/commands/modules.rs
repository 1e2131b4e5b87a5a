//! Modules command - show the module table

use gds_core::GdsClient;

use crate::output::{ModuleRow, OutputContext};

/// List the modules the client can address
pub fn modules(client: &GdsClient, ctx: &OutputContext) {
    let rows: Vec<ModuleRow> = client
        .registry()
        .modules()
        .iter()
        .map(|m| ModuleRow {
            name: m.name.clone(),
            request_id: format!("0x{:03X}", m.request_id),
            response_id: format!("0x{:03X}", m.response_id),
        })
        .collect();

    ctx.print(&rows);
}
