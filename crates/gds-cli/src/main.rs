//! GDS CLI - run single diagnostic services against a vehicle module
//!
//! Talks KWP2000 over ISO-TP on a SocketCAN interface (or the built-in
//! simulated ECU with `--mock`).

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gds_core::{GdsClient, SessionKind};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::HexBytes;
use crate::config::{load_config, Overrides};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "gds-cli")]
#[command(author, version, about = "Ford GDS style diagnostics over CAN")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GDS_CONFIG")]
    config: Option<PathBuf>,

    /// CAN interface (overrides the config file)
    #[arg(short, long, env = "GDS_INTERFACE")]
    interface: Option<String>,

    /// Use the simulated ECU instead of a CAN interface
    #[arg(long, conflicts_with = "interface")]
    mock: bool,

    /// Module to address
    #[arg(short, long, env = "GDS_MODULE", default_value = "PCM")]
    module: String,

    /// Response timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging (frame trace)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SessionArg {
    Diagnostic,
    Programming,
    Adjustment,
}

impl From<SessionArg> for SessionKind {
    fn from(arg: SessionArg) -> Self {
        match arg {
            SessionArg::Diagnostic => SessionKind::Diagnostic,
            SessionArg::Programming => SessionKind::Programming,
            SessionArg::Adjustment => SessionKind::Adjustment,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List known modules and their CAN ids
    Modules,

    /// Start a diagnostic session
    Session {
        #[arg(value_enum)]
        kind: SessionArg,
    },

    /// Reset the module
    Reset,

    /// Clear all stored DTCs
    ClearDtc,

    /// Read DTCs by status
    ReadDtc {
        /// Status byte
        #[arg(long, default_value = "0x00", value_parser = commands::parse_u8)]
        status: u8,

        /// DTC group
        #[arg(long, default_value = "0xFF00", value_parser = commands::parse_u16)]
        group: u16,
    },

    /// Read data by common identifier
    ReadDid {
        #[arg(value_parser = commands::parse_u16)]
        did: u16,
    },

    /// Write data by common identifier (value as hex, at most 4 bytes)
    WriteDid {
        #[arg(value_parser = commands::parse_u16)]
        did: u16,
        #[arg(value_parser = commands::parse_hex)]
        value: HexBytes,
    },

    /// Read data by local identifier
    ReadLocal {
        #[arg(value_parser = commands::parse_u8)]
        id: u8,
    },

    /// Write data by local identifier (value as hex, at most 5 bytes)
    WriteLocal {
        #[arg(value_parser = commands::parse_u8)]
        id: u8,
        #[arg(value_parser = commands::parse_hex)]
        value: HexBytes,
    },

    /// Read memory by address
    ReadMemory {
        #[arg(value_parser = commands::parse_u32)]
        address: u32,
        #[arg(value_parser = commands::parse_u16)]
        length: u16,
    },

    /// Input/output control by common identifier
    IoControl {
        #[arg(value_parser = commands::parse_u16)]
        did: u16,

        /// Control type (0x00 return control, 0x05 freeze, 0x07 adjust)
        #[arg(value_parser = commands::parse_u8)]
        control_type: u8,

        /// Control data: an integer ("0x1F", "31") or hex bytes ("01 1F")
        data: String,
    },

    /// Keep the session alive
    TesterPresent {
        /// Suppress the module's reply
        #[arg(long)]
        no_response: bool,
    },

    /// Request a security access seed
    Seed,

    /// Send a precomputed security access key
    SendKey {
        #[arg(value_parser = commands::parse_hex)]
        key: HexBytes,
    },

    /// Send a raw payload (hex, starting with the SID) and print the reply
    Raw {
        #[arg(value_parser = commands::parse_hex)]
        payload: HexBytes,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("warn,gds_core=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let ctx = OutputContext::new(cli.output, cli.no_color, cli.quiet);

    let config = load_config(
        cli.config.as_ref(),
        &Overrides {
            interface: cli.interface.clone(),
            mock: cli.mock,
            timeout_ms: cli.timeout_ms,
        },
    )?;
    tracing::debug!(bus = ?config.bus, "Configuration loaded");

    let mut client = GdsClient::connect(&config)
        .await
        .context("Failed to open CAN bus")?;

    if !matches!(cli.command, Commands::Modules) {
        client
            .select_module(&cli.module)
            .with_context(|| format!("Cannot address module '{}'", cli.module))?;
    }

    let outcome = match &cli.command {
        Commands::Modules => {
            commands::modules(&client, &ctx);
            return Ok(());
        }
        Commands::Session { kind } => client.start_session((*kind).into()).await?,
        Commands::Reset => client.ecu_reset().await?,
        Commands::ClearDtc => client.clear_dtc().await?,
        Commands::ReadDtc { status, group } => client.read_dtc_by_status(*status, *group).await?,
        Commands::ReadDid { did } => client.read_data_by_identifier(*did).await?,
        Commands::WriteDid { did, value } => {
            client
                .write_data_by_identifier(*did, value.as_bytes())
                .await?
        }
        Commands::ReadLocal { id } => client.read_data_by_local_identifier(*id).await?,
        Commands::WriteLocal { id, value } => {
            client.write_data_by_local_identifier(*id, value.as_bytes()).await?
        }
        Commands::ReadMemory { address, length } => {
            client.read_memory_by_address(*address, *length).await?
        }
        Commands::IoControl {
            did,
            control_type,
            data,
        } => {
            client
                .io_control_by_identifier(*did, *control_type, data.as_str())
                .await?
        }
        Commands::TesterPresent { no_response } => client.tester_present(!no_response).await?,
        Commands::Seed => client.request_seed().await?,
        Commands::SendKey { key } => client.send_key(key.as_bytes()).await?,
        Commands::Raw { payload } => commands::raw(&mut client, payload.as_bytes(), &ctx).await?,
    };

    client.close().await?;

    if !ctx.outcome(&outcome) {
        std::process::exit(1);
    }
    Ok(())
}
