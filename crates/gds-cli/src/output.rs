//! Output formatting for gds-cli (table, json)

use clap::ValueEnum;
use colored::Colorize;
use gds_core::DiagnosticOutcome;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print an info message (unless in quiet mode or emitting JSON)
    pub fn info(&self, msg: &str) {
        if !self.quiet && self.format == OutputFormat::Table {
            println!("{}", msg);
        }
    }

    /// Print rows in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
    }

    /// Print a service outcome; returns true for success
    pub fn outcome(&self, outcome: &DiagnosticOutcome) -> bool {
        let success = outcome.is_success();
        match self.format {
            OutputFormat::Table => {
                let line = outcome.to_string();
                if success {
                    if self.quiet {
                        if let Some(payload) = outcome.payload() {
                            println!("{}", hex::encode_upper(payload));
                        }
                    } else {
                        println!("{}", line.green());
                    }
                } else {
                    eprintln!("{}", line.red());
                }
            }
            OutputFormat::Json => {
                let record = OutcomeRecord::from(outcome);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        success
    }
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// Module display for modules command
#[derive(Debug, Tabled, Serialize)]
pub struct ModuleRow {
    #[tabled(rename = "Module")]
    pub name: String,
    #[tabled(rename = "Request ID")]
    pub request_id: String,
    #[tabled(rename = "Response ID")]
    pub response_id: String,
}

/// JSON shape of a service outcome
#[derive(Debug, Serialize)]
pub struct OutcomeRecord {
    pub success: bool,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nrc: Option<u8>,
}

impl From<&DiagnosticOutcome> for OutcomeRecord {
    fn from(outcome: &DiagnosticOutcome) -> Self {
        Self {
            success: outcome.is_success(),
            outcome: outcome.to_string(),
            payload: outcome.payload().map(hex::encode_upper),
            nrc: outcome.nrc().map(u8::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gds_core::NrcCode;

    #[test]
    fn test_outcome_record() {
        let record = OutcomeRecord::from(&DiagnosticOutcome::Success(vec![0xAA, 0x01]));
        assert!(record.success);
        assert_eq!(record.payload.as_deref(), Some("AA01"));

        let record = OutcomeRecord::from(&DiagnosticOutcome::NegativeResponse(
            NrcCode::SecurityAccessDenied,
        ));
        assert!(!record.success);
        assert_eq!(record.nrc, Some(0x33));
        assert_eq!(record.payload, None);
    }
}
