//! Command implementations for gds-cli

mod modules;
mod raw;

pub use modules::modules;
pub use raw::raw;

/// Byte string given on the command line as hex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(Vec<u8>);

impl HexBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Parse hex bytes; accepts "0A1B", "0x0A1B" and "0A 1B"
pub fn parse_hex(s: &str) -> Result<HexBytes, String> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let digits: String = s.split_whitespace().collect();
    hex::decode(&digits)
        .map(HexBytes)
        .map_err(|e| format!("invalid hex '{}': {}", s, e))
}

fn parse_int(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|_| format!("invalid number '{}' (use decimal or 0x-prefixed hex)", s))
}

pub fn parse_u8(s: &str) -> Result<u8, String> {
    u8::try_from(parse_int(s)?).map_err(|_| format!("'{}' does not fit in one byte", s))
}

pub fn parse_u16(s: &str) -> Result<u16, String> {
    u16::try_from(parse_int(s)?).map_err(|_| format!("'{}' does not fit in two bytes", s))
}

pub fn parse_u32(s: &str) -> Result<u32, String> {
    u32::try_from(parse_int(s)?).map_err(|_| format!("'{}' does not fit in four bytes", s))
}
