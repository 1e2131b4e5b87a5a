//! Control data for input/output control by common identifier

use std::convert::Infallible;

use super::RequestError;

/// Largest integer accepted as control data (three bytes)
pub const MAX_CONTROL_INTEGER: u32 = 0xFF_FFFF;

/// Control bytes that fit after DID and control type in one frame
pub const MAX_CONTROL_BYTES: usize = 3;

/// Control data as either raw bytes or an integer sent big-endian
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlData {
    ByteSequence(Vec<u8>),
    Integer(u32),
}

impl ControlData {
    /// Resolve to wire bytes, enforcing the three-byte budget
    ///
    /// Integers use the minimal big-endian width (zero is one byte).
    pub fn to_bytes(&self) -> Result<Vec<u8>, RequestError> {
        let bytes = match self {
            Self::ByteSequence(bytes) => bytes.clone(),
            Self::Integer(value) => {
                if *value > MAX_CONTROL_INTEGER {
                    return Err(RequestError::OutOfRange);
                }
                let be = value.to_be_bytes();
                let skip = be.iter().take(3).take_while(|b| **b == 0).count();
                be[skip..].to_vec()
            }
        };

        if bytes.len() > MAX_CONTROL_BYTES {
            return Err(RequestError::OutOfRange);
        }
        Ok(bytes)
    }
}

impl From<Vec<u8>> for ControlData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::ByteSequence(bytes)
    }
}

impl From<&[u8]> for ControlData {
    fn from(bytes: &[u8]) -> Self {
        Self::ByteSequence(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for ControlData {
    fn from(bytes: [u8; N]) -> Self {
        Self::ByteSequence(bytes.to_vec())
    }
}

impl From<u32> for ControlData {
    fn from(value: u32) -> Self {
        Self::Integer(value)
    }
}

impl TryFrom<i64> for ControlData {
    type Error = RequestError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u32::try_from(value) {
            Ok(v) => Ok(Self::Integer(v)),
            Err(_) if value < 0 => Err(RequestError::InvalidArgument),
            Err(_) => Err(RequestError::OutOfRange),
        }
    }
}

/// Parse text input
///
/// `0x1F` or `31` is an integer; `01 02 03` (space separated hex) is a byte
/// sequence.
impl TryFrom<&str> for ControlData {
    type Error = RequestError;

    fn try_from(text: &str) -> Result<Self, Self::Error> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RequestError::InvalidArgument);
        }

        if text.contains(char::is_whitespace) {
            return text
                .split_whitespace()
                .map(|b| u8::from_str_radix(b, 16))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::ByteSequence)
                .map_err(|_| RequestError::InvalidArgument);
        }

        let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => text.parse::<u64>(),
        }
        .map_err(|_| RequestError::InvalidArgument)?;

        u32::try_from(parsed)
            .map(Self::Integer)
            .map_err(|_| RequestError::OutOfRange)
    }
}

/// Conversion used at the service boundary
pub(crate) fn resolve<C, E>(input: C) -> Result<ControlData, RequestError>
where
    C: TryInto<ControlData, Error = E>,
    E: Into<RequestError>,
{
    input.try_into().map_err(Into::into)
}

impl From<Infallible> for RequestError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
