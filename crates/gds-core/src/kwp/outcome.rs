//! Typed result of a diagnostic service call

use std::fmt;

use thiserror::Error;

use super::NrcCode;

/// Outcome of one service exchange
///
/// Protocol-level outcomes (timeouts, malformed replies, ECU rejections) are
/// values, kept apart from the NRC byte space so the two never collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticOutcome {
    /// Positive response; carries the bytes after the echoed header
    Success(Vec<u8>),
    /// Nothing matching arrived before the deadline
    NoResponse,
    /// A reply arrived but matched neither the positive nor negative shape
    UnexpectedResponse,
    /// Caller input had an unusable shape
    InvalidArgument,
    /// Operation depends on a collaborator that is not available
    NotYetImplemented,
    /// ECU rejected the request, or the request failed a range check
    NegativeResponse(NrcCode),
}

impl DiagnosticOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Payload of a successful outcome
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Success(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn into_payload(self) -> Option<Vec<u8>> {
        match self {
            Self::Success(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn nrc(&self) -> Option<NrcCode> {
        match self {
            Self::NegativeResponse(nrc) => Some(*nrc),
            _ => None,
        }
    }
}

impl fmt::Display for DiagnosticOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(payload) if payload.is_empty() => write!(f, "Success"),
            Self::Success(payload) => write!(f, "Success ({})", hex::encode_upper(payload)),
            Self::NoResponse => write!(f, "No Response"),
            Self::UnexpectedResponse => write!(f, "Unexpected Response"),
            Self::InvalidArgument => write!(f, "Invalid Argument"),
            Self::NotYetImplemented => write!(f, "Not Yet Implemented"),
            Self::NegativeResponse(nrc) => write!(f, "{}", nrc),
        }
    }
}

/// Request rejected before anything was sent
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    #[error("parameter out of range")]
    OutOfRange,

    #[error("invalid argument")]
    InvalidArgument,
}

impl From<RequestError> for DiagnosticOutcome {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::OutOfRange => Self::NegativeResponse(NrcCode::RequestOutOfRange),
            RequestError::InvalidArgument => Self::InvalidArgument,
        }
    }
}
