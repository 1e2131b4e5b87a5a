//! Negative Response Codes (NRC)

use std::fmt;

/// Reason byte of a negative response (`7F <sid> <nrc>`)
///
/// Values without a named variant are kept verbatim in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NrcCode {
    GeneralReject,
    ServiceNotSupported,
    InvalidFormat,
    ConditionsNotCorrect,
    RequestOutOfRange,
    SecurityAccessDenied,
    InvalidKey,
    Other(u8),
}

impl From<u8> for NrcCode {
    fn from(value: u8) -> Self {
        match value {
            0x10 => Self::GeneralReject,
            0x11 => Self::ServiceNotSupported,
            0x12 => Self::InvalidFormat,
            0x22 => Self::ConditionsNotCorrect,
            0x31 => Self::RequestOutOfRange,
            0x33 => Self::SecurityAccessDenied,
            0x35 => Self::InvalidKey,
            other => Self::Other(other),
        }
    }
}

impl From<NrcCode> for u8 {
    fn from(nrc: NrcCode) -> Self {
        match nrc {
            NrcCode::GeneralReject => 0x10,
            NrcCode::ServiceNotSupported => 0x11,
            NrcCode::InvalidFormat => 0x12,
            NrcCode::ConditionsNotCorrect => 0x22,
            NrcCode::RequestOutOfRange => 0x31,
            NrcCode::SecurityAccessDenied => 0x33,
            NrcCode::InvalidKey => 0x35,
            NrcCode::Other(v) => v,
        }
    }
}

impl fmt::UpperHex for NrcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value: u8 = (*self).into();
        fmt::UpperHex::fmt(&value, f)
    }
}

impl fmt::Display for NrcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeneralReject => write!(f, "General Reject"),
            Self::ServiceNotSupported => write!(f, "Service Not Supported"),
            Self::InvalidFormat => write!(f, "Invalid Format"),
            Self::ConditionsNotCorrect => write!(f, "Conditions Not Correct"),
            Self::RequestOutOfRange => write!(f, "Request Out Of Range"),
            Self::SecurityAccessDenied => write!(f, "Security Access Denied"),
            Self::InvalidKey => write!(f, "Invalid Key"),
            Self::Other(v) => write!(f, "Other Negative Response (0x{:02X})", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x10, NrcCode::GeneralReject)]
    #[case(0x11, NrcCode::ServiceNotSupported)]
    #[case(0x12, NrcCode::InvalidFormat)]
    #[case(0x22, NrcCode::ConditionsNotCorrect)]
    #[case(0x31, NrcCode::RequestOutOfRange)]
    #[case(0x33, NrcCode::SecurityAccessDenied)]
    #[case(0x35, NrcCode::InvalidKey)]
    #[case(0x99, NrcCode::Other(0x99))]
    #[case(0x78, NrcCode::Other(0x78))]
    fn test_nrc_byte_mapping(#[case] byte: u8, #[case] nrc: NrcCode) {
        assert_eq!(NrcCode::from(byte), nrc);
        assert_eq!(u8::from(nrc), byte);
    }

    #[test]
    fn test_nrc_display() {
        assert_eq!(NrcCode::RequestOutOfRange.to_string(), "Request Out Of Range");
        assert_eq!(
            NrcCode::Other(0x99).to_string(),
            "Other Negative Response (0x99)"
        );
        assert_eq!(format!("{:02X}", NrcCode::InvalidKey), "35");
    }
}
