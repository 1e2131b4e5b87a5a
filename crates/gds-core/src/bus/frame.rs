//! Classic CAN frame with an 11-bit identifier

use std::fmt;

use super::BusError;

/// Highest 11-bit arbitration id
pub const MAX_STANDARD_ID: u16 = 0x7FF;

/// Data bytes carried by a classic CAN frame
pub const FRAME_LEN: usize = 8;

/// A classic CAN frame (standard id, up to 8 data bytes)
///
/// Frames built for transmission are always padded to the full 8 bytes.
/// Received frames keep whatever length the bus reported.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    id: u16,
    data: [u8; FRAME_LEN],
    len: usize,
}

impl Frame {
    /// Create a frame with exactly the given bytes (no padding)
    pub fn new(id: u16, data: &[u8]) -> Result<Self, BusError> {
        if id > MAX_STANDARD_ID {
            return Err(BusError::InvalidFrame(format!(
                "id 0x{:X} exceeds 11 bits",
                id
            )));
        }
        if data.len() > FRAME_LEN {
            return Err(BusError::InvalidFrame(format!(
                "{} data bytes exceed frame capacity",
                data.len()
            )));
        }

        let mut buf = [0u8; FRAME_LEN];
        buf[..data.len()].copy_from_slice(data);
        Ok(Self {
            id,
            data: buf,
            len: data.len(),
        })
    }

    /// Create a frame padded with `pad` up to 8 data bytes
    pub fn padded(id: u16, data: &[u8], pad: u8) -> Result<Self, BusError> {
        let mut frame = Self::new(id, data)?;
        for byte in frame.data[data.len()..].iter_mut() {
            *byte = pad;
        }
        frame.len = FRAME_LEN;
        Ok(frame)
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(0x{:03X} [", self.id)?;
        for (i, byte) in self.data().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_frame_is_full_length() {
        let frame = Frame::padded(0x7E0, &[0x02, 0x10, 0x81], 0x00).unwrap();
        assert_eq!(frame.len(), 8);
        assert_eq!(frame.data(), &[0x02, 0x10, 0x81, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_short_frame_keeps_length() {
        let frame = Frame::new(0x7E8, &[0x02, 0x50]).unwrap();
        assert_eq!(frame.data(), &[0x02, 0x50]);
    }

    #[test]
    fn test_rejects_extended_id() {
        assert!(Frame::new(0x800, &[]).is_err());
    }

    #[test]
    fn test_rejects_oversized_data() {
        assert!(Frame::new(0x7E0, &[0u8; 9]).is_err());
    }

    #[test]
    fn test_debug_format() {
        let frame = Frame::new(0x7E0, &[0x02, 0x3E]).unwrap();
        assert_eq!(format!("{:?}", frame), "Frame(0x7E0 [02 3E])");
    }
}
