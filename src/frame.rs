use arrayvec::ArrayString;
use serde::Serialize;
use static_assertions::const_assert_eq;
use thiserror::Error;
use tracing::{debug, warn};

/// Wire size of a frame in bytes.
pub const FRAME_LEN: usize = 8;
/// Start-frame delimiter, most-significant byte of the first word.
pub const SFD: u8 = 0xA5;

pub const FLAG_BITS: u32 = 4;
pub const ADDRESS_BITS: u32 = 10;
pub const DATA_BITS: u32 = 24;
pub const CRC_BITS: u32 = 8;

pub const MAX_FLAG: u8 = (1 << FLAG_BITS) - 1;
pub const MAX_ADDRESS: u16 = (1 << ADDRESS_BITS) - 1;
pub const MAX_DATA: u32 = (1 << DATA_BITS) - 1;

// Known flag values. Any other 4-bit value is legal on the wire.
pub const FLAG_ACK: u8 = 0;
pub const FLAG_DATA: u8 = 1;
pub const FLAG_DISCOVER: u8 = 2;

const_assert_eq!(8 + FLAG_BITS + 2 * ADDRESS_BITS + DATA_BITS + CRC_BITS, (FRAME_LEN * 8) as u32);

pub type FrameBytes = [u8; FRAME_LEN];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("invalid frame length: expected {FRAME_LEN} bytes, got {actual}")]
    InvalidFrameLength { actual: usize },
    #[error("{field} value {value} exceeds maximum {max}")]
    FieldOutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
}

/// Name of a known flag value, `None` for raw values outside the named set.
pub fn flag_name(flag: u8) -> Option<&'static str> {
    match flag {
        FLAG_ACK => Some("ACK"),
        FLAG_DATA => Some("DATA"),
        FLAG_DISCOVER => Some("DISCOVER"),
        _ => None,
    }
}

/// Generic MAC frame.
///
/// Frames built with [`Frame::new`] carry a checksum computed once at
/// construction. Frames produced by [`decode`] carry the sfd and checksum
/// exactly as received so a mismatch stays visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Frame {
    sfd: u8,
    flag: u8,
    dest_address: u16,
    src_address: u16,
    data: u32,
    crc: u8,
}

/// Result of decoding wire bytes. Checksum mismatch is reported, not raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecodedFrame {
    pub frame: Frame,
    pub checksum_valid: bool,
}

fn check_field(field: &'static str, value: u32, max: u32) -> Result<(), FrameError> {
    if value > max {
        return Err(FrameError::FieldOutOfRange { field, value, max });
    }
    Ok(())
}

/// XOR-fold of the six bytes of the 48-bit blob `flag|dest|src|data`.
pub fn checksum(flag: u8, dest_address: u16, src_address: u16, data: u32) -> u8 {
    let blob = (u64::from(flag & MAX_FLAG) << 44)
        | (u64::from(dest_address & MAX_ADDRESS) << 34)
        | (u64::from(src_address & MAX_ADDRESS) << 24)
        | u64::from(data & MAX_DATA);

    blob.to_be_bytes()[2..].iter().fold(0u8, |crc, byte| crc ^ byte)
}

impl Frame {
    pub fn new(flag: u8, dest_address: u16, src_address: u16, data: u32) -> Result<Self, FrameError> {
        check_field("flag", u32::from(flag), u32::from(MAX_FLAG))?;
        check_field("dest_address", u32::from(dest_address), u32::from(MAX_ADDRESS))?;
        check_field("src_address", u32::from(src_address), u32::from(MAX_ADDRESS))?;
        check_field("data", data, MAX_DATA)?;

        Ok(Self {
            sfd: SFD,
            flag,
            dest_address,
            src_address,
            data,
            crc: checksum(flag, dest_address, src_address, data),
        })
    }

    pub fn sfd(&self) -> u8 {
        self.sfd
    }

    pub fn flag(&self) -> u8 {
        self.flag
    }

    pub fn dest_address(&self) -> u16 {
        self.dest_address
    }

    pub fn src_address(&self) -> u16 {
        self.src_address
    }

    pub fn data(&self) -> u32 {
        self.data
    }

    pub fn crc(&self) -> u8 {
        self.crc
    }

    pub fn has_valid_sfd(&self) -> bool {
        self.sfd == SFD
    }

    /// Checksum recomputed from the current fields.
    pub fn expected_crc(&self) -> u8 {
        checksum(self.flag, self.dest_address, self.src_address, self.data)
    }

    /// Recompute the checksum from the fields and compare with the stored one.
    pub fn checksum_valid(&self) -> bool {
        self.crc == self.expected_crc()
    }

    /// The two 32-bit words before the ones'-complement transform.
    fn words(&self) -> (u32, u32) {
        let first = (u32::from(self.sfd) << 24)
            | ((u32::from(self.flag) & u32::from(MAX_FLAG)) << 20)
            | ((u32::from(self.dest_address) & u32::from(MAX_ADDRESS)) << 10)
            | (u32::from(self.src_address) & u32::from(MAX_ADDRESS));
        let second = ((self.data & MAX_DATA) << 8) | u32::from(self.crc);
        (first, second)
    }

    fn from_words(first: u32, second: u32) -> Self {
        Self {
            sfd: (first >> 24) as u8,
            flag: ((first >> 20) & u32::from(MAX_FLAG)) as u8,
            dest_address: ((first >> 10) & u32::from(MAX_ADDRESS)) as u16,
            src_address: (first & u32::from(MAX_ADDRESS)) as u16,
            data: second >> 8,
            crc: (second & 0xFF) as u8,
        }
    }

    /// Wire form: both words inverted, each emitted big-endian.
    pub fn to_bytes(&self) -> FrameBytes {
        let (first, second) = self.words();
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..4].copy_from_slice(&(!first).to_be_bytes());
        bytes[4..].copy_from_slice(&(!second).to_be_bytes());
        bytes
    }

    /// The 64 wire bits as '0'/'1' characters.
    pub fn to_bit_string(&self) -> ArrayString<64> {
        let mut bits = ArrayString::new();
        for byte in self.to_bytes() {
            for shift in (0..8).rev() {
                bits.push(if (byte >> shift) & 1 == 1 { '1' } else { '0' });
            }
        }
        bits
    }
}

impl core::fmt::Display for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "---frame---")?;
        writeln!(f, "sfd: {:#04x}", self.sfd)?;
        match flag_name(self.flag) {
            Some(name) => writeln!(f, "flag: {} ({})", self.flag, name)?,
            None => writeln!(f, "flag: {}", self.flag)?,
        }
        writeln!(f, "destination address: {}", self.dest_address)?;
        writeln!(f, "source address: {}", self.src_address)?;
        writeln!(f, "data: {:#08x}", self.data)?;
        writeln!(f, "crc: {:#04x}", self.crc)?;
        writeln!(f, "binary: {}", self.to_bit_string())?;
        write!(f, "-----------")
    }
}

/// Build a frame from its fields and return its wire bytes.
pub fn encode(flag: u8, dest_address: u16, src_address: u16, data: u32) -> Result<FrameBytes, FrameError> {
    let frame = Frame::new(flag, dest_address, src_address, data)?;
    debug!(
        flag,
        dest_address, src_address, data, crc = frame.crc, "encoded frame"
    );
    Ok(frame.to_bytes())
}

/// Parse exactly [`FRAME_LEN`] wire bytes.
pub fn decode(bytes: &[u8]) -> Result<DecodedFrame, FrameError> {
    if bytes.len() != FRAME_LEN {
        return Err(FrameError::InvalidFrameLength { actual: bytes.len() });
    }

    let mut first = [0u8; 4];
    let mut second = [0u8; 4];
    first.copy_from_slice(&bytes[..4]);
    second.copy_from_slice(&bytes[4..]);

    let frame = Frame::from_words(!u32::from_be_bytes(first), !u32::from_be_bytes(second));
    let checksum_valid = frame.checksum_valid();
    if !checksum_valid {
        warn!(
            stored = frame.crc,
            expected = frame.expected_crc(),
            "frame checksum mismatch"
        );
    }

    Ok(DecodedFrame {
        frame,
        checksum_valid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_xor_fold() {
        // blob 0x10_30_0F_0A_FB_14
        assert_eq!(checksum(FLAG_DATA, 12, 15, 0x0A_FB14), 0x10 ^ 0x30 ^ 0x0F ^ 0x0A ^ 0xFB ^ 0x14);
        assert_eq!(checksum(0, 0, 0, 0), 0);
    }

    #[test]
    fn test_known_wire_bytes() {
        let bytes = encode(FLAG_DATA, 12, 15, 0x0A_FB14).unwrap();
        assert_eq!(bytes, [0x5A, 0xEF, 0xCF, 0xF0, 0xF5, 0x04, 0xEB, 0x35]);
    }

    #[test]
    fn test_decode_restores_fields() {
        let bytes = encode(FLAG_DISCOVER, 1023, 0, MAX_DATA).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert!(decoded.checksum_valid);
        assert!(decoded.frame.has_valid_sfd());
        assert_eq!(decoded.frame.flag(), FLAG_DISCOVER);
        assert_eq!(decoded.frame.dest_address(), 1023);
        assert_eq!(decoded.frame.src_address(), 0);
        assert_eq!(decoded.frame.data(), MAX_DATA);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert_eq!(decode(&[0u8; 7]), Err(FrameError::InvalidFrameLength { actual: 7 }));
        assert_eq!(decode(&[0u8; 9]), Err(FrameError::InvalidFrameLength { actual: 9 }));
        assert_eq!(decode(&[]), Err(FrameError::InvalidFrameLength { actual: 0 }));
    }

    #[test]
    fn test_out_of_range_fields_are_rejected() {
        assert!(matches!(
            encode(16, 0, 0, 0),
            Err(FrameError::FieldOutOfRange { field: "flag", .. })
        ));
        assert!(matches!(
            encode(FLAG_ACK, 1024, 0, 0),
            Err(FrameError::FieldOutOfRange { field: "dest_address", .. })
        ));
        assert!(matches!(
            encode(FLAG_ACK, 0, 1024, 0),
            Err(FrameError::FieldOutOfRange { field: "src_address", .. })
        ));
        assert!(matches!(
            encode(FLAG_ACK, 0, 0, MAX_DATA + 1),
            Err(FrameError::FieldOutOfRange { field: "data", .. })
        ));
    }

    #[test]
    fn test_corrupted_crc_is_reported_not_raised() {
        let mut bytes = encode(FLAG_DATA, 5, 6, 0x12_3456).unwrap();
        bytes[7] ^= 0x01;

        let decoded = decode(&bytes).unwrap();
        assert!(!decoded.checksum_valid);
        assert_eq!(decoded.frame.data(), 0x12_3456);
    }

    #[test]
    fn test_bit_string() {
        let frame = Frame::new(FLAG_DATA, 12, 15, 0x0A_FB14).unwrap();
        let bits = frame.to_bit_string();
        assert_eq!(bits.len(), 64);
        assert!(bits.starts_with("01011010"));
    }

    #[test]
    fn test_oversized_field_cannot_spill_into_neighbours() {
        let mut frame = Frame::new(FLAG_DATA, 12, 15, 0x0A_FB14).unwrap();
        frame.dest_address = 0x0FFF;
        frame.data = 0xFF0A_FB14;

        let decoded = decode(&frame.to_bytes()).unwrap();
        assert_eq!(decoded.frame.flag(), FLAG_DATA);
        assert_eq!(decoded.frame.dest_address(), MAX_ADDRESS);
        assert_eq!(decoded.frame.src_address(), 15);
        assert_eq!(decoded.frame.data(), 0x0A_FB14);
        assert_eq!(decoded.frame.crc(), 0xCA);
    }

    #[test]
    fn test_flag_names() {
        assert_eq!(flag_name(FLAG_ACK), Some("ACK"));
        assert_eq!(flag_name(FLAG_DATA), Some("DATA"));
        assert_eq!(flag_name(FLAG_DISCOVER), Some("DISCOVER"));
        assert_eq!(flag_name(9), None);
    }
}
