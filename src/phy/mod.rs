//! Baseband physical layer: BPSK symbol mapping and a noisy channel.
//!
//! One complex sample per bit. Bits are taken most-significant first.

pub mod bpsk;
pub mod channel;

pub use bpsk::{BpskDemodulator, BpskModulator, DecisionRule, Signal, Symbol};
pub use channel::{ChannelError, ChannelModel};

/// Expand bytes into bits, MSB first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    bits
}

/// Pack bits MSB first. Trailing bits that do not fill a byte are dropped.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |byte, &bit| (byte << 1) | (bit & 1)))
        .collect()
}

/// Number of differing bits between two byte strings of equal length.
pub fn bit_errors(sent: &[u8], received: &[u8]) -> u32 {
    sent.iter()
        .zip(received)
        .map(|(a, b)| (a ^ b).count_ones())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_expansion_is_msb_first() {
        assert_eq!(bytes_to_bits(&[0b1011_0011]), vec![1, 0, 1, 1, 0, 0, 1, 1]);
    }

    #[test]
    fn test_bits_to_bytes_truncates_partial_byte() {
        let mut bits = bytes_to_bits(&[0xAB, 0xCD]);
        bits.extend_from_slice(&[1, 1, 1]);
        assert_eq!(bits_to_bytes(&bits), vec![0xAB, 0xCD]);
        assert!(bits_to_bytes(&[1, 0, 1]).is_empty());
    }

    #[test]
    fn test_bit_errors() {
        assert_eq!(bit_errors(&[0x00, 0xFF], &[0x01, 0x0F]), 5);
        assert_eq!(bit_errors(&[0x5A], &[0x5A]), 0);
    }
}
