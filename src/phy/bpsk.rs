use super::{bits_to_bytes, bytes_to_bits};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub type Symbol = Complex64;
pub type Signal = Vec<Symbol>;

/// Hard decision applied to the real part of each received sample.
///
/// The modulator puts bit 0 at +1. `PositiveIsOne` decides the opposite way,
/// so a clean channel returns the bit-complement of what was sent. It is the
/// default because that is the established link behavior; `PositiveIsZero`
/// matches the modulator and must be chosen explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    #[default]
    PositiveIsOne,
    PositiveIsZero,
}

/// Maps each bit to a unit-circle sample at angle `bit * 180°`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BpskModulator;

impl BpskModulator {
    pub fn new() -> Self {
        Self
    }

    pub fn modulate_bit(bit: u8) -> Symbol {
        Complex64::from_polar(1.0, f64::from(bit & 1) * PI)
    }

    /// Eight symbols per byte, MSB first.
    pub fn modulate(&self, bytes: &[u8]) -> Signal {
        bytes_to_bits(bytes)
            .into_iter()
            .map(Self::modulate_bit)
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BpskDemodulator {
    rule: DecisionRule,
}

impl BpskDemodulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(rule: DecisionRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> DecisionRule {
        self.rule
    }

    pub fn decide(&self, sample: Symbol) -> u8 {
        let positive = sample.re > 0.0;
        match self.rule {
            DecisionRule::PositiveIsOne => u8::from(positive),
            DecisionRule::PositiveIsZero => u8::from(!positive),
        }
    }

    /// Hard-decide every sample and pack the bits; a trailing partial byte is dropped.
    pub fn demodulate(&self, signal: &[Symbol]) -> Vec<u8> {
        let bits: Vec<u8> = signal.iter().map(|&sample| self.decide(sample)).collect();
        bits_to_bytes(&bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_constellation_points() {
        let zero = BpskModulator::modulate_bit(0);
        let one = BpskModulator::modulate_bit(1);
        assert!((zero.re - 1.0).abs() < EPS && zero.im.abs() < EPS);
        assert!((one.re + 1.0).abs() < EPS && one.im.abs() < EPS);
        assert!((zero.norm() - 1.0).abs() < EPS);
        assert!((one.norm() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_modulate_length_and_order() {
        let signal = BpskModulator::new().modulate(&[0x80, 0x01]);
        assert_eq!(signal.len(), 16);
        assert!(signal[0].re < 0.0);
        assert!(signal[1..15].iter().all(|s| s.re > 0.0));
        assert!(signal[15].re < 0.0);
    }

    #[test]
    fn test_default_rule_returns_complement() {
        let bytes = [0x00, 0xFF, 0xA5, 0x3C];
        let signal = BpskModulator::new().modulate(&bytes);
        let received = BpskDemodulator::new().demodulate(&signal);
        assert_eq!(received, vec![0xFF, 0x00, 0x5A, 0xC3]);
    }

    #[test]
    fn test_matched_rule_returns_original() {
        let bytes = [0x00, 0xFF, 0xA5, 0x3C];
        let signal = BpskModulator::new().modulate(&bytes);
        let received = BpskDemodulator::with_rule(DecisionRule::PositiveIsZero).demodulate(&signal);
        assert_eq!(received, bytes.to_vec());
    }

    #[test]
    fn test_zero_real_part_decides_zero() {
        let demodulator = BpskDemodulator::new();
        assert_eq!(demodulator.decide(Complex64::new(0.0, 1.0)), 0);
        assert_eq!(demodulator.decide(Complex64::new(1e-9, 0.0)), 1);
    }

    #[test]
    fn test_trailing_samples_dropped() {
        let mut signal = BpskModulator::new().modulate(&[0x12]);
        signal.extend(BpskModulator::new().modulate(&[0xFF]).into_iter().take(5));
        assert_eq!(BpskDemodulator::new().demodulate(&signal).len(), 1);
    }
}
