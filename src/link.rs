use crate::frame::{self, DecodedFrame};
use crate::phy::{self, BpskDemodulator, BpskModulator, ChannelError, ChannelModel, DecisionRule};
use crate::transport::{Transport, TransportError};
use heapless::Vec;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

const MAX_REPORT_HISTORY: usize = 32;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// What happened to one frame on its way through the link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkReport {
    #[serde(with = "serde_bytes")]
    pub sent: std::vec::Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub received: std::vec::Vec<u8>,
    pub symbols: usize,
    /// Bits of `received` that differ from `sent`.
    pub bit_errors: u32,
    /// `received` is exactly the bitwise complement of `sent`.
    pub complement_received: bool,
    /// `None` when the received byte count is not a frame.
    pub decoded: Option<DecodedFrame>,
}

impl LinkReport {
    pub fn checksum_valid(&self) -> bool {
        self.decoded.is_some_and(|d| d.checksum_valid)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkStats {
    pub frames_sent: u64,
    pub checksum_valid: u64,
    pub checksum_failed: u64,
    pub undecodable: u64,
    pub total_bit_errors: u64,
}

/// Modulator, channel and demodulator chained for whole frames.
#[derive(Debug)]
pub struct LinkSimulator {
    modulator: BpskModulator,
    channel: ChannelModel,
    demodulator: BpskDemodulator,
    noise_strength: f64,
    stats: LinkStats,
    history: Vec<LinkReport, MAX_REPORT_HISTORY>,
}

impl LinkSimulator {
    pub fn new(channel: ChannelModel, noise_strength: f64) -> Self {
        Self {
            modulator: BpskModulator::new(),
            channel,
            demodulator: BpskDemodulator::new(),
            noise_strength,
            stats: LinkStats::default(),
            history: Vec::new(),
        }
    }

    pub fn with_decision_rule(mut self, rule: DecisionRule) -> Self {
        self.demodulator = BpskDemodulator::with_rule(rule);
        self
    }

    pub fn noise_strength(&self) -> f64 {
        self.noise_strength
    }

    pub fn set_noise_strength(&mut self, noise_strength: f64) {
        self.noise_strength = noise_strength;
    }

    pub fn decision_rule(&self) -> DecisionRule {
        self.demodulator.rule()
    }

    /// Modulate, impair, demodulate and decode one frame.
    pub fn send(&mut self, bytes: &[u8]) -> Result<LinkReport, LinkError> {
        let signal = self.modulator.modulate(bytes);
        let noisy = self.channel.apply(&signal, self.noise_strength)?;
        let received = self.demodulator.demodulate(&noisy);

        let bit_errors = phy::bit_errors(bytes, &received);
        let complement_received =
            received.len() == bytes.len() && bytes.iter().zip(&received).all(|(sent, got)| *got == !*sent);
        let decoded = frame::decode(&received).ok();

        let report = LinkReport {
            sent: bytes.to_vec(),
            received,
            symbols: signal.len(),
            bit_errors,
            complement_received,
            decoded,
        };
        self.record(&report);
        Ok(report)
    }

    fn record(&mut self, report: &LinkReport) {
        self.stats.frames_sent += 1;
        self.stats.total_bit_errors += u64::from(report.bit_errors);

        match report.decoded {
            Some(decoded) if decoded.checksum_valid => {
                self.stats.checksum_valid += 1;
                debug!(bit_errors = report.bit_errors, "frame received intact");
            }
            Some(_) => {
                self.stats.checksum_failed += 1;
                warn!(
                    bit_errors = report.bit_errors,
                    complement = report.complement_received,
                    "frame received with bad checksum"
                );
            }
            None => {
                self.stats.undecodable += 1;
                warn!(received = report.received.len(), "received bytes do not form a frame");
            }
        }

        if self.history.is_full() {
            self.history.remove(0);
        }
        let _ = self.history.push(report.clone());
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Most recent reports, oldest first.
    pub fn history(&self) -> &[LinkReport] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl Transport for LinkSimulator {
    fn transmit(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.send(frame)
            .map(|_| ())
            .map_err(|e| TransportError::Link(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FLAG_DATA;

    #[test]
    fn test_clean_link_returns_complement() {
        let mut link = LinkSimulator::new(ChannelModel::new(1), 0.0);
        let bytes = frame::encode(FLAG_DATA, 12, 15, 0x0A_FB14).unwrap();

        let report = link.send(&bytes).unwrap();
        assert_eq!(report.symbols, 64);
        assert!(report.complement_received);
        assert_eq!(report.bit_errors, 64);
        assert!(!report.checksum_valid());
        assert_eq!(link.stats().checksum_failed, 1);
    }

    #[test]
    fn test_matched_rule_on_clean_link_is_lossless() {
        let mut link = LinkSimulator::new(ChannelModel::new(1), 0.0).with_decision_rule(DecisionRule::PositiveIsZero);
        let bytes = frame::encode(FLAG_DATA, 12, 15, 0x0A_FB14).unwrap();

        let report = link.send(&bytes).unwrap();
        assert_eq!(report.received, bytes.to_vec());
        assert_eq!(report.bit_errors, 0);
        assert!(report.checksum_valid());
        assert_eq!(link.stats().checksum_valid, 1);
    }

    #[test]
    fn test_short_input_is_undecodable() {
        let mut link = LinkSimulator::new(ChannelModel::new(1), 0.0);
        let report = link.send(&[0x01, 0x02]).unwrap();
        assert!(report.decoded.is_none());
        assert_eq!(link.stats().undecodable, 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut link = LinkSimulator::new(ChannelModel::new(1), 0.0);
        for i in 0..(MAX_REPORT_HISTORY as u32 + 5) {
            let bytes = frame::encode(FLAG_DATA, 1, 2, i).unwrap();
            link.send(&bytes).unwrap();
        }
        assert_eq!(link.history().len(), MAX_REPORT_HISTORY);
        assert_eq!(link.stats().frames_sent, MAX_REPORT_HISTORY as u64 + 5);
        let oldest = frame::encode(FLAG_DATA, 1, 2, 5).unwrap();
        assert_eq!(link.history()[0].sent, oldest.to_vec());
    }

    #[test]
    fn test_noise_strength_can_be_changed_between_frames() {
        let mut link = LinkSimulator::new(ChannelModel::new(3), 0.0).with_decision_rule(DecisionRule::PositiveIsZero);
        let bytes = frame::encode(FLAG_DATA, 12, 15, 0x0A_FB14).unwrap();
        assert_eq!(link.noise_strength(), 0.0);
        assert_eq!(link.send(&bytes).unwrap().bit_errors, 0);

        link.set_noise_strength(2.0);
        assert_eq!(link.noise_strength(), 2.0);
        let noisy: u32 = (0..10).map(|_| link.send(&bytes).unwrap().bit_errors).sum();
        assert!(noisy > 0);
    }

    #[test]
    fn test_clear_history_keeps_stats() {
        let mut link = LinkSimulator::new(ChannelModel::new(1), 0.0);
        let bytes = frame::encode(FLAG_DATA, 1, 2, 3).unwrap();
        link.send(&bytes).unwrap();
        link.send(&bytes).unwrap();

        link.clear_history();
        assert!(link.history().is_empty());
        assert_eq!(link.stats().frames_sent, 2);
    }

    #[test]
    fn test_negative_noise_surfaces_as_transport_error() {
        let mut link = LinkSimulator::new(ChannelModel::new(1), -1.0);
        let bytes = frame::encode(FLAG_DATA, 1, 2, 3).unwrap();
        assert!(matches!(link.transmit(&bytes), Err(TransportError::Link(_))));
    }
}
