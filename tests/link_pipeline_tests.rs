use sensorlink::frame::{self, FLAG_DATA, SFD};
use sensorlink::link::LinkSimulator;
use sensorlink::phy::*;
use sensorlink::sensor_frame::{self, SensorReading};

const SENT: [u8; 8] = [0x5A, 0xEF, 0xCF, 0xF0, 0xF5, 0x04, 0xEB, 0x35];
const COMPLEMENT: [u8; 8] = [0xA5, 0x10, 0x30, 0x0F, 0x0A, 0xFB, 0x14, 0xCA];

#[test]
fn test_end_to_end_scenario_returns_complement() {
    let data = sensor_frame::pack(10, -5, 20).unwrap();
    assert_eq!(data, 0x0A_FB14);

    let bytes = frame::encode(FLAG_DATA, 12, 15, data).unwrap();
    assert_eq!(bytes, SENT);
    let decoded = frame::decode(&bytes).unwrap();
    assert_eq!(decoded.frame.sfd(), SFD);

    let signal = BpskModulator::new().modulate(&bytes);
    assert_eq!(signal.len(), 64);

    let channel_out = ChannelModel::new(11).apply(&signal, 0.0).unwrap();
    assert_eq!(channel_out, signal);

    let received = BpskDemodulator::new().demodulate(&channel_out);
    // Not an identity round trip: the default decision rule inverts every bit.
    assert_eq!(received, COMPLEMENT.to_vec());
    assert_ne!(received, bytes.to_vec());

    let decoded = frame::decode(&received).unwrap();
    assert!(!decoded.checksum_valid);
    assert!(!decoded.frame.has_valid_sfd());
}

#[test]
fn test_matched_rule_restores_reading() {
    let reading = SensorReading::new(10, -5, 20);
    let bytes = sensor_frame::encode(FLAG_DATA, 12, 15, reading).unwrap();

    let signal = BpskModulator::new().modulate(&bytes);
    let noisy = ChannelModel::new(3).apply(&signal, 0.05).unwrap();
    let received = BpskDemodulator::with_rule(DecisionRule::PositiveIsZero).demodulate(&noisy);

    let (decoded, received_reading) = sensor_frame::decode(&received).unwrap();
    assert!(decoded.checksum_valid);
    assert_eq!(received_reading, reading);
}

#[test]
fn test_link_simulator_reports_complement() {
    let mut link = LinkSimulator::new(ChannelModel::new(8), 0.0);
    let report = link.send(&SENT).unwrap();

    assert_eq!(report.received, COMPLEMENT.to_vec());
    assert!(report.complement_received);
    assert_eq!(report.bit_errors, 64);
    assert!(!report.checksum_valid());
    assert_eq!(link.decision_rule(), DecisionRule::PositiveIsOne);
}

#[test]
fn test_low_noise_keeps_frames_intact_with_matched_rule() {
    let mut link = LinkSimulator::new(ChannelModel::new(21), 0.05).with_decision_rule(DecisionRule::PositiveIsZero);

    for data in (0..frame::MAX_DATA).step_by(500_009).take(30) {
        let bytes = frame::encode(FLAG_DATA, 12, 15, data).unwrap();
        let report = link.send(&bytes).unwrap();
        assert_eq!(report.bit_errors, 0);
        assert!(report.checksum_valid());
    }
    assert_eq!(link.stats().checksum_valid, 30);
}

#[test]
fn test_heavy_noise_corrupts_bits() {
    let mut link = LinkSimulator::new(ChannelModel::new(99), 1.5).with_decision_rule(DecisionRule::PositiveIsZero);

    for _ in 0..20 {
        link.send(&SENT).unwrap();
    }
    let stats = link.stats();
    assert_eq!(stats.frames_sent, 20);
    assert!(stats.total_bit_errors > 0);
    assert!(stats.checksum_failed > 0);
}

#[test]
fn test_seeded_links_are_reproducible() {
    let mut a = LinkSimulator::new(ChannelModel::new(1234), 0.8);
    let mut b = LinkSimulator::new(ChannelModel::new(1234), 0.8);

    for _ in 0..5 {
        assert_eq!(a.send(&SENT).unwrap(), b.send(&SENT).unwrap());
    }
}

#[test]
fn test_bit_helpers() {
    assert_eq!(bytes_to_bits(&[0xA5]), vec![1, 0, 1, 0, 0, 1, 0, 1]);
    assert_eq!(bits_to_bytes(&[1, 0, 1, 0, 0, 1, 0, 1, 1, 1]), vec![0xA5]);
    assert_eq!(bit_errors(&SENT, &COMPLEMENT), 64);
    assert_eq!(bit_errors(&SENT, &SENT), 0);
}
