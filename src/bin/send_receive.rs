use clap::{App, Arg};
use colored::*;
use sensorlink::frame::FLAG_DATA;
use sensorlink::phy::{BpskDemodulator, BpskModulator, ChannelModel, Symbol};
use sensorlink::sensor_frame;
use sensorlink::sensors::{SensorKind, SensorSource, SimulatedSensor, AIR_QUALITY_SCALE};
use tracing::warn;

const DEFAULT_NOISE: f64 = 0.05;
const GATEWAY_ADDRESS: u16 = 12;
const NODE_ADDRESS: u16 = 15;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let matches = App::new("send-receive")
        .version("0.1.0")
        .about("📶 One frame through the BPSK link and back")
        .arg(
            Arg::with_name("noise")
                .help("Channel noise strength (default 0.05)")
                .index(1)
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed sensors and channel for a reproducible run")
                .takes_value(true),
        )
        .get_matches();

    let noise = noise_strength(matches.value_of("noise"));
    let seed = matches.value_of("seed").and_then(|s| s.parse::<u64>().ok());

    let mut people = sensor(SensorKind::PeopleCount, seed, 1);
    let mut temperature = sensor(SensorKind::Temperature, seed, 2);
    let mut co2 = sensor(SensorKind::Co2, seed, 3);

    let nb_person = people.read_value();
    let temp_c = temperature.read_value();
    let air_quality = (f64::from(co2.read_value()) * AIR_QUALITY_SCALE) as u32;

    let data = sensor_frame::pack(nb_person as u32, temp_c, air_quality)?;
    let frame = sensorlink::Frame::new(FLAG_DATA, GATEWAY_ADDRESS, NODE_ADDRESS, data)?;
    let bytes = frame.to_bytes();

    println!("{}", "New frame:".bright_blue().bold());
    println!("{}", frame);
    println!("{} {}", "Wire bytes:".bright_blue(), hex(&bytes));

    let signal = BpskModulator::new().modulate(&bytes);
    println!("\n{} {} symbols", "Modulation of the signal:".bright_blue(), signal.len());

    let mut channel = match seed {
        Some(seed) => ChannelModel::new(seed),
        None => ChannelModel::from_entropy(),
    };
    let noisy = channel.apply(&signal, noise)?;
    println!(
        "{} noise {:.3}, mean sample displacement {:.4}",
        "Passing through the channel:".bright_blue(),
        noise,
        mean_displacement(&signal, &noisy)
    );

    let received = BpskDemodulator::new().demodulate(&noisy);
    println!("{} {}", "Demodulated bytes:".bright_blue(), hex(&received));

    let (decoded, reading) = sensor_frame::decode(&received)?;
    println!("\n{}", "Received frame:".bright_blue().bold());
    println!("{}", decoded.frame);
    println!("{} {}", "Sensor payload:".bright_blue(), reading);

    let complement = bytes.iter().zip(&received).all(|(sent, got)| *got == !*sent);
    if complement {
        println!("{}", "Received bytes are the bit-complement of the sent frame".yellow());
    }

    if decoded.checksum_valid {
        println!("{}", "✅ Checksum valid".green());
    } else {
        println!(
            "{} current crc: {}, expected: {}",
            "❌ Frame corrupted.".red(),
            decoded.frame.crc(),
            decoded.frame.expected_crc()
        );
    }

    Ok(())
}

/// Absent or unparsable input falls back to the default.
fn noise_strength(arg: Option<&str>) -> f64 {
    match arg.map(|s| s.trim().parse::<f64>()) {
        None => DEFAULT_NOISE,
        Some(Ok(value)) if value.is_finite() && value >= 0.0 => value,
        Some(_) => {
            warn!("unusable noise strength {:?}, using {}", arg, DEFAULT_NOISE);
            DEFAULT_NOISE
        }
    }
}

fn sensor(kind: SensorKind, seed: Option<u64>, offset: u64) -> SimulatedSensor {
    match seed {
        Some(seed) => SimulatedSensor::new(kind, seed.wrapping_add(offset)),
        None => SimulatedSensor::from_entropy(kind),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
}

fn mean_displacement(before: &[Symbol], after: &[Symbol]) -> f64 {
    if before.is_empty() {
        return 0.0;
    }
    let total: f64 = before.iter().zip(after).map(|(a, b)| (a - b).norm()).sum();
    total / before.len() as f64
}
