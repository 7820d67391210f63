use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use colored::*;
use sensorlink::frame::{self, flag_name, DecodedFrame};
use sensorlink::phy::{ChannelModel, DecisionRule};
use sensorlink::sensor_frame::{self, SensorReading};
use sensorlink::{LinkReport, LinkSimulator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let matches = App::new("sensorlink")
        .version("0.1.0")
        .about("📡 Sensor link frame tool")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["json", "table"])
                .default_value("table")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("encode")
                .about("🧱 Encode a sensor reading into wire bytes")
                .args(&frame_args())
                .args(&reading_args()),
        )
        .subcommand(
            SubCommand::with_name("decode")
                .about("🔍 Decode 8 wire bytes given as hex")
                .arg(
                    Arg::with_name("bytes")
                        .help("Frame bytes, e.g. 5AEFCFF0F504EB35 or \"5A EF CF F0 F5 04 EB 35\"")
                        .required(true)
                        .multiple(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("send")
                .about("📶 Encode a reading and pass it through the BPSK link")
                .args(&frame_args())
                .args(&reading_args())
                .arg(
                    Arg::with_name("noise")
                        .short("n")
                        .long("noise")
                        .value_name("SIGMA")
                        .help("Channel noise strength")
                        .takes_value(true)
                        .default_value("0.05"),
                )
                .arg(
                    Arg::with_name("seed")
                        .long("seed")
                        .value_name("SEED")
                        .help("Channel seed")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("rule")
                        .long("rule")
                        .value_name("RULE")
                        .help("Demodulator decision rule")
                        .takes_value(true)
                        .possible_values(&["positive-is-one", "positive-is-zero"])
                        .default_value("positive-is-one"),
                ),
        )
        .get_matches();

    let (name, sub) = match matches.subcommand() {
        (name, Some(sub)) => (name, sub),
        _ => return Ok(()),
    };
    let format = sub
        .value_of("format")
        .or_else(|| matches.value_of("format"))
        .unwrap_or("table");

    match name {
        "encode" => handle_encode(sub, format),
        "decode" => handle_decode(sub, format),
        "send" => handle_send(sub, format),
        _ => Ok(()),
    }
}

fn frame_args() -> Vec<Arg<'static, 'static>> {
    vec![
        Arg::with_name("flag")
            .long("flag")
            .value_name("FLAG")
            .help("Frame flag (0=ACK, 1=DATA, 2=DISCOVER)")
            .takes_value(true)
            .default_value("1"),
        Arg::with_name("dest")
            .long("dest")
            .value_name("ADDRESS")
            .help("Destination address (0-1023)")
            .takes_value(true)
            .default_value("12"),
        Arg::with_name("src")
            .long("src")
            .value_name("ADDRESS")
            .help("Source address (0-1023)")
            .takes_value(true)
            .default_value("15"),
    ]
}

fn reading_args() -> Vec<Arg<'static, 'static>> {
    vec![
        Arg::with_name("people")
            .long("people")
            .value_name("COUNT")
            .help("Occupancy count")
            .takes_value(true)
            .default_value("0"),
        Arg::with_name("temperature")
            .long("temperature")
            .value_name("CELSIUS")
            .help("Temperature (-128..127)")
            .takes_value(true)
            .allow_hyphen_values(true)
            .default_value("0"),
        Arg::with_name("air-quality")
            .long("air-quality")
            .value_name("INDEX")
            .help("Air-quality byte")
            .takes_value(true)
            .default_value("0"),
    ]
}

fn parse<T>(matches: &ArgMatches, name: &str) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = matches.value_of(name).unwrap_or_default();
    raw.parse::<T>()
        .map_err(|e| format!("invalid --{} '{}': {}", name, raw, e).into())
}

fn encoded_frame(matches: &ArgMatches) -> Result<frame::FrameBytes, Box<dyn std::error::Error>> {
    let flag: u8 = parse(matches, "flag")?;
    let dest: u16 = parse(matches, "dest")?;
    let src: u16 = parse(matches, "src")?;
    let data = sensor_frame::pack(
        parse(matches, "people")?,
        parse(matches, "temperature")?,
        parse(matches, "air-quality")?,
    )?;
    Ok(frame::encode(flag, dest, src, data)?)
}

fn handle_encode(matches: &ArgMatches, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = encoded_frame(matches)?;
    let decoded = frame::decode(&bytes)?;

    if format == "json" {
        let output = serde_json::json!({
            "bytes": hex(&bytes),
            "frame": decoded.frame,
            "reading": decoded.frame.sensor_reading(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_frame_table(&decoded, &decoded.frame.sensor_reading());
        println!("{} {}", "Wire bytes:".bright_blue(), hex(&bytes));
    }
    Ok(())
}

fn handle_decode(matches: &ArgMatches, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let input: String = matches.values_of("bytes").map(|v| v.collect()).unwrap_or_default();
    let bytes = parse_hex(&input)?;
    let (decoded, reading) = sensor_frame::decode(&bytes)?;

    if format == "json" {
        let output = serde_json::json!({
            "frame": decoded.frame,
            "checksum_valid": decoded.checksum_valid,
            "sfd_valid": decoded.frame.has_valid_sfd(),
            "reading": reading,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_frame_table(&decoded, &reading);
    }
    Ok(())
}

fn handle_send(matches: &ArgMatches, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = encoded_frame(matches)?;
    let noise: f64 = parse(matches, "noise")?;
    let rule = match matches.value_of("rule") {
        Some("positive-is-zero") => DecisionRule::PositiveIsZero,
        _ => DecisionRule::PositiveIsOne,
    };
    let channel = match matches.value_of("seed") {
        Some(_) => ChannelModel::new(parse(matches, "seed")?),
        None => ChannelModel::from_entropy(),
    };

    let mut link = LinkSimulator::new(channel, noise).with_decision_rule(rule);
    let report = link.send(&bytes)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report_table(&report);
    }
    Ok(())
}

fn print_frame_table(decoded: &DecodedFrame, reading: &SensorReading) {
    let frame = &decoded.frame;
    let flag = match flag_name(frame.flag()) {
        Some(name) => format!("{} ({})", frame.flag(), name),
        None => frame.flag().to_string(),
    };
    let sfd = if frame.has_valid_sfd() {
        format!("{:#04x}", frame.sfd()).green()
    } else {
        format!("{:#04x}", frame.sfd()).red()
    };
    let crc = if decoded.checksum_valid {
        format!("{:#04x} ✅", frame.crc()).green()
    } else {
        format!("{:#04x} ❌ expected {:#04x}", frame.crc(), frame.expected_crc()).red()
    };

    println!("{}", "📦 Frame".bright_blue().bold());
    println!("├─ SFD:          {}", sfd);
    println!("├─ Flag:         {}", flag);
    println!("├─ Destination:  {}", frame.dest_address());
    println!("├─ Source:       {}", frame.src_address());
    println!("├─ Data:         {:#08x}", frame.data());
    println!("├─ CRC:          {}", crc);
    println!("└─ Reading:      {}", reading);
}

fn print_report_table(report: &LinkReport) {
    println!("{}", "📶 Link Report".bright_blue().bold());
    println!("├─ Sent:         {}", hex(&report.sent));
    println!("├─ Received:     {}", hex(&report.received));
    println!("├─ Symbols:      {}", report.symbols);
    println!("├─ Bit errors:   {}", report.bit_errors);
    if report.complement_received {
        println!("├─ {}", "Received bytes are the bit-complement of the sent frame".yellow());
    }
    match &report.decoded {
        Some(decoded) => {
            let verdict = if decoded.checksum_valid {
                "VALID".green()
            } else {
                "CORRUPTED".red()
            };
            println!("├─ Checksum:     {}", verdict);
            println!("└─ Reading:      {}", decoded.frame.sensor_reading());
        }
        None => println!("└─ {}", "Received bytes do not form a frame".red()),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
}

fn parse_hex(input: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = digits.trim_start_matches("0x");
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(format!("invalid hex digit '{}' in '{}'", bad, input).into());
    }
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in '{}'", input).into());
    }
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for pair in digits.as_bytes().chunks_exact(2) {
        let high = hex_value(pair[0]);
        let low = hex_value(pair[1]);
        bytes.push((high << 4) | low);
    }
    Ok(bytes)
}

/// `digit` is already checked to be an ASCII hex digit.
fn hex_value(digit: u8) -> u8 {
    char::from(digit).to_digit(16).unwrap_or(0) as u8
}
