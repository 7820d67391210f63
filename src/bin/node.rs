use clap::{App, Arg};
use colored::*;
use sensorlink::config::ConfigurationError;
use sensorlink::scheduler::{SchedulerStats, TdmaScheduler, TokioClock};
use sensorlink::transport::{LogTransport, Transport};
use sensorlink::LinkConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = App::new("sensorlink-node")
        .version("0.1.0")
        .about("🛰️  TDMA sensor node feeding the simulated BPSK link")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON link configuration")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("noise")
                .short("n")
                .long("noise")
                .value_name("SIGMA")
                .help("Override channel noise strength")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("slot-ms")
                .long("slot-ms")
                .value_name("MILLIS")
                .help("Override TDMA cycle length")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed sensors and channel")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("transport")
                .short("t")
                .long("transport")
                .value_name("TRANSPORT")
                .help("Where scheduled frames go")
                .takes_value(true)
                .possible_values(&["link", "log"])
                .default_value("link"),
        )
        .arg(
            Arg::with_name("cycles")
                .long("cycles")
                .value_name("N")
                .help("Stop after N full cycles")
                .takes_value(true),
        )
        .get_matches();

    let mut config = match matches.value_of("config") {
        Some(path) => LinkConfig::from_file(path)?,
        None => LinkConfig::default(),
    };
    if let Some(noise) = matches.value_of("noise") {
        config.noise_strength = noise.parse()?;
    }
    if let Some(slot_ms) = matches.value_of("slot-ms") {
        config.slot_duration_ms = slot_ms.parse()?;
    }
    if let Some(seed) = matches.value_of("seed") {
        config.seed = Some(seed.parse()?);
    }
    let cycles = matches.value_of("cycles").map(str::parse::<u64>).transpose()?;

    let mut scheduler = match config.build_scheduler() {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("configuration rejected: {}", e);
            return Err(e.into());
        }
    };
    let mut link = config.build_link()?;
    let mut clock = TokioClock;

    println!("🛰️  Sensor Link Node");
    println!("===================");
    for (address, kind) in scheduler.sources() {
        println!("  source {:>4} -> {}", address, kind);
    }
    println!(
        "  gateway {}, cycle {} ms, noise {:.3}, rule {:?}",
        config.gateway_address,
        config.slot_duration_ms,
        config.noise_strength,
        config.decision_rule
    );

    // Transmit is synchronous, so dropping the scheduler future on Ctrl+C
    // can only happen while it waits out a slot.
    let mut log = LogTransport::new();
    let outcome = tokio::select! {
        result = async {
            match matches.value_of("transport") {
                Some("log") => run(&mut scheduler, &mut log, &mut clock, cycles).await,
                _ => run(&mut scheduler, &mut link, &mut clock, cycles).await,
            }
        } => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        Some(result) => {
            result?;
        }
        None => {
            scheduler.stop();
            info!("interrupted, shutting down");
        }
    }

    let stats = scheduler.stats();
    let link_stats = link.stats();
    println!();
    println!("{}", "📊 Run Summary".bright_blue().bold());
    println!("├─ Cycles:          {}", stats.cycles_completed);
    println!("├─ Frames sent:     {}", stats.frames_transmitted);
    println!("├─ Encode failures: {}", stats.encode_failures);
    println!("├─ Link failures:   {}", stats.transport_failures);
    if log.transmitted() > 0 {
        println!("├─ Logged frames:   {}", log.transmitted());
    }
    println!("├─ Checksum valid:  {}", link_stats.checksum_valid.to_string().green());
    println!("├─ Checksum failed: {}", link_stats.checksum_failed.to_string().red());
    println!("└─ Bit errors:      {}", link_stats.total_bit_errors);
    if let Some(last) = &stats.last_error {
        println!("{} {}", "Last error:".yellow(), last);
    }

    println!("🚀 Sensor link node stopped");
    Ok(())
}

async fn run<T: Transport>(
    scheduler: &mut TdmaScheduler,
    transport: &mut T,
    clock: &mut TokioClock,
    cycles: Option<u64>,
) -> Result<SchedulerStats, ConfigurationError> {
    match cycles {
        Some(n) => scheduler.run_cycles(transport, clock, n).await,
        None => scheduler.start(transport, clock).await,
    }
}
